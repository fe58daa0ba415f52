//! Merging through an XSL transformation.
//!
//! [`DocumentMergerByXslt`] hands each fold step to a stylesheet instead of
//! the tag merger. Both documents are wrapped in one envelope,
//!
//! ```xml
//! <merge>
//!   <left><web-app>...</web-app></left>
//!   <right><web-app>...</web-app></right>
//! </merge>
//! ```
//!
//! and the transform output is parsed back as the merged document.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::processor::{MergeItem, MergeOutput, MergeProcessor};
use crate::error::{Error, Result};
use crate::node::{Document, Element};
use crate::xml::{parse_bytes, print_to_bytes_pretty};

/// Error type returned by transforms.
pub type TransformError = Box<dyn std::error::Error + Send + Sync>;

/// Something that can run a stylesheet over serialized XML.
pub trait XsltTransform: Send + Sync {
    fn transform(&self, input: &[u8]) -> std::result::Result<Vec<u8>, TransformError>;
}

impl<F> XsltTransform for F
where
    F: Fn(&[u8]) -> std::result::Result<Vec<u8>, TransformError> + Send + Sync,
{
    fn transform(&self, input: &[u8]) -> std::result::Result<Vec<u8>, TransformError> {
        self(input)
    }
}

/// Runs a stylesheet with the external `xsltproc` tool.
///
/// Network access is disabled, so DTDs referenced by the input are never
/// fetched.
#[derive(Debug, Clone)]
pub struct XsltProc {
    program: PathBuf,
    stylesheet: PathBuf,
}

impl XsltProc {
    pub fn new(stylesheet: impl Into<PathBuf>) -> Self {
        XsltProc {
            program: PathBuf::from("xsltproc"),
            stylesheet: stylesheet.into(),
        }
    }

    /// Uses a specific `xsltproc` binary.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn stylesheet(&self) -> &Path {
        &self.stylesheet
    }
}

impl XsltTransform for XsltProc {
    fn transform(&self, input: &[u8]) -> std::result::Result<Vec<u8>, TransformError> {
        let mut child = Command::new(&self.program)
            .arg("--nonet")
            .arg(&self.stylesheet)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin from another thread so a large output cannot block us
        let mut stdin = child.stdin.take().ok_or("xsltproc stdin is not piped")?;
        let input = input.to_vec();
        let writer = std::thread::spawn(move || stdin.write_all(&input));

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )
            .into());
        }
        writer
            .join()
            .map_err(|_| TransformError::from("xsltproc input writer panicked"))??;
        Ok(output.stdout)
    }
}

/// Folds documents by running each merge step through an [`XsltTransform`].
pub struct DocumentMergerByXslt {
    transform: Box<dyn XsltTransform>,
    documents: Vec<Document>,
}

impl DocumentMergerByXslt {
    pub fn new(transform: impl XsltTransform + 'static) -> Self {
        DocumentMergerByXslt {
            transform: Box::new(transform),
            documents: Vec::new(),
        }
    }

    /// Merges two documents with one transform run.
    ///
    /// The result keeps the DOCTYPE of `left` unless the transform output
    /// declares its own.
    pub fn merge_pair(&self, left: &Document, right: &Document) -> Result<Document> {
        let envelope = Document::new(
            Element::new("merge")
                .child(Element::new("left").child(left.root().clone()))
                .child(Element::new("right").child(right.root().clone())),
        );
        let input = print_to_bytes_pretty(&envelope)?;
        let output = self
            .transform
            .transform(&input)
            .map_err(|e| Error::Transform(e.to_string()))?;
        debug!(input = input.len(), output = output.len(), "ran merge transform");

        let merged = parse_bytes(&output)
            .map_err(|e| Error::Transform(format!("transform output is not a document: {}", e)))?;
        match left.doctype() {
            Some(doctype) if merged.doctype().is_none() => {
                Ok(Document::with_doctype(merged.into_root(), doctype))
            }
            _ => Ok(merged),
        }
    }
}

impl fmt::Debug for DocumentMergerByXslt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentMergerByXslt")
            .field("documents", &self.documents.len())
            .finish_non_exhaustive()
    }
}

impl MergeProcessor for DocumentMergerByXslt {
    fn add_merge_item(&mut self, item: MergeItem) -> Result<()> {
        match item {
            MergeItem::Document(document) => {
                self.documents.push(document);
                Ok(())
            }
            other => Err(Error::UnsupportedInputKind {
                processor: "DocumentMergerByXslt",
                expected: "documents",
                found: other.kind(),
            }),
        }
    }

    fn perform_merge(&mut self) -> Result<Option<MergeOutput>> {
        let mut documents = self.documents.iter();
        let Some(first) = documents.next() else {
            return Ok(None);
        };
        let mut merged = first.clone();
        for (offset, document) in documents.enumerate() {
            merged = self
                .merge_pair(&merged, document)
                .map_err(|e| e.in_document(offset + 1))?;
        }
        info!(documents = self.documents.len(), "merged descriptors by transform");
        Ok(Some(MergeOutput::Document(merged)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_str;

    /// Keeps the right document, after checking the envelope shape.
    fn take_right(input: &[u8]) -> std::result::Result<Vec<u8>, TransformError> {
        let envelope = crate::xml::parse_bytes(input)?;
        let root = envelope.root();
        if root.name() != "merge" || root.first_child("left").is_none() {
            return Err("bad envelope".into());
        }
        let right = root
            .find("right")
            .and_then(|r| r.child_elements().next())
            .ok_or("no right document")?;
        Ok(crate::xml::print_to_bytes_pretty(&Document::new(right.clone()))?)
    }

    #[test]
    fn test_envelope_and_fold() {
        let mut merger = DocumentMergerByXslt::new(take_right);
        for name in ["a", "b", "c"] {
            let doc = parse_str(&format!("<web-app><display-name>{name}</display-name></web-app>"))
                .unwrap();
            merger.add_merge_item(doc.into()).unwrap();
        }
        let merged = merger.perform_merge().unwrap().unwrap().into_document().unwrap();
        assert_eq!(merged.root().text_at("display-name"), Some("c".to_string()));
    }

    #[test]
    fn test_doctype_is_kept() {
        let merger = DocumentMergerByXslt::new(take_right);
        let left = parse_str(r#"<!DOCTYPE web-app SYSTEM "web.dtd"><web-app/>"#).unwrap();
        let right = parse_str("<web-app><distributable/></web-app>").unwrap();
        let merged = merger.merge_pair(&left, &right).unwrap();
        assert_eq!(merged.doctype(), Some(r#"web-app SYSTEM "web.dtd""#));
        assert!(merged.root().first_child("distributable").is_some());
    }

    #[test]
    fn test_transform_failure() {
        let mut merger = DocumentMergerByXslt::new(
            |_: &[u8]| -> std::result::Result<Vec<u8>, TransformError> { Err("boom".into()) },
        );
        merger.add_merge_item(parse_str("<a/>").unwrap().into()).unwrap();
        merger.add_merge_item(parse_str("<a/>").unwrap().into()).unwrap();
        let err = merger.perform_merge().unwrap_err();
        match err {
            Error::InDocument { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, Error::Transform(ref msg) if msg == "boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_output_must_parse() {
        let merger = DocumentMergerByXslt::new(
            |_: &[u8]| -> std::result::Result<Vec<u8>, TransformError> { Ok(b"not xml".to_vec()) },
        );
        let doc = parse_str("<a/>").unwrap();
        assert!(matches!(
            merger.merge_pair(&doc, &doc),
            Err(Error::Transform(_))
        ));
    }

    const TAKE_RIGHT_XSL: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
  <xsl:template match="/merge">
    <xsl:copy-of select="right/*"/>
  </xsl:template>
</xsl:stylesheet>
"#;

    fn xsltproc_available() -> bool {
        let found = Command::new("xsltproc")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok();
        if !found {
            eprintln!("xsltproc not found on PATH, skipping");
        }
        found
    }

    #[test]
    fn test_xsltproc_runs_stylesheet() {
        if !xsltproc_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let stylesheet = dir.path().join("take-right.xsl");
        std::fs::write(&stylesheet, TAKE_RIGHT_XSL).unwrap();

        // Large enough to fill the pipe buffers on both ends
        let mut right = Element::new("web-app");
        for i in 0..2000 {
            right.push(
                Element::new("servlet")
                    .leaf("servlet-name", format!("s{i}"))
                    .leaf("servlet-class", "com.example.Servlet"),
            );
        }
        let left = parse_str(r#"<!DOCTYPE web-app SYSTEM "web.dtd"><web-app/>"#).unwrap();

        let merger = DocumentMergerByXslt::new(XsltProc::new(&stylesheet));
        let merged = merger.merge_pair(&left, &Document::new(right)).unwrap();
        assert_eq!(merged.root().children_named("servlet").count(), 2000);
        assert_eq!(merged.doctype(), Some(r#"web-app SYSTEM "web.dtd""#));
    }

    #[test]
    fn test_xsltproc_failure_is_reported() {
        if !xsltproc_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let merger = DocumentMergerByXslt::new(XsltProc::new(dir.path().join("missing.xsl")));
        let doc = parse_str("<web-app/>").unwrap();
        match merger.merge_pair(&doc, &doc) {
            Err(Error::Transform(msg)) => assert!(msg.contains("exited with"), "{msg}"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_program() {
        let transform = XsltProc::new("merge.xsl").with_program("/nonexistent/xsltproc");
        assert_eq!(transform.stylesheet(), Path::new("merge.xsl"));
        assert!(transform.transform(b"<merge/>").is_err());
    }

    #[test]
    fn test_rejects_bytes() {
        let mut merger = DocumentMergerByXslt::new(take_right);
        assert!(matches!(
            merger.add_merge_item(MergeItem::Bytes(Vec::new())),
            Err(Error::UnsupportedInputKind { .. })
        ));
    }
}
