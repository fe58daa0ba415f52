//! Merge processors: folding a sequence of descriptors into one.
//!
//! A [`MergeProcessor`] collects merge items and combines them on
//! [`perform_merge`](MergeProcessor::perform_merge). Items are folded left
//! to right, so the most recently added document is always the "right" side
//! of a merge step and wins singleton conflicts under overwrite.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, info};

use super::by_tag::DescriptorMergerByTag;
use crate::error::{Error, Result};
use crate::node::Document;
use crate::xml::{print_to_bytes_pretty, XmlParser};

/// An input to a merge processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeItem {
    /// An already parsed document.
    Document(Document),
    /// Raw XML bytes.
    Bytes(Vec<u8>),
}

impl MergeItem {
    /// Short name of the item kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            MergeItem::Document(_) => "document",
            MergeItem::Bytes(_) => "byte stream",
        }
    }
}

impl From<Document> for MergeItem {
    fn from(document: Document) -> Self {
        MergeItem::Document(document)
    }
}

impl From<Vec<u8>> for MergeItem {
    fn from(bytes: Vec<u8>) -> Self {
        MergeItem::Bytes(bytes)
    }
}

/// The result of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutput {
    Document(Document),
    Bytes(Vec<u8>),
}

impl MergeOutput {
    /// Returns the document, if this output is one.
    pub fn into_document(self) -> Option<Document> {
        match self {
            MergeOutput::Document(document) => Some(document),
            MergeOutput::Bytes(_) => None,
        }
    }

    /// Returns the bytes, if this output is serialized.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            MergeOutput::Bytes(bytes) => Some(bytes),
            MergeOutput::Document(_) => None,
        }
    }
}

/// Collects items and merges them.
pub trait MergeProcessor {
    /// Adds an item to merge. Processors reject kinds they cannot handle.
    fn add_merge_item(&mut self, item: MergeItem) -> Result<()>;

    /// Merges everything added so far.
    ///
    /// Returns `None` when nothing was added.
    fn perform_merge(&mut self) -> Result<Option<MergeOutput>>;
}

/// Folds documents with a [`DescriptorMergerByTag`].
#[derive(Debug)]
pub struct DocumentMerger {
    merger: DescriptorMergerByTag,
    documents: Vec<Document>,
}

impl DocumentMerger {
    pub fn new(merger: DescriptorMergerByTag) -> Self {
        DocumentMerger {
            merger,
            documents: Vec::new(),
        }
    }

    pub fn merger(&self) -> &DescriptorMergerByTag {
        &self.merger
    }

    pub fn merger_mut(&mut self) -> &mut DescriptorMergerByTag {
        &mut self.merger
    }

    /// Adds a document to the fold.
    pub fn add_document(&mut self, document: Document) {
        self.documents.push(document);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Folds the documents left to right. A single document is returned
    /// unchanged.
    pub fn merge_documents(&self) -> Result<Option<Document>> {
        let mut documents = self.documents.iter();
        let Some(first) = documents.next() else {
            return Ok(None);
        };
        let mut merged = first.clone();
        let mut changes = 0;
        for (offset, document) in documents.enumerate() {
            changes += self
                .merger
                .merge(&mut merged, document)
                .map_err(|e| e.in_document(offset + 1))?;
        }
        info!(
            documents = self.documents.len(),
            changes, "merged descriptors"
        );
        Ok(Some(merged))
    }
}

impl MergeProcessor for DocumentMerger {
    fn add_merge_item(&mut self, item: MergeItem) -> Result<()> {
        match item {
            MergeItem::Document(document) => {
                self.add_document(document);
                Ok(())
            }
            other => Err(Error::UnsupportedInputKind {
                processor: "DocumentMerger",
                expected: "documents",
                found: other.kind(),
            }),
        }
    }

    fn perform_merge(&mut self) -> Result<Option<MergeOutput>> {
        Ok(self.merge_documents()?.map(MergeOutput::Document))
    }
}

/// Parses byte streams for a document processor and serializes its result.
///
/// Items are parsed as they are added; a parse failure names the item by
/// its zero-based position. The merged document is returned pretty printed.
#[derive(Debug)]
pub struct DocumentStreamAdapter<P> {
    inner: P,
    parser: XmlParser,
    added: usize,
}

impl<P: MergeProcessor> DocumentStreamAdapter<P> {
    pub fn new(inner: P) -> Self {
        DocumentStreamAdapter {
            inner,
            parser: XmlParser::new(),
            added: 0,
        }
    }

    /// Uses a specific parser configuration.
    pub fn with_parser(mut self, parser: XmlParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    /// Reads a stream to the end and adds it.
    pub fn add_reader<R: Read>(&mut self, reader: R) -> Result<()> {
        let document = self.parse(|parser| parser.parse_buf_read(BufReader::new(reader)))?;
        self.inner.add_merge_item(MergeItem::Document(document))
    }

    /// Opens, reads and adds a file. The file is closed before returning.
    pub fn add_file<Q: AsRef<Path>>(&mut self, path: Q) -> Result<()> {
        debug!(path = %path.as_ref().display(), "adding descriptor file");
        let file = File::open(path)?;
        self.add_reader(file)
    }

    fn parse<F>(&mut self, parse: F) -> Result<Document>
    where
        F: FnOnce(&XmlParser) -> Result<Document>,
    {
        let item = self.added;
        self.added += 1;
        parse(&self.parser).map_err(|e| Error::ParseFailure {
            item,
            source: Box::new(e),
        })
    }
}

impl<P: MergeProcessor> MergeProcessor for DocumentStreamAdapter<P> {
    fn add_merge_item(&mut self, item: MergeItem) -> Result<()> {
        match item {
            MergeItem::Bytes(bytes) => {
                let document = self.parse(|parser| parser.parse_bytes(&bytes))?;
                self.inner.add_merge_item(MergeItem::Document(document))
            }
            other => Err(Error::UnsupportedInputKind {
                processor: "DocumentStreamAdapter",
                expected: "byte streams",
                found: other.kind(),
            }),
        }
    }

    fn perform_merge(&mut self) -> Result<Option<MergeOutput>> {
        match self.inner.perform_merge()? {
            Some(MergeOutput::Document(document)) => {
                Ok(Some(MergeOutput::Bytes(print_to_bytes_pretty(&document)?)))
            }
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Element;
    use crate::schema::DescriptorSchema;

    fn display_name(name: &str) -> Document {
        Document::new(Element::new("web-app").leaf("display-name", name))
    }

    fn merger() -> DocumentMerger {
        DocumentMerger::new(DescriptorMergerByTag::new(DescriptorSchema::web_app()))
    }

    #[test]
    fn test_empty_and_single() {
        let mut processor = merger();
        assert_eq!(processor.perform_merge().unwrap(), None);

        let doc = display_name("only");
        processor
            .add_merge_item(MergeItem::Document(doc.clone()))
            .unwrap();
        assert_eq!(
            processor.perform_merge().unwrap(),
            Some(MergeOutput::Document(doc))
        );
    }

    #[test]
    fn test_last_folded_wins() {
        let mut processor = merger();
        for name in ["a", "b", "c"] {
            processor.add_merge_item(display_name(name).into()).unwrap();
        }
        let merged = processor.perform_merge().unwrap().unwrap().into_document().unwrap();
        assert_eq!(merged.root().text_at("display-name"), Some("c".to_string()));
    }

    #[test]
    fn test_document_merger_rejects_bytes() {
        let err = merger()
            .add_merge_item(MergeItem::Bytes(b"<web-app/>".to_vec()))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedInputKind {
                found: "byte stream",
                ..
            }
        ));
    }

    #[test]
    fn test_adapter_rejects_documents() {
        let mut adapter = DocumentStreamAdapter::new(merger());
        let err = adapter
            .add_merge_item(display_name("x").into())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedInputKind { found: "document", .. }));
    }

    #[test]
    fn test_adapter_names_failing_item() {
        let mut adapter = DocumentStreamAdapter::new(merger());
        adapter
            .add_merge_item(b"<web-app/>".to_vec().into())
            .unwrap();
        let err = adapter
            .add_merge_item(b"<web-app>".to_vec().into())
            .unwrap_err();
        assert!(matches!(err, Error::ParseFailure { item: 1, .. }));
    }

    #[test]
    fn test_adapter_serializes() {
        let mut adapter = DocumentStreamAdapter::new(merger());
        adapter
            .add_reader(&b"<web-app><display-name>a</display-name></web-app>"[..])
            .unwrap();
        adapter
            .add_merge_item(b"<web-app><display-name>b</display-name></web-app>".to_vec().into())
            .unwrap();
        let bytes = adapter.perform_merge().unwrap().unwrap().into_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("  <display-name>b</display-name>\n"));
    }
}
