//! Parsed descriptor documents.

use super::Element;

/// A parsed XML document: an optional DOCTYPE and a root element.
///
/// The DOCTYPE is carried verbatim so that merged descriptors keep their
/// declared grammar, but it is never resolved or validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Raw DOCTYPE declaration body (between `<!DOCTYPE` and `>`).
    doctype: Option<String>,
    /// The document element.
    root: Element,
}

impl Document {
    /// Creates a document around a root element.
    pub fn new(root: Element) -> Self {
        Document {
            doctype: None,
            root,
        }
    }

    /// Creates a document with a DOCTYPE declaration.
    pub fn with_doctype(root: Element, doctype: impl Into<String>) -> Self {
        Document {
            doctype: Some(doctype.into()),
            root,
        }
    }

    pub(crate) fn from_parts(doctype: Option<String>, root: Element) -> Self {
        Document { doctype, root }
    }

    /// Returns the DOCTYPE declaration body, if any.
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    /// Returns the root element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Returns a mutable reference to the root element.
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Consumes the document, returning its root element.
    pub fn into_root(self) -> Element {
        self.root
    }
}

impl From<Element> for Document {
    fn from(root: Element) -> Self {
        Document::new(root)
    }
}
