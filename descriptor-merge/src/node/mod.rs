//! Node structures for XML tree representation.
//!
//! Descriptors are held as plain owned trees: an [`Element`] owns its
//! attributes and its ordered children, and a [`Document`] owns its root
//! element. Cloning a subtree always yields a detached copy, so an element
//! imported from another document can never alias the one it came from.

mod document;
mod element;

pub use document::Document;
pub use element::Element;

/// A single node in an element's child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A nested element.
    Element(Element),
    /// Character data, already unescaped and trimmed.
    Text(String),
    /// Comment text, exactly as it appeared between `<!--` and `-->`.
    Comment(String),
    /// Processing instruction content (target and data).
    ProcessingInstruction(String),
}

impl Node {
    /// Returns true if this is an element node.
    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }

    /// Returns true if this is a text node.
    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    /// Returns true if this is a comment node.
    pub fn is_comment(&self) -> bool {
        matches!(self, Node::Comment(_))
    }

    /// Returns a reference to the element, if this is an element node.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Returns a mutable reference to the element, if this is an element node.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the text, if this is a text node.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// Returns the local part of a possibly prefixed XML name.
///
/// Descriptor tags are matched on local names so that `j2ee:servlet` and
/// `servlet` are treated alike.
pub fn local_name(qname: &str) -> &str {
    match qname.rfind(':') {
        Some(ix) => &qname[ix + 1..],
        None => qname,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("servlet"), "servlet");
        assert_eq!(local_name("j2ee:servlet"), "servlet");
        assert_eq!(local_name(""), "");
    }

    #[test]
    fn test_node_accessors() {
        let node = Node::from(Element::new("a"));
        assert!(node.is_element());
        assert!(!node.is_text());
        assert_eq!(node.as_element().map(Element::name), Some("a"));

        let text = Node::Text("hello".to_string());
        assert!(text.is_text());
        assert_eq!(text.as_text(), Some("hello"));
        assert!(text.as_element().is_none());

        assert!(Node::Comment(" c ".to_string()).is_comment());
    }
}
