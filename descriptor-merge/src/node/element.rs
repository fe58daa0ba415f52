//! XML element type.

use std::collections::HashMap;
use std::fmt;

use super::{local_name, Node};

/// An XML element with a qualified name, attributes and ordered children.
///
/// Equality is structural: names, attribute maps and child sequences must
/// match. Attribute order is not significant, child order is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// The qualified name of the element (e.g. "servlet", "j2ee:servlet").
    name: String,
    /// Attributes keyed by qualified attribute name.
    attributes: HashMap<String, String>,
    /// Child nodes in document order.
    children: Vec<Node>,
}

impl Element {
    /// Creates a new element with no attributes and no children.
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    /// Creates a new element with the given attributes.
    pub fn with_attributes(name: impl Into<String>, attributes: HashMap<String, String>) -> Self {
        Element {
            name: name.into(),
            attributes,
            children: Vec::new(),
        }
    }

    /// Builder: adds an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder: appends a child element.
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Builder: appends a text node.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Builder: appends a child element holding only text, e.g.
    /// `<servlet-name>foo</servlet-name>`.
    pub fn leaf(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.child(Element::new(name).text(text))
    }

    /// Returns the qualified name of the element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name without any namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Returns the attributes.
    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Returns the value of an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Sets an attribute, returning the previous value.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.attributes.insert(name.into(), value.into())
    }

    /// Returns the children as a slice.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Returns a mutable reference to the children.
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Appends a child node.
    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    /// Iterates over the child elements, skipping text and comments.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Iterates over child elements with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.child_elements().filter(move |e| e.local_name() == name)
    }

    /// Returns the first child element with the given local name.
    pub fn first_child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.local_name() == name)
    }

    /// Follows a `/`-separated path of child names, taking the first match
    /// at every step. An empty path (or `.`) returns `self`.
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|step| !step.is_empty() && *step != ".")
            .try_fold(self, |current, step| current.first_child(step))
    }

    /// Returns the concatenated direct text content, trimmed.
    pub fn text_content(&self) -> String {
        let text: String = self
            .children
            .iter()
            .filter_map(Node::as_text)
            .collect::<Vec<_>>()
            .join(" ");
        text.trim().to_string()
    }

    /// Returns the text of the element at `path`, if that element exists.
    pub fn text_at(&self, path: &str) -> Option<String> {
        self.find(path).map(Element::text_content)
    }

    /// Replaces all text children with a single text node.
    ///
    /// Child elements and comments are kept in place.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.retain(|node| !node.is_text());
        self.children.insert(0, Node::Text(text.into()));
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        // Sort for consistent output
        let mut attr_names: Vec<&String> = self.attributes.keys().collect();
        attr_names.sort();
        for name in attr_names {
            write!(f, " {}=\"{}\"", name, self.attributes[name])?;
        }
        write!(f, ">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn servlet(name: &str, class: &str) -> Element {
        Element::new("servlet")
            .leaf("servlet-name", name)
            .leaf("servlet-class", class)
    }

    #[test]
    fn test_builder_and_accessors() {
        let e = Element::new("a").attr("id", "x").text("hello");
        assert_eq!(e.name(), "a");
        assert_eq!(e.attribute("id"), Some("x"));
        assert_eq!(e.text_content(), "hello");
        assert_eq!(e.children().len(), 1);
    }

    #[test]
    fn test_find_path() {
        let e = Element::new("servlet").child(
            Element::new("init-param")
                .leaf("param-name", "debug")
                .leaf("param-value", "true"),
        );
        assert_eq!(e.text_at("init-param/param-value"), Some("true".to_string()));
        assert_eq!(e.find("").map(Element::name), Some("servlet"));
        assert_eq!(e.find("./init-param").map(Element::name), Some("init-param"));
        assert!(e.find("init-param/missing").is_none());
    }

    #[test]
    fn test_first_child_by_local_name() {
        let e = Element::new("web-app")
            .text("intro")
            .child(Element::new("j2ee:servlet").leaf("servlet-name", "a"))
            .child(servlet("b", "B"));
        let name = String::from("servlet");
        let found = e.first_child(&name);
        drop(name);
        assert_eq!(found.and_then(|s| s.text_at("servlet-name")), Some("a".to_string()));
        assert!(e.first_child("filter").is_none());
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(servlet("foo", "A"), servlet("foo", "A"));
        assert_ne!(servlet("foo", "A"), servlet("foo", "B"));

        let a = Element::new("x").attr("a", "1").attr("b", "2");
        let b = Element::new("x").attr("b", "2").attr("a", "1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_local_name_matching() {
        let e = Element::new("web-app").child(Element::new("j2ee:servlet"));
        assert_eq!(e.children_named("servlet").count(), 1);
    }

    #[test]
    fn test_set_text_keeps_elements() {
        let mut e = Element::new("a").text("old").child(Element::new("b"));
        e.set_text("new");
        assert_eq!(e.text_content(), "new");
        assert_eq!(e.child_elements().count(), 1);
    }

    #[test]
    fn test_display() {
        let e = Element::new("a").attr("z", "1").attr("b", "2");
        assert_eq!(e.to_string(), r#"<a b="2" z="1">"#);
    }
}
