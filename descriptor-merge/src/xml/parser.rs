//! XML parser that builds descriptor documents.
//!
//! This parser uses quick-xml's streaming API to build owned element trees.
//! No DTD is ever loaded: the DOCTYPE is kept as opaque text, and general
//! entities other than the five predefined ones and character references
//! expand to nothing.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::node::{Document, Element, Node};

/// XML parser that builds descriptor documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlParser {
    /// Drop comments instead of keeping them in the tree.
    skip_comments: bool,
}

impl XmlParser {
    /// Creates a new parser that keeps comments.
    pub fn new() -> Self {
        XmlParser::default()
    }

    /// Creates a parser that drops comments while parsing.
    pub fn without_comments() -> Self {
        XmlParser {
            skip_comments: true,
        }
    }

    /// Parses XML from a string.
    pub fn parse_str(&self, xml: &str) -> Result<Document> {
        let mut reader = Reader::from_str(xml);
        self.configure(&mut reader);
        self.parse_reader(&mut reader)
    }

    /// Parses XML from a byte slice.
    pub fn parse_bytes(&self, xml: &[u8]) -> Result<Document> {
        let mut reader = Reader::from_reader(xml);
        self.configure(&mut reader);
        self.parse_reader(&mut reader)
    }

    /// Parses XML from any buffered reader.
    pub fn parse_buf_read<R: BufRead>(&self, input: R) -> Result<Document> {
        let mut reader = Reader::from_reader(input);
        self.configure(&mut reader);
        self.parse_reader(&mut reader)
    }

    /// Parses XML from a file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        debug!(path = %path.as_ref().display(), "parsing descriptor");
        let file = File::open(path)?;
        self.parse_buf_read(BufReader::new(file))
    }

    fn configure<R>(&self, reader: &mut Reader<R>) {
        // Don't trim text - we handle whitespace ourselves
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
    }

    /// Parses XML from a quick-xml Reader.
    fn parse_reader<R: BufRead>(&self, reader: &mut Reader<R>) -> Result<Document> {
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut doctype: Option<String> = None;
        let mut current_text = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    flush_text(&mut current_text, &mut stack);
                    let element = self.parse_element(e, reader)?;
                    stack.push(element);
                }
                Ok(Event::End(_)) => {
                    flush_text(&mut current_text, &mut stack);
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::Parse("unexpected closing tag".to_string()))?;
                    attach(element, &mut stack, &mut root)?;
                }
                Ok(Event::Empty(ref e)) => {
                    // Self-closing tag - handle like Start + End
                    flush_text(&mut current_text, &mut stack);
                    let element = self.parse_element(e, reader)?;
                    attach(element, &mut stack, &mut root)?;
                }
                Ok(Event::Text(e)) => {
                    let raw =
                        std::str::from_utf8(e.as_ref()).map_err(|e| Error::Parse(e.to_string()))?;
                    let text = unescape(raw).map_err(|e| Error::Parse(e.to_string()))?;
                    if stack.is_empty() {
                        if !text.trim().is_empty() {
                            return Err(Error::Parse("text outside of the root element".into()));
                        }
                    } else {
                        current_text.push_str(&text);
                    }
                }
                Ok(Event::CData(ref e)) => {
                    // Treat CDATA like text
                    current_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                Ok(Event::GeneralRef(ref e)) => {
                    let name =
                        std::str::from_utf8(e.as_ref()).map_err(|e| Error::Parse(e.to_string()))?;
                    match resolve_reference(name) {
                        Some(resolved) => current_text.push_str(&resolved),
                        None => trace!(entity = name, "unresolved entity expands to nothing"),
                    }
                }
                Ok(Event::Comment(ref e)) if !self.skip_comments => {
                    flush_text(&mut current_text, &mut stack);
                    // Comments outside the root element are not kept
                    if let Some(parent) = stack.last_mut() {
                        let comment = String::from_utf8_lossy(e.as_ref()).to_string();
                        parent.push(Node::Comment(comment));
                    }
                }
                Ok(Event::Comment(_)) => {}
                Ok(Event::PI(ref e)) => {
                    if let Some(parent) = stack.last_mut() {
                        let pi = String::from_utf8_lossy(e.as_ref()).to_string();
                        parent.push(Node::ProcessingInstruction(pi));
                    }
                }
                Ok(Event::DocType(ref e)) => {
                    let raw = String::from_utf8_lossy(e.as_ref());
                    doctype = Some(raw.trim().to_string());
                }
                Ok(Event::Decl(_)) => {
                    // The declaration is regenerated on output
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Parse(format!(
                        "error at position {}: {}",
                        reader.error_position(),
                        e
                    )))
                }
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(Error::Parse(format!("unclosed element <{}>", open.name())));
        }
        let root = root.ok_or_else(|| Error::Parse("document has no root element".into()))?;

        Ok(Document::from_parts(doctype, root))
    }

    /// Parses an element's name and attributes.
    fn parse_element<R: BufRead>(&self, e: &BytesStart, reader: &Reader<R>) -> Result<Element> {
        let name = reader
            .decoder()
            .decode(e.name().as_ref())
            .map_err(|e| Error::Parse(e.to_string()))?
            .to_string();

        let mut attributes = HashMap::new();
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|e| Error::Parse(format!("Attribute error: {}", e)))?;
            let key = reader
                .decoder()
                .decode(attr.key.as_ref())
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_string();
            let value = attr
                .decode_and_unescape_value_with(reader.decoder(), |entity| {
                    resolve_predefined_entity(entity).or_else(|| {
                        trace!(entity, "unresolved entity expands to nothing");
                        Some("")
                    })
                })
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_string();
            attributes.insert(key, value);
        }

        Ok(Element::with_attributes(name, attributes))
    }
}

/// Moves accumulated text into the innermost open element.
///
/// Whitespace-only runs are indentation and are dropped; other text is
/// trimmed, since the printer re-indents everything anyway.
fn flush_text(text: &mut String, stack: &mut [Element]) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        if let Some(parent) = stack.last_mut() {
            parent.push(Node::Text(trimmed.to_string()));
        }
    }
    text.clear();
}

/// Attaches a finished element to its parent, or makes it the root.
fn attach(element: Element, stack: &mut [Element], root: &mut Option<Element>) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(Error::Parse(format!(
            "more than one root element (found <{}>)",
            element.name()
        ))),
    }
}

/// Resolves a general entity or character reference.
///
/// Returns `None` for entities that would need a DTD to resolve.
fn resolve_reference(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    resolve_predefined_entity(name).map(str::to_string)
}

/// Parses XML from a file.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    XmlParser::new().parse_file(path)
}

/// Parses XML from a string.
pub fn parse_str(xml: &str) -> Result<Document> {
    XmlParser::new().parse_str(xml)
}

/// Parses XML from a byte slice.
pub fn parse_bytes(xml: &[u8]) -> Result<Document> {
    XmlParser::new().parse_bytes(xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_xml() {
        let doc = parse_str(r#"<root><child>text</child></root>"#).unwrap();
        assert_eq!(doc.root().name(), "root");
        assert_eq!(doc.root().text_at("child"), Some("text".to_string()));
    }

    #[test]
    fn test_parse_with_attributes() {
        let doc = parse_str(r#"<root id="foo" class="bar">content</root>"#).unwrap();
        let root = doc.root();
        assert_eq!(root.attribute("id"), Some("foo"));
        assert_eq!(root.attribute("class"), Some("bar"));
        assert_eq!(root.text_content(), "content");
    }

    #[test]
    fn test_indentation_is_dropped() {
        let xml = "<web-app>\n  <display-name>  My App  </display-name>\n</web-app>";
        let doc = parse_str(xml).unwrap();
        assert_eq!(doc.root().children().len(), 1);
        assert_eq!(doc.root().text_at("display-name"), Some("My App".to_string()));
    }

    #[test]
    fn test_empty_element() {
        let doc = parse_str(r#"<root><distributable /></root>"#).unwrap();
        let child = doc.root().first_child("distributable").unwrap();
        assert!(child.children().is_empty());
    }

    #[test]
    fn test_comments_are_kept() {
        let doc = parse_str("<root><!-- servlets --><servlet/></root>").unwrap();
        assert_eq!(
            doc.root().children()[0],
            Node::Comment(" servlets ".to_string())
        );

        let doc = XmlParser::without_comments()
            .parse_str("<root><!-- servlets --><servlet/></root>")
            .unwrap();
        assert_eq!(doc.root().children().len(), 1);
    }

    #[test]
    fn test_doctype_is_preserved_not_resolved() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE web-app PUBLIC "-//Sun Microsystems, Inc.//DTD Web Application 2.3//EN" "http://unreachable.invalid/web-app_2_3.dtd">
<web-app><display-name>x</display-name></web-app>"#;
        let doc = parse_str(xml).unwrap();
        let doctype = doc.doctype().unwrap();
        assert!(doctype.starts_with("web-app PUBLIC"));
        assert!(doctype.contains("web-app_2_3.dtd"));
    }

    #[test]
    fn test_entities() {
        let doc = parse_str("<a>x &amp; y &#65;&#x42; &unknown;z</a>").unwrap();
        assert_eq!(doc.root().text_content(), "x & y AB z");

        let doc = parse_str(
            r#"<web-app><display-name lang="&foo;en" title="a &amp; &#66;&unknown;">x</display-name></web-app>"#,
        )
        .unwrap();
        let name = doc.root().first_child("display-name").unwrap();
        assert_eq!(name.attribute("lang"), Some("en"));
        assert_eq!(name.attribute("title"), Some("a & B"));
        assert_eq!(name.text_content(), "x");
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(parse_str("<a><b></a>"), Err(Error::Parse(_))));
        assert!(matches!(parse_str("<a>"), Err(Error::Parse(_))));
        assert!(matches!(parse_str(""), Err(Error::Parse(_))));
        assert!(matches!(parse_str("<a/><b/>"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_nested_elements() {
        let doc = parse_str(r#"<a><b><c>deep</c></b></a>"#).unwrap();
        assert_eq!(doc.root().text_at("b/c"), Some("deep".to_string()));
    }
}
