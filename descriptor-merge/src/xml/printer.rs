//! XML printer that serializes descriptor documents.
//!
//! Output always starts with an XML declaration, followed by the preserved
//! DOCTYPE (if any) and the element tree. In pretty mode every element sits
//! on its own line with two spaces of indentation per level; elements that
//! only hold text are kept on one line.

use std::io::Write;

use crate::node::{Document, Element, Node};

/// Options for XML printing.
#[derive(Debug, Clone, Default)]
pub struct XmlPrinterOptions {
    /// Whether to pretty-print with indentation.
    pub pretty_print: bool,
}

/// XML printer that outputs documents.
pub struct XmlPrinter<W: Write> {
    writer: W,
    options: XmlPrinterOptions,
}

impl<W: Write> XmlPrinter<W> {
    /// Creates a new XML printer.
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, XmlPrinterOptions::default())
    }

    /// Creates a new XML printer with the given options.
    pub fn with_options(writer: W, options: XmlPrinterOptions) -> Self {
        XmlPrinter { writer, options }
    }

    /// Prints a whole document, including the XML declaration.
    pub fn print(&mut self, document: &Document) -> std::io::Result<()> {
        write!(self.writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        self.newline()?;
        if let Some(doctype) = document.doctype() {
            write!(self.writer, "<!DOCTYPE {}>", doctype)?;
            self.newline()?;
        }
        self.print_element(document.root(), 0)?;
        if !self.options.pretty_print {
            writeln!(self.writer)?;
        }
        self.writer.flush()
    }

    /// Prints a single element as a fragment (no XML declaration).
    pub fn print_fragment(&mut self, element: &Element) -> std::io::Result<()> {
        self.print_element(element, 0)?;
        self.writer.flush()
    }

    fn print_element(&mut self, element: &Element, level: usize) -> std::io::Result<()> {
        self.indent(level)?;
        write!(self.writer, "{}", start_tag(element))?;

        let children = element.children();
        if children.is_empty() {
            write!(self.writer, " />")?;
            return self.newline();
        }

        write!(self.writer, ">")?;
        if children.iter().all(Node::is_text) {
            // Text-only elements stay on one line
            for child in children {
                if let Node::Text(text) = child {
                    write!(self.writer, "{}", to_entities(text))?;
                }
            }
        } else {
            self.newline()?;
            for child in children {
                self.print_node(child, level + 1)?;
            }
            self.indent(level)?;
        }
        write!(self.writer, "</{}>", element.name())?;
        self.newline()
    }

    fn print_node(&mut self, node: &Node, level: usize) -> std::io::Result<()> {
        match node {
            Node::Element(element) => self.print_element(element, level),
            Node::Text(text) => {
                self.indent(level)?;
                write!(self.writer, "{}", to_entities(text))?;
                self.newline()
            }
            Node::Comment(comment) => {
                self.indent(level)?;
                write!(self.writer, "<!--{}-->", comment)?;
                self.newline()
            }
            Node::ProcessingInstruction(pi) => {
                self.indent(level)?;
                write!(self.writer, "<?{}?>", pi)?;
                self.newline()
            }
        }
    }

    fn indent(&mut self, level: usize) -> std::io::Result<()> {
        if self.options.pretty_print {
            write!(self.writer, "{}", "  ".repeat(level))?;
        }
        Ok(())
    }

    fn newline(&mut self) -> std::io::Result<()> {
        if self.options.pretty_print {
            writeln!(self.writer)?;
        }
        Ok(())
    }
}

/// Builds the opening tag without its closing bracket.
fn start_tag(element: &Element) -> String {
    let mut tag = String::new();
    tag.push('<');
    tag.push_str(element.name());

    // Add attributes (sorted for deterministic output)
    let attrs = element.attributes();
    let mut attr_names: Vec<&String> = attrs.keys().collect();
    attr_names.sort();
    for name in attr_names {
        tag.push(' ');
        tag.push_str(name);
        tag.push_str("=\"");
        tag.push_str(&to_entities(&attrs[name]));
        tag.push('"');
    }
    tag
}

/// Converts special characters to XML entities.
fn to_entities(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '\'' => result.push_str("&apos;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

/// Prints a document to a string without indentation.
pub fn print_to_string(document: &Document) -> std::io::Result<String> {
    let mut output = Vec::new();
    XmlPrinter::new(&mut output).print(document)?;
    Ok(String::from_utf8_lossy(&output).to_string())
}

/// Prints a document to a string with pretty printing.
pub fn print_to_string_pretty(document: &Document) -> std::io::Result<String> {
    Ok(String::from_utf8_lossy(&print_to_bytes_pretty(document)?).to_string())
}

/// Prints a document to bytes with pretty printing.
pub fn print_to_bytes_pretty(document: &Document) -> std::io::Result<Vec<u8>> {
    let mut output = Vec::new();
    let options = XmlPrinterOptions { pretty_print: true };
    XmlPrinter::with_options(&mut output, options).print(document)?;
    Ok(output)
}
