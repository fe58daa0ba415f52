//! XML parsing and output.
//!
//! Parsing builds owned [`Document`](crate::node::Document) trees; printing
//! writes them back, pretty printed for anything that ends up in an archive.

mod parser;
mod printer;

pub use parser::{parse_bytes, parse_file, parse_str, XmlParser};
pub use printer::{
    print_to_bytes_pretty, print_to_string, print_to_string_pretty, XmlPrinter, XmlPrinterOptions,
};
