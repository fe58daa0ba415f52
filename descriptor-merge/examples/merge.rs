//! Example: fold several web.xml files into one
//!
//! The first file is the base; every later file is merged into it with the
//! overwrite policy, except for servlets, which keep the base definition.
//!
//! Usage: cargo run --example merge <web.xml> <overlay.xml>...

use std::env;
use std::io::{self, Write};

use descriptor_merge::{
    BuiltinStrategy, DescriptorMergerByTag, DescriptorSchema, DocumentMerger,
    DocumentStreamAdapter, MergeOutput, MergeProcessor,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <web.xml> <overlay.xml>...", args[0]);
        std::process::exit(1);
    }

    let merger = DescriptorMergerByTag::new(DescriptorSchema::web_app())
        .with_strategy("servlet", BuiltinStrategy::Preserve);
    let mut processor = DocumentStreamAdapter::new(DocumentMerger::new(merger));

    for path in &args[1..] {
        eprintln!("Adding: {}", path);
        processor.add_file(path)?;
    }

    if let Some(MergeOutput::Bytes(bytes)) = processor.perform_merge()? {
        io::stdout().write_all(&bytes)?;
    }
    Ok(())
}
