//! Strategy-driven merging of XML deployment descriptors.
//!
//! Application servers assemble deployment descriptors (`web.xml`,
//! `application.xml`, ...) from several sources: a web archive's own
//! descriptor plus fragments contributed by overlays. This crate merges
//! such descriptors tag by tag.
//!
//! # Overview
//!
//! For every root-level tag of a [`DescriptorSchema`] the elements of the
//! base document and of the merged-in document are matched through the
//! tag's [`Identifier`] and classified into left-only, right-only and
//! paired elements. A [`MergeStrategy`] then decides what ends up in the
//! base: the built-in policies ignore, overwrite and preserve cover most
//! cases, and custom policies plug in through the same trait.
//!
//! ```
//! use descriptor_merge::{parse_str, BuiltinStrategy, DescriptorMergerByTag, DescriptorSchema};
//!
//! let mut base = parse_str(
//!     "<web-app><servlet><servlet-name>foo</servlet-name><servlet-class>A</servlet-class></servlet></web-app>",
//! )?;
//! let overlay = parse_str(
//!     "<web-app><servlet><servlet-name>foo</servlet-name><servlet-class>B</servlet-class></servlet></web-app>",
//! )?;
//!
//! let merger = DescriptorMergerByTag::new(DescriptorSchema::web_app())
//!     .with_strategy("servlet", BuiltinStrategy::Preserve);
//! merger.merge(&mut base, &overlay)?;
//! assert_eq!(base.root().text_at("servlet/servlet-class").as_deref(), Some("A"));
//! # Ok::<(), descriptor_merge::Error>(())
//! ```
//!
//! Sequences of documents or byte streams are folded with the processors in
//! [`merge`]: [`DocumentMerger`], [`DocumentStreamAdapter`] and
//! [`DocumentMergerByXslt`].

pub mod config;
pub mod error;
pub mod merge;
pub mod node;
pub mod schema;
pub mod xml;

pub use config::{MergeConfig, StrategyConfig, StrategyEntry, TagConfig};
pub use error::{Error, Result, StrategyError};
pub use merge::{
    BuiltinStrategy, ChooseByName, DescriptorMergerByTag, DocumentMerger, DocumentMergerByXslt,
    DocumentStreamAdapter, ElementHandle, MergeElement, MergeItem, MergeNodeList, MergeOutput,
    MergePair, MergeProcessor, MergeSet, MergeStrategy, MergeTarget, NodeMergeStrategy, Side,
    StrategyResult, StrictStrategy, TransformError, XsltProc, XsltTransform,
};
pub use node::{Document, Element, Node};
pub use schema::{DescriptorSchema, DescriptorTag, Identifier, IdentifierPart, MatchRule};
pub use xml::{parse_bytes, parse_file, parse_str, print_to_string_pretty, XmlParser, XmlPrinter};
