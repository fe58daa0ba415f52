//! Error types for descriptor merging.

use thiserror::Error;

/// Result type alias for descriptor merge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing, configuring or merging descriptors.
#[derive(Error, Debug)]
pub enum Error {
    /// A merge item of the wrong kind was handed to a processor.
    #[error("{processor} can only merge {expected}, got a {found}")]
    UnsupportedInputKind {
        /// The processor that rejected the item.
        processor: &'static str,
        /// The item kind the processor accepts.
        expected: &'static str,
        /// The item kind that was supplied.
        found: &'static str,
    },

    /// XML parse error.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// A merge item could not be parsed into a document.
    #[error("failed to parse merge item #{item}: {source}")]
    ParseFailure {
        /// Zero-based index of the item in the order it was added.
        item: usize,
        /// The underlying parse error.
        #[source]
        source: Box<Error>,
    },

    /// A merge strategy failed on a specific element.
    #[error("merging <{tag}> element {element} failed: {source}")]
    Strategy {
        /// The tag being merged.
        tag: String,
        /// Identity of the offending element (identifier value or position).
        element: String,
        /// What the strategy reported.
        #[source]
        source: StrategyError,
    },

    /// Two elements share an identifier but differ and no policy resolves them.
    #[error("<{tag}> elements identified by '{identifier}' differ and cannot be reconciled")]
    UnidentifiableConflict {
        /// The tag being merged.
        tag: String,
        /// The shared identifier value.
        identifier: String,
    },

    /// A fold step failed; `index` is the document being folded in.
    #[error("merging document #{index} failed: {source}")]
    InDocument {
        /// Zero-based index of the document that was being merged in.
        index: usize,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// The XSLT merge step failed.
    #[error("XSLT transform failed: {0}")]
    Transform(String),

    /// Invalid configuration (strategy names, identifiers, schemas).
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML error from quick-xml.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// TOML configuration could not be deserialized.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Wraps this error with the index of the document that triggered it.
    pub(crate) fn in_document(self, index: usize) -> Self {
        Error::InDocument {
            index,
            source: Box::new(self),
        }
    }
}

/// Errors reported by merge strategy callbacks.
///
/// The merger attaches the tag name and element identity before surfacing
/// these as [`Error::Strategy`] or [`Error::UnidentifiableConflict`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    /// Left and right differ and the strategy refuses to pick one.
    #[error("conflicting content for identifier '{0}'")]
    Conflict(String),

    /// An element handle no longer refers to an element of the target.
    #[error("element handle {0} does not refer to a base element")]
    MissingElement(String),

    /// A template could not be applied.
    #[error("template error: {0}")]
    Template(String),

    /// Any other refusal from a custom strategy.
    #[error("{0}")]
    Rejected(String),
}
