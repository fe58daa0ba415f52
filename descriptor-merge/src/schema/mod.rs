//! Descriptor schemas: which root-level tags a descriptor has, in which
//! order, and how their elements are identified.
//!
//! A [`DescriptorSchema`] is an explicit value handed to the merger. There is
//! no global registry; the well-known Java EE layouts are available as
//! presets through [`DescriptorSchema::preset`].

mod identifier;
mod presets;

use rustc_hash::FxHashMap;

pub use identifier::{ExtractFn, Identifier, IdentifierPart};

use crate::error::{Error, Result};
use crate::node::Element;

/// Names accepted by [`DescriptorSchema::preset`].
pub const PRESET_NAMES: &[&str] = &["web-app", "application"];

/// Metadata for one root-level descriptor tag.
#[derive(Debug, Clone)]
pub struct DescriptorTag {
    name: String,
    multiple_allowed: bool,
    identifier: Option<Identifier>,
}

/// How elements of a tag are matched across two documents.
#[derive(Debug, Clone, Copy)]
pub enum MatchRule<'a> {
    /// Pair elements whose identifiers are equal.
    Keyed(&'a Identifier),
    /// At most one element per document: pair the first occurrences.
    Singleton,
    /// No identity: everything from the right is appended.
    Concatenate,
}

impl DescriptorTag {
    /// A tag that occurs at most once per document.
    pub fn singleton(name: impl Into<String>) -> Self {
        DescriptorTag {
            name: name.into(),
            multiple_allowed: false,
            identifier: None,
        }
    }

    /// A repeatable tag without identity.
    pub fn repeatable(name: impl Into<String>) -> Self {
        DescriptorTag {
            name: name.into(),
            multiple_allowed: true,
            identifier: None,
        }
    }

    /// A repeatable tag whose elements are matched by `identifier`.
    pub fn keyed(name: impl Into<String>, identifier: Identifier) -> Self {
        DescriptorTag {
            name: name.into(),
            multiple_allowed: true,
            identifier: Some(identifier),
        }
    }

    /// Builder: sets the identifier.
    pub fn with_identifier(mut self, identifier: Identifier) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_multiple_allowed(&self) -> bool {
        self.multiple_allowed
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    /// Extracts the key of an element of this tag, if the tag has an
    /// identifier and the element carries the key source.
    pub fn key_of(&self, element: &Element) -> Option<String> {
        self.identifier.as_ref().and_then(|id| id.extract(element))
    }

    /// Returns the matching rule derived from this tag's metadata.
    pub fn match_rule(&self) -> MatchRule<'_> {
        match (&self.identifier, self.multiple_allowed) {
            (Some(identifier), _) => MatchRule::Keyed(identifier),
            (None, false) => MatchRule::Singleton,
            (None, true) => MatchRule::Concatenate,
        }
    }
}

/// An ordered set of descriptor tags.
///
/// Tag order is the conventional order of root-level elements and drives
/// both the merge traversal and the insertion point of imported elements.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSchema {
    name: String,
    tags: Vec<DescriptorTag>,
    index: FxHashMap<String, usize>,
}

impl DescriptorSchema {
    /// Creates an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        DescriptorSchema {
            name: name.into(),
            tags: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Builder: appends a tag.
    pub fn with_tag(mut self, tag: DescriptorTag) -> Self {
        self.push_tag(tag);
        self
    }

    /// Appends a tag, or replaces the tag of the same name in place.
    pub fn push_tag(&mut self, tag: DescriptorTag) {
        match self.index.get(tag.name()) {
            Some(&pos) => self.tags[pos] = tag,
            None => {
                self.index.insert(tag.name.clone(), self.tags.len());
                self.tags.push(tag);
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tags in conventional order.
    pub fn tags(&self) -> &[DescriptorTag] {
        &self.tags
    }

    /// Looks up a tag by (local) name.
    pub fn tag(&self, name: &str) -> Option<&DescriptorTag> {
        self.position(name).map(|pos| &self.tags[pos])
    }

    /// Returns the conventional position of a tag.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(crate::node::local_name(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Returns a built-in schema by name (case-insensitive).
    ///
    /// `web.xml` and `application.xml` are accepted as aliases.
    pub fn preset(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "web-app" | "web.xml" => Ok(DescriptorSchema::web_app()),
            "application" | "application.xml" => Ok(DescriptorSchema::application()),
            _ => Err(Error::Config(format!(
                "unknown schema '{}' (expected one of: {})",
                name,
                PRESET_NAMES.join(", ")
            ))),
        }
    }
}
