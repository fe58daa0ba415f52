//! Located elements and matched pairs.
//!
//! A [`MergeElement`] is an element taken from one side of a merge together
//! with where it was found and the key it was identified by. A
//! [`MergePair`] holds two such elements that were recognised as the same
//! logical item.

use std::fmt;

use crate::node::Element;

/// Which document of a merge step an element comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The accumulating base document.
    Left,
    /// The document being merged in.
    Right,
}

/// Locates an element among the root children of one side.
///
/// `position` is the child index at classification time. Handles of the
/// left side stay usable while the merge target inserts and removes
/// siblings; see [`MergeTarget`](super::MergeTarget).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    side: Side,
    position: usize,
}

impl ElementHandle {
    pub fn new(side: Side, position: usize) -> Self {
        ElementHandle { side, position }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            Side::Left => "left",
            Side::Right => "right",
        };
        write!(f, "{}#{}", side, self.position)
    }
}

/// An element located in one of the merged documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeElement {
    handle: ElementHandle,
    /// Detached copy of the element.
    element: Element,
    /// Identifier value, if the tag has an identifier and the element has a key.
    key: Option<String>,
}

impl MergeElement {
    pub fn new(handle: ElementHandle, element: Element, key: Option<String>) -> Self {
        MergeElement {
            handle,
            element,
            key,
        }
    }

    pub fn handle(&self) -> ElementHandle {
        self.handle
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Consumes this, returning the element copy.
    pub fn into_element(self) -> Element {
        self.element
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// A printable identity: the key, or the position when there is none.
    pub fn identity(&self) -> String {
        match &self.key {
            Some(key) => format!("'{}'", key),
            None => format!("at {}", self.handle),
        }
    }
}

/// Two elements, one from each side, that represent the same item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePair {
    left: MergeElement,
    right: MergeElement,
}

impl MergePair {
    /// Creates a new merge pair.
    pub fn new(left: MergeElement, right: MergeElement) -> Self {
        MergePair { left, right }
    }

    pub fn left(&self) -> &MergeElement {
        &self.left
    }

    pub fn right(&self) -> &MergeElement {
        &self.right
    }

    /// Returns true if both elements are structurally equal.
    pub fn is_identical(&self) -> bool {
        self.left.element == self.right.element
    }

    /// The identity of the pair, taken from the left element.
    pub fn identity(&self) -> String {
        self.left.identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn located(side: Side, position: usize, key: Option<&str>) -> MergeElement {
        MergeElement::new(
            ElementHandle::new(side, position),
            Element::new("servlet"),
            key.map(str::to_string),
        )
    }

    #[test]
    fn test_identity() {
        assert_eq!(located(Side::Left, 3, Some("foo")).identity(), "'foo'");
        assert_eq!(located(Side::Right, 2, None).identity(), "at right#2");
    }

    #[test]
    fn test_pair() {
        let pair = MergePair::new(
            located(Side::Left, 0, Some("foo")),
            located(Side::Right, 5, Some("foo")),
        );
        assert!(pair.is_identical());
        assert_eq!(pair.left().handle().side(), Side::Left);
        assert_eq!(pair.right().handle().position(), 5);
    }
}
