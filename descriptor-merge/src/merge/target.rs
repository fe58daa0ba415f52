//! The mutable side of a merge step.
//!
//! A [`MergeTarget`] wraps the root element of the base document while one
//! tag is merged. Strategies only ever change the base through it, which
//! keeps left-side [`ElementHandle`]s valid: every insertion and removal
//! shifts a position map from classification-time indexes to current ones.

use tracing::trace;

use super::merge_pair::{ElementHandle, Side};
use crate::error::StrategyError;
use crate::node::{Element, Node};
use crate::schema::DescriptorSchema;

/// Builder threaded through the strategy callbacks of one tag.
#[derive(Debug)]
pub struct MergeTarget<'a> {
    root: &'a mut Element,
    schema: &'a DescriptorSchema,
    /// Current index of each child that existed at classification time.
    positions: Vec<Option<usize>>,
}

impl<'a> MergeTarget<'a> {
    /// Wraps the root of the base document.
    pub fn new(root: &'a mut Element, schema: &'a DescriptorSchema) -> Self {
        let positions = (0..root.children().len()).map(Some).collect();
        MergeTarget {
            root,
            schema,
            positions,
        }
    }

    /// The root element in its current state.
    pub fn root(&self) -> &Element {
        &*self.root
    }

    pub fn schema(&self) -> &DescriptorSchema {
        self.schema
    }

    /// Returns the base element a handle refers to.
    pub fn element(&self, handle: ElementHandle) -> Result<&Element, StrategyError> {
        let index = self.resolve(handle)?;
        self.root.children()[index]
            .as_element()
            .ok_or_else(|| StrategyError::MissingElement(handle.to_string()))
    }

    /// Adds an element at the conventional insertion point for its tag and
    /// returns the index it was inserted at.
    pub fn add(&mut self, element: Element) -> usize {
        let index = self.insertion_point(element.local_name());
        trace!(tag = element.local_name(), index, "adding element");
        self.insert_at(index, element);
        index
    }

    /// Inserts an element directly before the one a handle refers to.
    pub fn insert_before(
        &mut self,
        handle: ElementHandle,
        element: Element,
    ) -> Result<usize, StrategyError> {
        let index = self.resolve(handle)?;
        self.insert_at(index, element);
        Ok(index)
    }

    /// Replaces a base element in place, returning the old one.
    pub fn replace(
        &mut self,
        handle: ElementHandle,
        element: Element,
    ) -> Result<Element, StrategyError> {
        let index = self.resolve(handle)?;
        match std::mem::replace(&mut self.root.children_mut()[index], Node::Element(element)) {
            Node::Element(old) => Ok(old),
            _ => Err(StrategyError::MissingElement(handle.to_string())),
        }
    }

    /// Removes a base element. Its handle is invalid afterwards.
    pub fn remove(&mut self, handle: ElementHandle) -> Result<Element, StrategyError> {
        let index = self.resolve(handle)?;
        let removed = self.root.children_mut().remove(index);
        self.positions[handle.position()] = None;
        for pos in self.positions.iter_mut().flatten() {
            if *pos > index {
                *pos -= 1;
            }
        }
        match removed {
            Node::Element(element) => Ok(element),
            _ => Err(StrategyError::MissingElement(handle.to_string())),
        }
    }

    fn resolve(&self, handle: ElementHandle) -> Result<usize, StrategyError> {
        if handle.side() != Side::Left {
            return Err(StrategyError::MissingElement(handle.to_string()));
        }
        self.positions
            .get(handle.position())
            .copied()
            .flatten()
            .ok_or_else(|| StrategyError::MissingElement(handle.to_string()))
    }

    fn insert_at(&mut self, index: usize, element: Element) {
        self.root.children_mut().insert(index, Node::Element(element));
        for pos in self.positions.iter_mut().flatten() {
            if *pos >= index {
                *pos += 1;
            }
        }
    }

    /// Finds where a new element of `tag` goes: before the first occurrence
    /// of the nearest later tag present in the document, moving up over
    /// comments that precede it. Unknown tags and tags with no later
    /// sibling are appended.
    fn insertion_point(&self, tag: &str) -> usize {
        let children = self.root.children();
        let Some(position) = self.schema.position(tag) else {
            return children.len();
        };
        let next = self.schema.tags()[position + 1..].iter().find_map(|later| {
            children.iter().position(|node| {
                node.as_element()
                    .is_some_and(|e| e.local_name() == later.name())
            })
        });
        match next {
            Some(mut index) => {
                while index > 0 && children[index - 1].is_comment() {
                    index -= 1;
                }
                index
            }
            None => children.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DescriptorTag, Identifier};

    fn schema() -> DescriptorSchema {
        DescriptorSchema::new("test")
            .with_tag(DescriptorTag::singleton("display-name"))
            .with_tag(DescriptorTag::keyed("filter", Identifier::child("filter-name")))
            .with_tag(DescriptorTag::keyed("servlet", Identifier::child("servlet-name")))
            .with_tag(DescriptorTag::keyed("security-role", Identifier::child("role-name")))
    }

    fn names(root: &Element) -> Vec<String> {
        root.children()
            .iter()
            .map(|node| match node {
                Node::Element(e) => e.name().to_string(),
                Node::Comment(c) => format!("#{}", c),
                _ => "?".to_string(),
            })
            .collect()
    }

    fn left(position: usize) -> ElementHandle {
        ElementHandle::new(Side::Left, position)
    }

    #[test]
    fn test_add_before_later_tag() {
        let schema = schema();
        let mut root = Element::new("web-app")
            .child(Element::new("display-name"))
            .child(Element::new("security-role"));
        let mut target = MergeTarget::new(&mut root, &schema);
        assert_eq!(target.add(Element::new("servlet")), 1);
        assert_eq!(target.add(Element::new("filter")), 1);
        assert_eq!(
            names(&root),
            vec!["display-name", "filter", "servlet", "security-role"]
        );
    }

    #[test]
    fn test_add_skips_back_over_comments() {
        let schema = schema();
        let mut root = Element::new("web-app")
            .child(Element::new("display-name"))
            .child(Element::new("security-role"));
        root.children_mut()
            .insert(1, Node::Comment(" roles ".to_string()));
        MergeTarget::new(&mut root, &schema).add(Element::new("servlet"));
        assert_eq!(
            names(&root),
            vec!["display-name", "servlet", "# roles ", "security-role"]
        );
    }

    #[test]
    fn test_add_appends_unknown_and_last_tags() {
        let schema = schema();
        let mut root = Element::new("web-app").child(Element::new("servlet"));
        let mut target = MergeTarget::new(&mut root, &schema);
        assert_eq!(target.add(Element::new("security-role")), 1);
        assert_eq!(target.add(Element::new("vendor-thing")), 2);
    }

    #[test]
    fn test_handles_follow_insertions_and_removals() {
        let schema = schema();
        let mut root = Element::new("web-app")
            .child(Element::new("display-name").text("a"))
            .child(Element::new("servlet").text("s1"))
            .child(Element::new("security-role").text("r"));
        let mut target = MergeTarget::new(&mut root, &schema);

        target.add(Element::new("filter"));
        assert_eq!(target.element(left(1)).unwrap().text_content(), "s1");
        assert_eq!(target.element(left(2)).unwrap().text_content(), "r");

        let removed = target.remove(left(0)).unwrap();
        assert_eq!(removed.text_content(), "a");
        assert_eq!(target.element(left(1)).unwrap().text_content(), "s1");
        assert_eq!(
            target.element(left(0)),
            Err(StrategyError::MissingElement("left#0".to_string()))
        );

        target
            .replace(left(2), Element::new("security-role").text("r2"))
            .unwrap();
        assert_eq!(names(&root), vec!["filter", "servlet", "security-role"]);
        assert_eq!(root.text_at("security-role"), Some("r2".to_string()));
    }

    #[test]
    fn test_insert_before() {
        let schema = schema();
        let mut root = Element::new("web-app").child(Element::new("servlet"));
        let mut target = MergeTarget::new(&mut root, &schema);
        assert_eq!(target.insert_before(left(0), Element::new("x")).unwrap(), 0);
        assert_eq!(target.element(left(0)).unwrap().name(), "servlet");
    }

    #[test]
    fn test_right_handles_are_rejected() {
        let schema = schema();
        let mut root = Element::new("web-app").child(Element::new("servlet"));
        let target = MergeTarget::new(&mut root, &schema);
        assert!(target
            .element(ElementHandle::new(Side::Right, 0))
            .is_err());
    }
}
