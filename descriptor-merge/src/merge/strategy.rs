//! Merge strategies.
//!
//! A strategy decides what happens to the elements of one tag once they
//! have been classified: it is called once per left-only element, once per
//! matched pair and once per right-only element, and reports how many
//! structural changes it made to the base.
//!
//! The three built-in policies are the constants of [`BuiltinStrategy`].
//! Anything else implements [`MergeStrategy`] directly; [`ChooseByName`],
//! [`NodeMergeStrategy`] and [`StrictStrategy`] are provided.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use tracing::trace;

use super::merge_pair::{MergeElement, MergePair};
use super::target::MergeTarget;
use crate::error::{Error, StrategyError};
use crate::node::{Element, Node};

/// Result of a strategy callback: the number of changes applied.
pub type StrategyResult = std::result::Result<usize, StrategyError>;

/// Per-tag merge policy.
pub trait MergeStrategy: fmt::Debug + Send + Sync {
    /// Called for an element that only exists in the base.
    fn in_left(&self, target: &mut MergeTarget<'_>, item: &MergeElement) -> StrategyResult;

    /// Called for an element that only exists in the merged-in document.
    fn in_right(&self, target: &mut MergeTarget<'_>, item: &MergeElement) -> StrategyResult;

    /// Called for an element present in both documents.
    fn in_both(&self, target: &mut MergeTarget<'_>, pair: &MergePair) -> StrategyResult;
}

impl<S: MergeStrategy + ?Sized> MergeStrategy for Arc<S> {
    fn in_left(&self, target: &mut MergeTarget<'_>, item: &MergeElement) -> StrategyResult {
        (**self).in_left(target, item)
    }

    fn in_right(&self, target: &mut MergeTarget<'_>, item: &MergeElement) -> StrategyResult {
        (**self).in_right(target, item)
    }

    fn in_both(&self, target: &mut MergeTarget<'_>, pair: &MergePair) -> StrategyResult {
        (**self).in_both(target, pair)
    }
}

/// The stateless built-in policies.
///
/// | callback   | `Ignore` | `Overwrite`        | `Preserve` |
/// |------------|----------|--------------------|------------|
/// | `in_left`  | keep     | keep               | keep       |
/// | `in_right` | drop     | import             | import     |
/// | `in_both`  | keep     | replace with right | keep       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinStrategy {
    /// The base is left untouched.
    Ignore,
    /// The merged-in document wins.
    Overwrite,
    /// The base wins; new elements are still imported.
    Preserve,
}

impl BuiltinStrategy {
    pub const ALL: [BuiltinStrategy; 3] = [
        BuiltinStrategy::Ignore,
        BuiltinStrategy::Overwrite,
        BuiltinStrategy::Preserve,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinStrategy::Ignore => "ignore",
            BuiltinStrategy::Overwrite => "overwrite",
            BuiltinStrategy::Preserve => "preserve",
        }
    }
}

impl fmt::Display for BuiltinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuiltinStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuiltinStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Config(format!("unknown merge strategy '{}'", s)))
    }
}

impl MergeStrategy for BuiltinStrategy {
    fn in_left(&self, _target: &mut MergeTarget<'_>, _item: &MergeElement) -> StrategyResult {
        Ok(0)
    }

    fn in_right(&self, target: &mut MergeTarget<'_>, item: &MergeElement) -> StrategyResult {
        match self {
            BuiltinStrategy::Ignore => Ok(0),
            BuiltinStrategy::Overwrite | BuiltinStrategy::Preserve => {
                target.add(item.element().clone());
                Ok(1)
            }
        }
    }

    fn in_both(&self, target: &mut MergeTarget<'_>, pair: &MergePair) -> StrategyResult {
        match self {
            BuiltinStrategy::Ignore | BuiltinStrategy::Preserve => Ok(0),
            BuiltinStrategy::Overwrite => {
                target.replace(pair.left().handle(), pair.right().element().clone())?;
                Ok(1)
            }
        }
    }
}

/// Delegates to a strategy chosen by the element's identifier value.
///
/// Pairs are looked up by the shared key. Elements without a key, or whose
/// key has no entry, go to the default strategy.
#[derive(Debug, Clone)]
pub struct ChooseByName {
    default: Arc<dyn MergeStrategy>,
    choices: HashMap<String, Arc<dyn MergeStrategy>>,
}

impl ChooseByName {
    pub fn new(default: impl MergeStrategy + 'static) -> Self {
        ChooseByName {
            default: Arc::new(default),
            choices: HashMap::new(),
        }
    }

    /// Builder: routes elements identified by `name` to `strategy`.
    pub fn choice(mut self, name: impl Into<String>, strategy: impl MergeStrategy + 'static) -> Self {
        self.choices.insert(name.into(), Arc::new(strategy));
        self
    }

    /// Returns the strategy used for a key.
    pub fn select(&self, key: Option<&str>) -> &dyn MergeStrategy {
        key.and_then(|key| self.choices.get(key))
            .unwrap_or(&self.default)
            .as_ref()
    }
}

impl MergeStrategy for ChooseByName {
    fn in_left(&self, target: &mut MergeTarget<'_>, item: &MergeElement) -> StrategyResult {
        self.select(item.key()).in_left(target, item)
    }

    fn in_right(&self, target: &mut MergeTarget<'_>, item: &MergeElement) -> StrategyResult {
        self.select(item.key()).in_right(target, item)
    }

    fn in_both(&self, target: &mut MergeTarget<'_>, pair: &MergePair) -> StrategyResult {
        self.select(pair.left().key()).in_both(target, pair)
    }
}

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(left|right):([^\s,<]*)").expect("valid regex")
});

/// Rebuilds matched elements from a template.
///
/// Text in the template may reference either side with `$left:path` and
/// `$right:path`, where `path` is a `/`-separated child path inside the
/// matched element. Missing paths expand to empty text.
///
/// ```text
/// <filter>
///   <filter-name>$left:filter-name</filter-name>
///   <filter-class>$right:filter-class</filter-class>
/// </filter>
/// ```
#[derive(Debug, Clone)]
pub struct NodeMergeStrategy {
    template: Element,
}

impl NodeMergeStrategy {
    pub fn new(template: Element) -> Self {
        NodeMergeStrategy { template }
    }

    pub fn template(&self) -> &Element {
        &self.template
    }

    /// Instantiates the template for a pair.
    pub fn render(&self, left: &Element, right: &Element) -> Result<Element, StrategyError> {
        if self.template.local_name() != left.local_name() {
            return Err(StrategyError::Template(format!(
                "template <{}> cannot merge <{}> elements",
                self.template.name(),
                left.name()
            )));
        }
        let mut merged = self.template.clone();
        substitute(&mut merged, left, right);
        Ok(merged)
    }
}

fn substitute(element: &mut Element, left: &Element, right: &Element) {
    for node in element.children_mut() {
        match node {
            Node::Text(text) => {
                let replaced = PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| {
                    let source = if &caps[1] == "left" { left } else { right };
                    source.text_at(&caps[2]).unwrap_or_default()
                });
                *text = replaced.into_owned();
            }
            Node::Element(child) => substitute(child, left, right),
            Node::Comment(_) | Node::ProcessingInstruction(_) => {}
        }
    }
}

impl MergeStrategy for NodeMergeStrategy {
    fn in_left(&self, _target: &mut MergeTarget<'_>, _item: &MergeElement) -> StrategyResult {
        Ok(0)
    }

    fn in_right(&self, target: &mut MergeTarget<'_>, item: &MergeElement) -> StrategyResult {
        target.add(item.element().clone());
        Ok(1)
    }

    fn in_both(&self, target: &mut MergeTarget<'_>, pair: &MergePair) -> StrategyResult {
        let merged = self.render(pair.left().element(), pair.right().element())?;
        trace!(element = %pair.identity(), "rendered merge template");
        target.replace(pair.left().handle(), merged)?;
        Ok(1)
    }
}

/// Imports new elements and refuses to reconcile differing pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictStrategy;

impl MergeStrategy for StrictStrategy {
    fn in_left(&self, _target: &mut MergeTarget<'_>, _item: &MergeElement) -> StrategyResult {
        Ok(0)
    }

    fn in_right(&self, target: &mut MergeTarget<'_>, item: &MergeElement) -> StrategyResult {
        target.add(item.element().clone());
        Ok(1)
    }

    fn in_both(&self, _target: &mut MergeTarget<'_>, pair: &MergePair) -> StrategyResult {
        if pair.is_identical() {
            return Ok(0);
        }
        let identifier = pair
            .left()
            .key()
            .map(str::to_string)
            .unwrap_or_else(|| pair.identity());
        Err(StrategyError::Conflict(identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{ElementHandle, Side};
    use crate::schema::{DescriptorSchema, DescriptorTag, Identifier};
    use rstest::rstest;

    fn schema() -> DescriptorSchema {
        DescriptorSchema::new("test")
            .with_tag(DescriptorTag::keyed("filter", Identifier::child("filter-name")))
    }

    fn filter(name: &str, class: &str) -> Element {
        Element::new("filter")
            .leaf("filter-name", name)
            .leaf("filter-class", class)
    }

    fn pair_at(position: usize, left: Element, right: Element) -> MergePair {
        let key = Identifier::child("filter-name");
        let left_key = key.extract(&left);
        let right_key = key.extract(&right);
        MergePair::new(
            MergeElement::new(ElementHandle::new(Side::Left, position), left, left_key),
            MergeElement::new(ElementHandle::new(Side::Right, 0), right, right_key),
        )
    }

    fn pair(left: Element, right: Element) -> MergePair {
        pair_at(0, left, right)
    }

    #[rstest]
    #[case("ignore", BuiltinStrategy::Ignore)]
    #[case("Overwrite", BuiltinStrategy::Overwrite)]
    #[case(" PRESERVE ", BuiltinStrategy::Preserve)]
    fn test_builtin_from_str(#[case] name: &str, #[case] expected: BuiltinStrategy) {
        assert_eq!(name.parse::<BuiltinStrategy>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_builtin() {
        let err = "merge-everything".parse::<BuiltinStrategy>().unwrap_err();
        assert!(err.to_string().contains("merge-everything"));
    }

    #[rstest]
    #[case(BuiltinStrategy::Ignore, 0, "A")]
    #[case(BuiltinStrategy::Overwrite, 1, "B")]
    #[case(BuiltinStrategy::Preserve, 0, "A")]
    fn test_builtin_in_both(
        #[case] strategy: BuiltinStrategy,
        #[case] changes: usize,
        #[case] class: &str,
    ) {
        let schema = schema();
        let mut root = Element::new("web-app").child(filter("f", "A"));
        let mut target = MergeTarget::new(&mut root, &schema);
        let result = strategy.in_both(&mut target, &pair(filter("f", "A"), filter("f", "B")));
        assert_eq!(result, Ok(changes));
        assert_eq!(root.text_at("filter/filter-class"), Some(class.to_string()));
    }

    #[test]
    fn test_choose_by_name() {
        let strategy = ChooseByName::new(BuiltinStrategy::Overwrite)
            .choice("keep-me", BuiltinStrategy::Preserve);
        let schema = schema();
        let mut root = Element::new("web-app")
            .child(filter("keep-me", "A"))
            .child(filter("other", "A"));
        let mut target = MergeTarget::new(&mut root, &schema);
        strategy
            .in_both(&mut target, &pair(filter("keep-me", "A"), filter("keep-me", "B")))
            .unwrap();
        strategy
            .in_both(&mut target, &pair_at(1, filter("other", "A"), filter("other", "B")))
            .unwrap();

        let classes: Vec<String> = root
            .children_named("filter")
            .map(|f| f.text_at("filter-class").unwrap())
            .collect();
        assert_eq!(classes, vec!["A", "B"]);
    }

    #[test]
    fn test_node_merge_render() {
        let template = Element::new("filter")
            .leaf("filter-name", "$left:filter-name")
            .leaf("filter-class", "$right:filter-class")
            .child(
                Element::new("init-param")
                    .leaf("param-name", "chain")
                    .leaf("param-value", "$left:filter-class,$right:filter-class $left:missing"),
            );
        let strategy = NodeMergeStrategy::new(template);
        let merged = strategy
            .render(&filter("f", "A"), &filter("f", "B"))
            .unwrap();
        assert_eq!(merged.text_at("filter-name"), Some("f".to_string()));
        assert_eq!(merged.text_at("filter-class"), Some("B".to_string()));
        assert_eq!(
            merged.text_at("init-param/param-value"),
            Some("A,B".to_string())
        );
    }

    #[test]
    fn test_node_merge_keeps_template_text() {
        let template = Element::new("filter").leaf("filter-class", " $right:filter-class $left:missing");
        let merged = NodeMergeStrategy::new(template)
            .render(&filter("f", "A"), &filter("f", "B"))
            .unwrap();
        let text = merged
            .first_child("filter-class")
            .and_then(|e| e.children().first())
            .and_then(Node::as_text);
        assert_eq!(text, Some(" B "));
    }

    #[test]
    fn test_node_merge_rejects_other_tags() {
        let strategy = NodeMergeStrategy::new(Element::new("servlet"));
        assert!(matches!(
            strategy.render(&filter("f", "A"), &filter("f", "B")),
            Err(StrategyError::Template(_))
        ));
    }

    #[test]
    fn test_strict() {
        let schema = schema();
        let mut root = Element::new("web-app").child(filter("f", "A"));
        let mut target = MergeTarget::new(&mut root, &schema);
        assert_eq!(
            StrictStrategy.in_both(&mut target, &pair(filter("f", "A"), filter("f", "A"))),
            Ok(0)
        );
        assert_eq!(
            StrictStrategy.in_both(&mut target, &pair(filter("f", "A"), filter("f", "B"))),
            Err(StrategyError::Conflict("f".to_string()))
        );
    }
}
