//! Three-way classification of the elements of one tag.
//!
//! A [`MergeSet`] partitions the elements of a tag in two documents into
//! left-only, right-only and matched pairs. It is built once per tag per
//! merge step, handed to exactly one strategy, and then dropped.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use super::merge_pair::{ElementHandle, MergeElement, MergePair, Side};
use super::strategy::MergeStrategy;
use super::target::MergeTarget;
use crate::error::{Error, Result, StrategyError};
use crate::node::Element;
use crate::schema::{DescriptorTag, MatchRule};

/// The elements of one tag in one document, in document order.
#[derive(Debug, Clone, Default)]
pub struct MergeNodeList {
    tag: String,
    items: Vec<MergeElement>,
}

impl MergeNodeList {
    /// Collects the root children of `root` that carry `tag`.
    pub fn collect(root: &Element, tag: &DescriptorTag, side: Side) -> Self {
        let items = root
            .children()
            .iter()
            .enumerate()
            .filter_map(|(position, node)| {
                let element = node.as_element()?;
                (element.local_name() == tag.name()).then(|| {
                    MergeElement::new(
                        ElementHandle::new(side, position),
                        element.clone(),
                        tag.key_of(element),
                    )
                })
            })
            .collect();
        MergeNodeList {
            tag: tag.name().to_string(),
            items,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn items(&self) -> &[MergeElement] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for MergeNodeList {
    type Item = MergeElement;
    type IntoIter = std::vec::IntoIter<MergeElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Left-only, right-only and paired elements of one tag.
///
/// Every left element is either in `left_only` or the left member of
/// exactly one pair, and the same holds for the right side. Each bucket
/// keeps document order.
#[derive(Debug, Clone, Default)]
pub struct MergeSet {
    tag: String,
    left_only: Vec<MergeElement>,
    right_only: Vec<MergeElement>,
    both: Vec<MergePair>,
    /// Set for repeatable tags without identity.
    concatenate: bool,
}

impl MergeSet {
    /// Classifies two element lists of the same tag.
    pub fn build(rule: MatchRule<'_>, left: MergeNodeList, right: MergeNodeList) -> Self {
        let mut set = MergeSet {
            tag: left.tag.clone(),
            ..MergeSet::default()
        };
        match rule {
            MatchRule::Keyed(_) => set.classify_keyed(left, right),
            MatchRule::Singleton => set.classify_singleton(left, right),
            MatchRule::Concatenate => {
                set.concatenate = true;
                set.left_only = left.items;
                set.right_only = right.items;
            }
        }
        trace!(
            tag = %set.tag,
            left_only = set.left_only.len(),
            right_only = set.right_only.len(),
            both = set.both.len(),
            "classified"
        );
        set
    }

    /// Pairs each left element with the first unconsumed right element of
    /// the same key. Elements without a key are never paired.
    fn classify_keyed(&mut self, left: MergeNodeList, right: MergeNodeList) {
        let mut right: Vec<Option<MergeElement>> = right.items.into_iter().map(Some).collect();
        let mut by_key: FxHashMap<String, VecDeque<usize>> = FxHashMap::default();
        for (ix, item) in right.iter().enumerate() {
            if let Some(key) = item.as_ref().and_then(MergeElement::key) {
                by_key.entry(key.to_string()).or_default().push_back(ix);
            }
        }

        for item in left.items {
            let matched = item
                .key()
                .and_then(|key| by_key.get_mut(key))
                .and_then(VecDeque::pop_front)
                .and_then(|ix| right[ix].take());
            match matched {
                Some(other) => self.both.push(MergePair::new(item, other)),
                None => self.left_only.push(item),
            }
        }
        self.right_only = right.into_iter().flatten().collect();
    }

    /// Pairs the first occurrence on each side without searching. Surplus
    /// occurrences of a malformed document land in the one-sided buckets.
    fn classify_singleton(&mut self, left: MergeNodeList, right: MergeNodeList) {
        for (side, list) in [(Side::Left, &left), (Side::Right, &right)] {
            if list.items.len() > 1 {
                warn!(
                    tag = %self.tag,
                    ?side,
                    occurrences = list.items.len(),
                    "single-occurrence tag appears more than once"
                );
            }
        }
        let mut left = left.items.into_iter();
        let mut right = right.items.into_iter();
        match (left.next(), right.next()) {
            (Some(l), Some(r)) => self.both.push(MergePair::new(l, r)),
            (Some(l), None) => self.left_only.push(l),
            (None, Some(r)) => self.right_only.push(r),
            (None, None) => {}
        }
        self.left_only.extend(left);
        self.right_only.extend(right);
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn left_only(&self) -> &[MergeElement] {
        &self.left_only
    }

    pub fn right_only(&self) -> &[MergeElement] {
        &self.right_only
    }

    pub fn both(&self) -> &[MergePair] {
        &self.both
    }

    /// Returns true if the set was built for a tag without identity.
    pub fn is_concatenation(&self) -> bool {
        self.concatenate
    }

    /// Returns true if no element of the tag occurs on either side.
    pub fn is_empty(&self) -> bool {
        self.left_only.is_empty() && self.right_only.is_empty() && self.both.is_empty()
    }

    /// Runs a strategy over the set and returns the number of changes.
    ///
    /// Left-only elements and pairs are visited in left document order,
    /// then right-only elements in right document order. The first failure
    /// stops the run; changes made before it stay in the target.
    pub fn apply(
        self,
        strategy: &dyn MergeStrategy,
        target: &mut MergeTarget<'_>,
    ) -> Result<usize> {
        let MergeSet {
            tag,
            left_only,
            right_only,
            both,
            ..
        } = self;

        let mut left_only = left_only.into_iter().peekable();
        let mut both = both.into_iter().peekable();
        let mut changes = 0;
        loop {
            let pair_first = match (left_only.peek(), both.peek()) {
                (Some(l), Some(p)) => p.left().handle().position() < l.handle().position(),
                (None, Some(_)) => true,
                (Some(_), None) => false,
                (None, None) => break,
            };
            if pair_first {
                if let Some(pair) = both.next() {
                    changes += strategy
                        .in_both(target, &pair)
                        .map_err(|e| wrap(&tag, pair.identity(), e))?;
                }
            } else if let Some(item) = left_only.next() {
                changes += strategy
                    .in_left(target, &item)
                    .map_err(|e| wrap(&tag, item.identity(), e))?;
            }
        }
        for item in right_only {
            changes += strategy
                .in_right(target, &item)
                .map_err(|e| wrap(&tag, item.identity(), e))?;
        }
        Ok(changes)
    }

    /// Appends every right element to the target, whatever the strategy.
    pub fn append_right(self, target: &mut MergeTarget<'_>) -> usize {
        let count = self.right_only.len();
        for item in self.right_only {
            target.add(item.into_element());
        }
        count
    }
}

fn wrap(tag: &str, element: String, error: StrategyError) -> Error {
    match error {
        StrategyError::Conflict(identifier) => Error::UnidentifiableConflict {
            tag: tag.to_string(),
            identifier,
        },
        source => Error::Strategy {
            tag: tag.to_string(),
            element,
            source,
        },
    }
}
