//! Tag-by-tag descriptor merging.

use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, instrument, warn};

use super::merge_pair::Side;
use super::merge_set::{MergeNodeList, MergeSet};
use super::strategy::{BuiltinStrategy, MergeStrategy};
use super::target::MergeTarget;
use crate::error::Result;
use crate::node::Document;
use crate::schema::DescriptorSchema;

/// Merges two descriptors one schema tag at a time.
///
/// Tags are visited in schema order. For each tag the elements of both
/// documents are classified into a [`MergeSet`] and handed to the strategy
/// registered for that tag, or to the default strategy (overwrite unless
/// changed). Repeatable tags without identifier are concatenated whatever
/// the strategy. Tags the schema does not know are never touched.
#[derive(Debug, Clone)]
pub struct DescriptorMergerByTag {
    schema: DescriptorSchema,
    strategies: FxHashMap<String, Arc<dyn MergeStrategy>>,
    default_strategy: Arc<dyn MergeStrategy>,
}

impl DescriptorMergerByTag {
    /// Creates a merger with no per-tag strategies.
    pub fn new(schema: DescriptorSchema) -> Self {
        DescriptorMergerByTag {
            schema,
            strategies: FxHashMap::default(),
            default_strategy: Arc::new(BuiltinStrategy::Overwrite),
        }
    }

    pub fn schema(&self) -> &DescriptorSchema {
        &self.schema
    }

    /// Registers the strategy for a tag, replacing any previous one.
    pub fn set_strategy(&mut self, tag: impl Into<String>, strategy: impl MergeStrategy + 'static) {
        self.set_shared_strategy(tag, Arc::new(strategy));
    }

    /// Registers an already shared strategy for a tag.
    pub fn set_shared_strategy(&mut self, tag: impl Into<String>, strategy: Arc<dyn MergeStrategy>) {
        let tag = tag.into();
        if self.schema.tag(&tag).is_none() {
            warn!(tag = %tag, schema = self.schema.name(), "strategy set for a tag the schema does not know");
        }
        self.strategies.insert(tag, strategy);
    }

    /// Builder: registers the strategy for a tag.
    pub fn with_strategy(mut self, tag: impl Into<String>, strategy: impl MergeStrategy + 'static) -> Self {
        self.set_strategy(tag, strategy);
        self
    }

    /// Sets the strategy used for tags without a registered one.
    pub fn set_default_strategy(&mut self, strategy: impl MergeStrategy + 'static) {
        self.default_strategy = Arc::new(strategy);
    }

    /// Sets an already shared default strategy.
    pub fn set_shared_default_strategy(&mut self, strategy: Arc<dyn MergeStrategy>) {
        self.default_strategy = strategy;
    }

    /// Returns the strategy that applies to a tag.
    pub fn strategy_for(&self, tag: &str) -> &dyn MergeStrategy {
        self.strategies
            .get(tag)
            .unwrap_or(&self.default_strategy)
            .as_ref()
    }

    /// Classifies the elements of one tag in two documents.
    ///
    /// Returns `None` if the schema has no such tag.
    pub fn classify(&self, tag: &str, left: &Document, right: &Document) -> Option<MergeSet> {
        let tag = self.schema.tag(tag)?;
        Some(MergeSet::build(
            tag.match_rule(),
            MergeNodeList::collect(left.root(), tag, Side::Left),
            MergeNodeList::collect(right.root(), tag, Side::Right),
        ))
    }

    /// Merges `other` into `base` and returns the number of changes.
    ///
    /// On error `base` keeps the changes applied before the failing element.
    #[instrument(level = "debug", skip_all, fields(schema = self.schema.name()))]
    pub fn merge(&self, base: &mut Document, other: &Document) -> Result<usize> {
        if base.root().local_name() != other.root().local_name() {
            warn!(
                left = base.root().name(),
                right = other.root().name(),
                "merging documents with different root elements"
            );
        }
        self.log_unknown_tags(other);

        let mut changes = 0;
        for tag in self.schema.tags() {
            let set = MergeSet::build(
                tag.match_rule(),
                MergeNodeList::collect(base.root(), tag, Side::Left),
                MergeNodeList::collect(other.root(), tag, Side::Right),
            );
            if set.is_empty() {
                continue;
            }
            let mut target = MergeTarget::new(base.root_mut(), &self.schema);
            let applied = if set.is_concatenation() {
                set.append_right(&mut target)
            } else {
                set.apply(self.strategy_for(tag.name()), &mut target)?
            };
            if applied > 0 {
                debug!(tag = tag.name(), changes = applied, "merged tag");
            }
            changes += applied;
        }
        Ok(changes)
    }

    /// Returns a merged copy of `base`, leaving both inputs untouched.
    pub fn merged(&self, base: &Document, other: &Document) -> Result<Document> {
        let mut merged = base.clone();
        self.merge(&mut merged, other)?;
        Ok(merged)
    }

    fn log_unknown_tags(&self, other: &Document) {
        let unknown: BTreeSet<&str> = other
            .root()
            .child_elements()
            .map(|e| e.local_name())
            .filter(|name| self.schema.position(name).is_none())
            .collect();
        for tag in unknown {
            debug!(tag, "skipping tag unknown to the schema");
        }
    }
}
