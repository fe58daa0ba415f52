//! Descriptor merging.
//!
//! Merging happens in three layers:
//!
//! 1. **Classification**: for each schema tag, the elements of the base and
//!    of the merged-in document are partitioned into a [`MergeSet`] of
//!    left-only elements, right-only elements and matched [`MergePair`]s.
//! 2. **Strategy application**: a [`MergeStrategy`] is called once per
//!    classified element and changes the base through a [`MergeTarget`].
//! 3. **Processing**: a [`MergeProcessor`] folds a sequence of documents
//!    (or byte streams) into one, either with the tag merger
//!    ([`DocumentMerger`]) or with a stylesheet ([`DocumentMergerByXslt`]).

mod by_tag;
mod merge_pair;
mod merge_set;
mod processor;
mod strategy;
mod target;
mod xslt;

pub use by_tag::DescriptorMergerByTag;
pub use merge_pair::{ElementHandle, MergeElement, MergePair, Side};
pub use merge_set::{MergeNodeList, MergeSet};
pub use processor::{DocumentMerger, DocumentStreamAdapter, MergeItem, MergeOutput, MergeProcessor};
pub use strategy::{
    BuiltinStrategy, ChooseByName, MergeStrategy, NodeMergeStrategy, StrategyResult,
    StrictStrategy,
};
pub use target::MergeTarget;
pub use xslt::{DocumentMergerByXslt, TransformError, XsltProc, XsltTransform};
