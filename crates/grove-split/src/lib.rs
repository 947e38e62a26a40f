//! Split search and contrast features for tree ensembles.
//!
//! Holds a column-oriented [`FeatureMatrix`] of numeric and categorical
//! features and finds, for one tree node, the feature split that most
//! reduces a target's impurity. The search can re-score candidates on
//! out-of-bag cases and vet them against a shuffled copy of the target.
//! Shuffled contrast features give a null baseline for feature importance,
//! which [`SurveyConfig::survey`] uses to rank features over repeated
//! bootstrap root splits.

mod allocs;
mod config;
mod error;
mod feature;
mod importance;
mod matrix;
mod sampling;
mod splitter;
mod survey;
mod target;

pub use allocs::{BestSplitAllocs, SplitScratch};
pub use config::{SplitterConfig, SurveyConfig};
pub use error::SplitError;
pub use feature::{
    CONTRAST_SUFFIX, CatFeature, CatMap, Feature, FeatureKind, MAX_EXHAUSTIVE_CATEGORIES,
    NumFeature, SplitCandidate,
};
pub use importance::{RankedFeature, is_contrast_name};
pub use matrix::{FeatureMatrix, MIN_IMPURITY_DECREASE, SplitOutcome};
pub use sampling::bootstrap_sample;
pub use splitter::{FeatureIndex, Partition, SplitDescriptor, SplitRule, Splitter};
pub use survey::SurveyResult;
pub use target::{SplitCriterion, Target};
