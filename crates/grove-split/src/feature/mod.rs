//! Polymorphic feature columns: numeric and categorical.

mod categorical;
mod numeric;

use std::fmt;

use rand::Rng;

pub use categorical::{CatFeature, CatMap, MAX_EXHAUSTIVE_CATEGORIES};
pub use numeric::NumFeature;

use crate::allocs::SplitScratch;
use crate::error::SplitError;
use crate::splitter::{SplitDescriptor, Splitter};
use crate::target::Target;

/// Suffix appended to the name of a shuffled contrast copy.
pub const CONTRAST_SUFFIX: &str = ":SHUFFLED";

/// Raw cell values treated as missing by [`Feature::append`].
const MISSING_TOKENS: [&str; 6] = ["", "NA", "na", "NaN", "nan", "?"];

pub(crate) fn is_missing_token(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw.trim())
}

/// The variant of a feature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FeatureKind {
    /// Real-valued column.
    Numeric,
    /// Column of category codes backed by a [`CatMap`].
    Categorical,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Numeric => f.write_str("numeric"),
            FeatureKind::Categorical => f.write_str("categorical"),
        }
    }
}

/// Best split found by a single feature's search.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitCandidate {
    /// Where to cut, meaningful only to the feature that produced it.
    pub descriptor: SplitDescriptor,
    /// `parent_impurity - post_split_impurity`.
    pub impurity_decrease: f64,
}

/// One column of the feature matrix.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Feature {
    /// Real-valued feature.
    Numeric(NumFeature),
    /// Categorical feature.
    Categorical(CatFeature),
}

impl Feature {
    /// Create an empty numeric feature.
    #[must_use]
    pub fn numeric(name: impl Into<String>) -> Self {
        Feature::Numeric(NumFeature::new(name.into()))
    }

    /// Create an empty categorical feature.
    #[must_use]
    pub fn categorical(name: impl Into<String>) -> Self {
        Feature::Categorical(CatFeature::new(name.into()))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Feature::Numeric(f) => f.name(),
            Feature::Categorical(f) => f.name(),
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        match self {
            Feature::Numeric(f) => f.name = name,
            Feature::Categorical(f) => f.name = name,
        }
    }

    #[must_use]
    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::Numeric(_) => FeatureKind::Numeric,
            Feature::Categorical(_) => FeatureKind::Categorical,
        }
    }

    /// Return the number of cases held by this feature.
    #[must_use]
    pub fn n_cases(&self) -> usize {
        match self {
            Feature::Numeric(f) => f.n_cases(),
            Feature::Categorical(f) => f.n_cases(),
        }
    }

    #[must_use]
    pub fn is_missing(&self, case: usize) -> bool {
        match self {
            Feature::Numeric(f) => f.missing[case],
            Feature::Categorical(f) => f.missing[case],
        }
    }

    /// Number of cases currently flagged missing.
    #[must_use]
    pub fn n_missing(&self) -> usize {
        let missing = match self {
            Feature::Numeric(f) => &f.missing,
            Feature::Categorical(f) => &f.missing,
        };
        missing.iter().filter(|&&m| m).count()
    }

    /// String form of one case's value, `NA` when missing.
    #[must_use]
    pub fn get_string(&self, case: usize) -> String {
        match self {
            Feature::Numeric(f) => f.get_string(case),
            Feature::Categorical(f) => f.get_string(case),
        }
    }

    /// Parse and append one raw cell value.
    pub fn append(&mut self, raw: &str) {
        match self {
            Feature::Numeric(f) => f.append(raw),
            Feature::Categorical(f) => f.append(raw),
        }
    }

    /// Copy named `<name>:SHUFFLED` whose values are permuted across all cases.
    #[must_use]
    pub fn shuffled_copy(&self, rng: &mut impl Rng) -> Feature {
        let mut copy = self.clone();
        copy.set_name(format!("{}{CONTRAST_SUFFIX}", self.name()));
        copy.shuffle_all(rng);
        copy
    }

    /// Permute values (with their missing flags) among the given case positions only.
    pub fn shuffle_cases(&mut self, cases: &[usize], rng: &mut impl Rng) {
        match self {
            Feature::Numeric(f) => shuffle_positions(&mut f.values, &mut f.missing, cases, rng),
            Feature::Categorical(f) => shuffle_positions(&mut f.codes, &mut f.missing, cases, rng),
        }
    }

    fn shuffle_all(&mut self, rng: &mut impl Rng) {
        match self {
            Feature::Numeric(f) => shuffle_paired(&mut f.values, &mut f.missing, rng),
            Feature::Categorical(f) => shuffle_paired(&mut f.codes, &mut f.missing, rng),
        }
    }

    /// Deep-copy this feature into `dest`, reusing its allocations.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::IncompatibleFeature`] when `dest` is a different variant.
    pub fn copy_into(&self, dest: &mut Feature) -> Result<(), SplitError> {
        match (self, dest) {
            (Feature::Numeric(src), Feature::Numeric(dst)) => {
                dst.refresh_from(src);
                Ok(())
            }
            (Feature::Categorical(src), Feature::Categorical(dst)) => {
                dst.refresh_from(src);
                Ok(())
            }
            (src, dst) => Err(SplitError::IncompatibleFeature {
                name: dst.name().to_string(),
                expected: src.kind(),
                found: dst.kind(),
            }),
        }
    }

    /// Search this feature for the split of `cases` that most reduces the
    /// target's impurity.
    ///
    /// Returns `None` when no boundary leaves at least `min_leaf_size` cases
    /// on both sides (including when the feature is constant over `cases`).
    pub fn best_split(
        &self,
        target: &Target<'_>,
        cases: &[usize],
        parent_impurity: f64,
        min_leaf_size: usize,
        scratch: &mut SplitScratch,
    ) -> Option<SplitCandidate> {
        match self {
            Feature::Numeric(f) => f.best_split(target, cases, parent_impurity, min_leaf_size, scratch),
            Feature::Categorical(f) => {
                f.best_split(target, cases, parent_impurity, min_leaf_size, scratch)
            }
        }
    }

    /// Materialize a [`Splitter`] for the feature at `index` from a descriptor
    /// this feature produced.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::IncompatibleFeature`] when the descriptor belongs
    /// to the other feature kind.
    pub fn decode_split(
        &self,
        index: usize,
        descriptor: &SplitDescriptor,
    ) -> Result<Splitter, SplitError> {
        match (self, descriptor) {
            (Feature::Numeric(f), SplitDescriptor::Numeric { threshold }) => {
                Ok(Splitter::threshold(index, f.name().to_string(), *threshold))
            }
            (Feature::Categorical(f), SplitDescriptor::Categorical { left_codes }) => {
                let left_labels = left_codes
                    .iter()
                    .map(|&code| f.map().label(code).unwrap_or_default().to_string())
                    .collect();
                Ok(Splitter::categories(
                    index,
                    f.name().to_string(),
                    left_codes.clone(),
                    left_labels,
                ))
            }
            (feature, descriptor) => Err(SplitError::IncompatibleFeature {
                name: feature.name().to_string(),
                expected: descriptor.kind(),
                found: feature.kind(),
            }),
        }
    }

    /// Fill missing cells with the feature's representative value and clear
    /// their missing flags. Returns the number of cells filled.
    pub fn impute_missing(&mut self) -> usize {
        match self {
            Feature::Numeric(f) => f.impute_missing(),
            Feature::Categorical(f) => f.impute_missing(),
        }
    }
}

/// Fisher-Yates over the whole column, keeping values and flags paired.
fn shuffle_paired<T>(values: &mut [T], missing: &mut [bool], rng: &mut impl Rng) {
    for i in (1..values.len()).rev() {
        let j = rng.gen_range(0..=i);
        values.swap(i, j);
        missing.swap(i, j);
    }
}

/// Fisher-Yates restricted to `positions`; other cases keep their values.
fn shuffle_positions<T>(
    values: &mut [T],
    missing: &mut [bool],
    positions: &[usize],
    rng: &mut impl Rng,
) {
    for i in (1..positions.len()).rev() {
        let j = rng.gen_range(0..=i);
        values.swap(positions[i], positions[j]);
        missing.swap(positions[i], positions[j]);
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn filled(mut f: Feature, raw: &[&str]) -> Feature {
        for v in raw {
            f.append(v);
        }
        f
    }

    #[test]
    fn missing_tokens_recognized() {
        for tok in ["", "NA", "na", "NaN", "nan", "?", "  NA "] {
            assert!(is_missing_token(tok), "{tok:?} should be missing");
        }
        assert!(!is_missing_token("0"));
        assert!(!is_missing_token("none"));
    }

    #[test]
    fn shuffled_copy_renames_and_preserves_multiset() {
        let f = filled(Feature::numeric("N:x"), &["1", "2", "3", "4", "5", "NA"]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let copy = f.shuffled_copy(&mut rng);

        assert_eq!(copy.name(), "N:x:SHUFFLED");
        assert_eq!(copy.n_cases(), 6);
        assert_eq!(copy.n_missing(), 1);

        let mut orig: Vec<String> = (0..6).map(|c| f.get_string(c)).collect();
        let mut shuffled: Vec<String> = (0..6).map(|c| copy.get_string(c)).collect();
        orig.sort();
        shuffled.sort();
        assert_eq!(orig, shuffled);
        // Source is untouched.
        assert_eq!(f.get_string(0), "1");
    }

    #[test]
    fn shuffle_cases_only_touches_given_positions() {
        let mut f = filled(Feature::categorical("C:x"), &["a", "b", "c", "d", "e", "f"]);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        f.shuffle_cases(&[1, 3, 5], &mut rng);

        assert_eq!(f.get_string(0), "a");
        assert_eq!(f.get_string(2), "c");
        assert_eq!(f.get_string(4), "e");
        let mut moved: Vec<String> = [1, 3, 5].iter().map(|&c| f.get_string(c)).collect();
        moved.sort();
        assert_eq!(moved, vec!["b", "d", "f"]);
    }

    #[test]
    fn copy_into_same_kind_overwrites_destination() {
        let src = filled(Feature::categorical("C:y"), &["x", "y", "x"]);
        let mut dst = filled(Feature::categorical("C:old"), &["q"]);
        src.copy_into(&mut dst).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn copy_into_other_kind_fails() {
        let src = filled(Feature::numeric("N:y"), &["1"]);
        let mut dst = Feature::categorical("C:y");
        let err = src.copy_into(&mut dst).unwrap_err();
        assert!(matches!(
            err,
            SplitError::IncompatibleFeature {
                expected: FeatureKind::Numeric,
                found: FeatureKind::Categorical,
                ..
            }
        ));
    }

    #[test]
    fn decode_split_rejects_foreign_descriptor() {
        let f = filled(Feature::numeric("N:x"), &["1", "2"]);
        let err = f
            .decode_split(0, &SplitDescriptor::Categorical { left_codes: vec![0] })
            .unwrap_err();
        assert!(matches!(err, SplitError::IncompatibleFeature { .. }));
    }

    #[test]
    fn kind_display() {
        assert_eq!(FeatureKind::Numeric.to_string(), "numeric");
        assert_eq!(FeatureKind::Categorical.to_string(), "categorical");
    }
}
