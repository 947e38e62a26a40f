//! Configuration builders for split search and the root-split survey.

use crate::error::SplitError;
use crate::matrix::FeatureMatrix;
use crate::survey::SurveyResult;
use crate::target::SplitCriterion;

/// Options for [`FeatureMatrix::best_splitter`](crate::FeatureMatrix::best_splitter).
///
/// # Defaults
///
/// | Parameter       | Default |
/// |-----------------|---------|
/// | `min_leaf_size` | 1       |
/// | `vet`           | false   |
/// | `eval_oob`      | false   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SplitterConfig {
    pub(crate) min_leaf_size: usize,
    pub(crate) vet: bool,
    pub(crate) eval_oob: bool,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            min_leaf_size: 1,
            vet: false,
            eval_oob: false,
        }
    }
}

impl SplitterConfig {
    /// Create a config requiring at least `min_leaf_size` cases per side.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::InvalidMinLeafSize`] if `min_leaf_size` is zero.
    pub fn new(min_leaf_size: usize) -> Result<Self, SplitError> {
        if min_leaf_size == 0 {
            return Err(SplitError::InvalidMinLeafSize { min_leaf_size });
        }
        Ok(Self {
            min_leaf_size,
            ..Self::default()
        })
    }

    /// Penalize each candidate by the decrease it achieves against a
    /// shuffled copy of the target.
    #[must_use]
    pub fn with_vet(mut self, vet: bool) -> Self {
        self.vet = vet;
        self
    }

    /// Re-score promising candidates on the out-of-bag cases.
    #[must_use]
    pub fn with_eval_oob(mut self, eval_oob: bool) -> Self {
        self.eval_oob = eval_oob;
        self
    }

    #[must_use]
    pub fn min_leaf_size(&self) -> usize {
        self.min_leaf_size
    }

    #[must_use]
    pub fn vet(&self) -> bool {
        self.vet
    }

    #[must_use]
    pub fn eval_oob(&self) -> bool {
        self.eval_oob
    }
}

/// Configuration for the root-split survey run by [`SurveyConfig::survey`].
///
/// Construct via [`SurveyConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter              | Default                   |
/// |------------------------|---------------------------|
/// | `seed`                 | 42                        |
/// | `bootstrap_fraction`   | 1.0                       |
/// | `candidates_per_round` | `None` (every feature)    |
/// | `splitter`             | `SplitterConfig::default` |
#[derive(Debug, Clone)]
pub struct SurveyConfig {
    pub(crate) n_rounds: usize,
    pub(crate) seed: u64,
    pub(crate) bootstrap_fraction: f64,
    pub(crate) candidates_per_round: Option<usize>,
    pub(crate) splitter: SplitterConfig,
}

impl SurveyConfig {
    /// Create a new config running `n_rounds` bootstrap rounds.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::InvalidRoundCount`] if `n_rounds` is zero.
    pub fn new(n_rounds: usize) -> Result<Self, SplitError> {
        if n_rounds == 0 {
            return Err(SplitError::InvalidRoundCount { n_rounds });
        }
        Ok(Self {
            n_rounds,
            seed: 42,
            bootstrap_fraction: 1.0,
            candidates_per_round: None,
            splitter: SplitterConfig::default(),
        })
    }

    // --- Setters ---

    /// Set the master seed from which every round's seed is drawn.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the bootstrap fraction (draws per round relative to the case count).
    #[must_use]
    pub fn with_bootstrap_fraction(mut self, bootstrap_fraction: f64) -> Self {
        self.bootstrap_fraction = bootstrap_fraction;
        self
    }

    /// Sample this many candidate features per round. `None` means all.
    #[must_use]
    pub fn with_candidates_per_round(mut self, candidates: Option<usize>) -> Self {
        self.candidates_per_round = candidates;
        self
    }

    /// Set the options passed to every `best_splitter` call.
    #[must_use]
    pub fn with_splitter(mut self, splitter: SplitterConfig) -> Self {
        self.splitter = splitter;
        self
    }

    // --- Getters ---

    #[must_use]
    pub fn n_rounds(&self) -> usize {
        self.n_rounds
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn bootstrap_fraction(&self) -> f64 {
        self.bootstrap_fraction
    }

    #[must_use]
    pub fn candidates_per_round(&self) -> Option<usize> {
        self.candidates_per_round
    }

    #[must_use]
    pub fn splitter(&self) -> &SplitterConfig {
        &self.splitter
    }

    /// Run the survey on `matrix`, predicting the feature at `target_index`.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`SplitError::InvalidBootstrapFraction`] | `bootstrap_fraction` is not in (0.0, 1.0] |
    /// | [`SplitError::InvalidCandidateCount`] | `candidates_per_round` is `Some(0)` |
    /// | [`SplitError::InvalidMinLeafSize`] | the splitter's `min_leaf_size` is zero |
    /// | [`SplitError::FeatureIndexOutOfRange`] | `target_index` is not a feature |
    /// | [`SplitError::EmptyDataset`] | the matrix has no cases |
    pub fn survey(
        &self,
        matrix: &FeatureMatrix,
        target_index: usize,
        criterion: SplitCriterion,
    ) -> Result<SurveyResult, SplitError> {
        crate::survey::survey(self, matrix, target_index, criterion)
    }

    /// Check settings that cannot be validated until the data is known.
    pub(crate) fn validate(&self) -> Result<(), SplitError> {
        if !(self.bootstrap_fraction > 0.0 && self.bootstrap_fraction <= 1.0) {
            return Err(SplitError::InvalidBootstrapFraction {
                fraction: self.bootstrap_fraction,
            });
        }
        if self.candidates_per_round == Some(0) {
            return Err(SplitError::InvalidCandidateCount { candidates: 0 });
        }
        if self.splitter.min_leaf_size == 0 {
            return Err(SplitError::InvalidMinLeafSize { min_leaf_size: 0 });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitter_defaults() {
        let c = SplitterConfig::default();
        assert_eq!(c.min_leaf_size(), 1);
        assert!(!c.vet());
        assert!(!c.eval_oob());
    }

    #[test]
    fn splitter_rejects_zero_leaf_size() {
        assert!(matches!(
            SplitterConfig::new(0),
            Err(SplitError::InvalidMinLeafSize { min_leaf_size: 0 })
        ));
    }

    #[test]
    fn splitter_builder_chain() {
        let c = SplitterConfig::new(3).unwrap().with_vet(true).with_eval_oob(true);
        assert_eq!(c.min_leaf_size(), 3);
        assert!(c.vet());
        assert!(c.eval_oob());
    }

    #[test]
    fn survey_defaults() {
        let c = SurveyConfig::new(10).unwrap();
        assert_eq!(c.n_rounds(), 10);
        assert_eq!(c.seed(), 42);
        assert!((c.bootstrap_fraction() - 1.0).abs() < f64::EPSILON);
        assert_eq!(c.candidates_per_round(), None);
        assert_eq!(c.splitter(), &SplitterConfig::default());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn survey_rejects_zero_rounds() {
        assert!(matches!(
            SurveyConfig::new(0),
            Err(SplitError::InvalidRoundCount { n_rounds: 0 })
        ));
    }

    #[test]
    fn survey_validate_catches_bad_fraction_and_candidates() {
        let c = SurveyConfig::new(1).unwrap().with_bootstrap_fraction(1.5);
        assert!(matches!(c.validate(), Err(SplitError::InvalidBootstrapFraction { .. })));

        let c = SurveyConfig::new(1).unwrap().with_candidates_per_round(Some(0));
        assert!(matches!(c.validate(), Err(SplitError::InvalidCandidateCount { .. })));
    }
}
