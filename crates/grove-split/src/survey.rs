//! Repeated bootstrap root splits, ranking features against their contrasts.

use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::allocs::BestSplitAllocs;
use crate::config::SurveyConfig;
use crate::error::SplitError;
use crate::importance::{RankedFeature, aggregate_wins};
use crate::matrix::FeatureMatrix;
use crate::sampling::bootstrap_sample;
use crate::target::{SplitCriterion, Target};

/// Outcome of a survey: every non-target feature ranked by credited decrease.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SurveyResult {
    target: String,
    n_rounds: usize,
    n_split_rounds: usize,
    ranked: Vec<RankedFeature>,
}

impl SurveyResult {
    /// Name of the surveyed target feature.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn n_rounds(&self) -> usize {
        self.n_rounds
    }

    /// Number of rounds in which some candidate cleared the minimum decrease.
    #[must_use]
    pub fn n_split_rounds(&self) -> usize {
        self.n_split_rounds
    }

    /// Features in rank order.
    #[must_use]
    pub fn ranked(&self) -> &[RankedFeature] {
        &self.ranked
    }

    /// Largest importance reached by any contrast feature (0.0 without contrasts).
    #[must_use]
    pub fn contrast_ceiling(&self) -> f64 {
        self.ranked
            .iter()
            .filter(|r| r.is_contrast)
            .map(|r| r.importance)
            .fold(0.0, f64::max)
    }

    /// Real features whose importance strictly exceeds [`contrast_ceiling`](Self::contrast_ceiling).
    #[must_use]
    pub fn significant(&self) -> Vec<&RankedFeature> {
        let ceiling = self.contrast_ceiling();
        self.ranked
            .iter()
            .filter(|r| !r.is_contrast && r.importance > ceiling)
            .collect()
    }
}

#[instrument(skip_all, fields(n_rounds = config.n_rounds, target_index = target_index, n_features = matrix.n_features()))]
pub(crate) fn survey(
    config: &SurveyConfig,
    matrix: &FeatureMatrix,
    target_index: usize,
    criterion: SplitCriterion,
) -> Result<SurveyResult, SplitError> {
    config.validate()?;
    let target_feature = matrix.feature(target_index)?;
    let n_cases = matrix.n_cases();
    if n_cases == 0 {
        return Err(SplitError::EmptyDataset);
    }

    let pool: Vec<usize> = (0..matrix.n_features()).filter(|&i| i != target_index).collect();
    let per_round = config.candidates_per_round.map_or(pool.len(), |k| k.min(pool.len()));
    let draw_count = ((n_cases as f64) * config.bootstrap_fraction).ceil() as usize;

    info!(
        n_cases,
        n_candidates = pool.len(),
        per_round,
        draw_count,
        target = target_feature.name(),
        "surveying root splits"
    );

    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let round_seeds: Vec<u64> = (0..config.n_rounds).map(|_| master_rng.r#gen()).collect();

    let splitter_config = config.splitter;
    let target = Target::new(target_feature, criterion);

    let winners: Vec<Option<(usize, f64)>> = round_seeds
        .into_par_iter()
        .map(|seed| -> Result<Option<(usize, f64)>, SplitError> {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let (in_bag, oob) = bootstrap_sample(n_cases, draw_count, &mut rng);

            let mut candidates: Vec<usize> = if per_round < pool.len() {
                pool.choose_multiple(&mut rng, per_round).copied().collect()
            } else {
                pool.clone()
            };
            candidates.sort_unstable();

            let mut allocs = BestSplitAllocs::new(&target, rng.r#gen());
            let outcome = matrix.best_splitter(
                &target,
                &in_bag,
                &candidates,
                &oob,
                &splitter_config,
                &mut allocs,
            )?;
            Ok(outcome
                .splitter
                .map(|s| (s.feature().index(), outcome.impurity_decrease)))
        })
        .collect::<Result<_, _>>()?;

    let won: Vec<(usize, f64)> = winners.into_iter().flatten().collect();
    debug!(n_split_rounds = won.len(), "survey rounds complete");

    let names: Vec<String> = matrix.features().iter().map(|f| f.name().to_string()).collect();
    let ranked = aggregate_wins(&won, &names, &pool);

    Ok(SurveyResult {
        target: target_feature.name().to_string(),
        n_rounds: config.n_rounds,
        n_split_rounds: won.len(),
        ranked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SplitterConfig;
    use crate::feature::Feature;

    fn matrix() -> FeatureMatrix {
        let mut signal = Feature::numeric("N:signal");
        let mut flat = Feature::numeric("N:flat");
        let mut y = Feature::categorical("C:y");
        for i in 0..40 {
            let class = i % 2;
            signal.append(&(class as f64 * 10.0 + (i % 5) as f64 * 0.1).to_string());
            flat.append("1");
            y.append(&class.to_string());
        }
        let labels = (0..40).map(|i| format!("r{i}")).collect();
        FeatureMatrix::new(vec![signal, flat, y], labels).unwrap()
    }

    #[test]
    fn informative_feature_wins_every_round() {
        let fm = matrix();
        let config = SurveyConfig::new(8).unwrap();
        let result = config.survey(&fm, 2, SplitCriterion::Gini).unwrap();

        assert_eq!(result.target(), "C:y");
        assert_eq!(result.n_rounds(), 8);
        assert_eq!(result.ranked().len(), 2);
        assert_eq!(result.ranked()[0].name, "N:signal");
        assert_eq!(result.ranked()[0].wins, result.n_split_rounds());
        assert!((result.ranked()[0].importance - 1.0).abs() < 1e-12);
        assert_eq!(result.ranked()[1].wins, 0);
    }

    #[test]
    fn significant_without_contrasts_lists_credited_features() {
        let fm = matrix();
        let result = SurveyConfig::new(4)
            .unwrap()
            .survey(&fm, 2, SplitCriterion::Gini)
            .unwrap();
        let names: Vec<&str> = result.significant().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["N:signal"]);
    }

    #[test]
    fn bad_target_index_is_rejected() {
        let fm = matrix();
        let err = SurveyConfig::new(1)
            .unwrap()
            .survey(&fm, 9, SplitCriterion::Gini)
            .unwrap_err();
        assert!(matches!(err, SplitError::FeatureIndexOutOfRange { index: 9, .. }));
    }

    #[test]
    fn empty_matrix_is_rejected() {
        let fm = FeatureMatrix::with_features(vec![Feature::numeric("N:y")]).unwrap();
        let err = SurveyConfig::new(1)
            .unwrap()
            .survey(&fm, 0, SplitCriterion::Gini)
            .unwrap_err();
        assert!(matches!(err, SplitError::EmptyDataset));
    }

    #[test]
    fn candidate_subsampling_respects_count() {
        let fm = matrix();
        let config = SurveyConfig::new(6)
            .unwrap()
            .with_candidates_per_round(Some(1))
            .with_splitter(SplitterConfig::default().with_eval_oob(true));
        let result = config.survey(&fm, 2, SplitCriterion::Gini).unwrap();
        let total_wins: usize = result.ranked().iter().map(|r| r.wins).sum();
        assert_eq!(total_wins, result.n_split_rounds());
        assert!(result.n_split_rounds() <= 6);
    }
}
