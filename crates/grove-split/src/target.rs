//! Prediction targets and impurity bookkeeping.

use crate::feature::Feature;
use crate::splitter::Partition;

/// Criterion for measuring the impurity of a categorical target.
///
/// Numeric targets always use variance; the criterion is ignored for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    #[default]
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// Returns `0.0` when `n_samples` is zero (pure node).
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> f64 {
        if n_samples == 0 {
            return 0.0;
        }
        let n = n_samples as f64;
        match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => {
                -class_counts
                    .iter()
                    .filter(|&&c| c > 0)
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p.ln()
                    })
                    .sum::<f64>()
            }
        }
    }
}

/// Running target statistics for one group of cases.
///
/// Class counts for categorical targets, first and second moments for
/// numeric ones. Cases whose target value is missing are never added.
#[derive(Debug, Clone)]
pub(crate) enum Tally {
    Classes { counts: Vec<usize>, n: usize },
    Moments { n: usize, sum: f64, sum_sq: f64 },
}

impl Default for Tally {
    fn default() -> Self {
        Tally::Moments {
            n: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }
}

impl Tally {
    pub(crate) fn n(&self) -> usize {
        match self {
            Tally::Classes { n, .. } | Tally::Moments { n, .. } => *n,
        }
    }

    /// Add every statistic of `other` into `self`. Shapes must match.
    pub(crate) fn absorb(&mut self, other: &Tally) {
        match (self, other) {
            (Tally::Classes { counts, n }, Tally::Classes { counts: o, n: on }) => {
                for (c, oc) in counts.iter_mut().zip(o) {
                    *c += oc;
                }
                *n += on;
            }
            (
                Tally::Moments { n, sum, sum_sq },
                Tally::Moments {
                    n: on,
                    sum: os,
                    sum_sq: osq,
                },
            ) => {
                *n += on;
                *sum += os;
                *sum_sq += osq;
            }
            _ => debug_assert!(false, "tally shapes differ"),
        }
    }

    /// Subtract every statistic of `other` from `self`. Shapes must match.
    pub(crate) fn release(&mut self, other: &Tally) {
        match (self, other) {
            (Tally::Classes { counts, n }, Tally::Classes { counts: o, n: on }) => {
                for (c, oc) in counts.iter_mut().zip(o) {
                    *c -= oc;
                }
                *n -= on;
            }
            (
                Tally::Moments { n, sum, sum_sq },
                Tally::Moments {
                    n: on,
                    sum: os,
                    sum_sq: osq,
                },
            ) => {
                *n -= on;
                *sum -= os;
                *sum_sq -= osq;
            }
            _ => debug_assert!(false, "tally shapes differ"),
        }
    }

    pub(crate) fn impurity(&self, criterion: SplitCriterion) -> f64 {
        match self {
            Tally::Classes { counts, n } => criterion.impurity(counts, *n),
            Tally::Moments { n, sum, sum_sq } => {
                if *n == 0 {
                    return 0.0;
                }
                let n = *n as f64;
                let mean = sum / n;
                // Cancellation can leave a tiny negative residue.
                (sum_sq / n - mean * mean).max(0.0)
            }
        }
    }

    /// Ordering key used by the categorical prefix sweep: the shifted mean for
    /// numeric targets, the share of `focus_class` for categorical ones.
    pub(crate) fn score(&self, focus_class: usize) -> f64 {
        match self {
            Tally::Classes { counts, n } => {
                if *n == 0 {
                    0.0
                } else {
                    counts.get(focus_class).copied().unwrap_or(0) as f64 / *n as f64
                }
            }
            Tally::Moments { n, sum, .. } => {
                if *n == 0 {
                    0.0
                } else {
                    sum / *n as f64
                }
            }
        }
    }

    /// The most frequent class (lowest code on ties); zero for moments.
    pub(crate) fn majority_class(&self) -> usize {
        match self {
            Tally::Classes { counts, .. } => counts
                .iter()
                .enumerate()
                .fold((0usize, 0usize), |best, (code, &c)| {
                    if c > best.1 { (code, c) } else { best }
                })
                .0,
            Tally::Moments { .. } => 0,
        }
    }
}

/// A feature used as the prediction objective.
///
/// Numeric values are accumulated relative to `origin`, the first observed
/// value, so variance stays exact for targets far from zero.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    feature: &'a Feature,
    criterion: SplitCriterion,
    origin: f64,
}

impl<'a> Target<'a> {
    /// Wrap a feature as a target with the given categorical criterion.
    #[must_use]
    pub fn new(feature: &'a Feature, criterion: SplitCriterion) -> Self {
        let origin = match feature {
            Feature::Numeric(f) => (0..f.n_cases()).find_map(|c| f.value(c)).unwrap_or(0.0),
            Feature::Categorical(_) => 0.0,
        };
        Self {
            feature,
            criterion,
            origin,
        }
    }

    /// Return the underlying feature.
    #[must_use]
    pub fn feature(&self) -> &'a Feature {
        self.feature
    }

    /// Return the categorical criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Impurity of the target over `cases`, ignoring cases whose target is missing.
    #[must_use]
    pub fn impurity(&self, cases: &[usize]) -> f64 {
        let mut tally = self.empty_tally();
        for &case in cases {
            self.add(&mut tally, case);
        }
        tally.impurity(self.criterion)
    }

    /// Weighted impurity of the three groups of a partition.
    ///
    /// Each group's impurity is weighted by its number of cases with an
    /// observed target value.
    #[must_use]
    pub fn split_impurity(&self, partition: &Partition) -> f64 {
        let mut groups = [self.empty_tally(), self.empty_tally(), self.empty_tally()];
        for (tally, cases) in groups
            .iter_mut()
            .zip([&partition.left, &partition.right, &partition.missing])
        {
            for &case in cases {
                self.add(tally, case);
            }
        }
        let [left, right, missing] = &groups;
        self.weighted_impurity(&[left, right, missing])
    }

    pub(crate) fn weighted_impurity(&self, groups: &[&Tally]) -> f64 {
        let total: usize = groups.iter().map(|g| g.n()).sum();
        if total == 0 {
            return 0.0;
        }
        groups
            .iter()
            .map(|g| g.n() as f64 * g.impurity(self.criterion))
            .sum::<f64>()
            / total as f64
    }

    pub(crate) fn empty_tally(&self) -> Tally {
        match self.feature {
            Feature::Numeric(_) => Tally::default(),
            Feature::Categorical(f) => Tally::Classes {
                counts: vec![0; f.map().len()],
                n: 0,
            },
        }
    }

    /// Zero `tally` in place, reshaping it only when it does not fit this target.
    pub(crate) fn reset_tally(&self, tally: &mut Tally) {
        match (self.feature, tally) {
            (Feature::Numeric(_), Tally::Moments { n, sum, sum_sq }) => {
                *n = 0;
                *sum = 0.0;
                *sum_sq = 0.0;
            }
            (Feature::Categorical(f), Tally::Classes { counts, n }) => {
                counts.clear();
                counts.resize(f.map().len(), 0);
                *n = 0;
            }
            (_, tally) => *tally = self.empty_tally(),
        }
    }

    pub(crate) fn add(&self, tally: &mut Tally, case: usize) {
        match (self.feature, tally) {
            (Feature::Numeric(f), Tally::Moments { n, sum, sum_sq }) => {
                if let Some(v) = f.value(case) {
                    let d = v - self.origin;
                    *n += 1;
                    *sum += d;
                    *sum_sq += d * d;
                }
            }
            (Feature::Categorical(f), Tally::Classes { counts, n }) => {
                if let Some(code) = f.code(case) {
                    counts[code] += 1;
                    *n += 1;
                }
            }
            _ => debug_assert!(false, "tally shape does not match target"),
        }
    }

    pub(crate) fn remove(&self, tally: &mut Tally, case: usize) {
        match (self.feature, tally) {
            (Feature::Numeric(f), Tally::Moments { n, sum, sum_sq }) => {
                if let Some(v) = f.value(case) {
                    let d = v - self.origin;
                    *n -= 1;
                    *sum -= d;
                    *sum_sq -= d * d;
                }
            }
            (Feature::Categorical(f), Tally::Classes { counts, n }) => {
                if let Some(code) = f.code(case) {
                    counts[code] -= 1;
                    *n -= 1;
                }
            }
            _ => debug_assert!(false, "tally shape does not match target"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;

    fn categorical(name: &str, raw: &[&str]) -> Feature {
        let mut f = Feature::categorical(name);
        for v in raw {
            f.append(v);
        }
        f
    }

    fn numeric(name: &str, raw: &[&str]) -> Feature {
        let mut f = Feature::numeric(name);
        for v in raw {
            f.append(v);
        }
        f
    }

    #[test]
    fn gini_pure() {
        let imp = SplitCriterion::Gini.impurity(&[10, 0, 0], 10);
        assert!(imp.abs() < f64::EPSILON);
    }

    #[test]
    fn gini_binary_balanced() {
        let imp = SplitCriterion::Gini.impurity(&[5, 5], 10);
        assert!((imp - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn entropy_binary_balanced() {
        let imp = SplitCriterion::Entropy.impurity(&[5, 5], 10);
        assert!((imp - 2.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn categorical_target_impurity_is_gini() {
        let label = categorical("C:label", &["0", "0", "1"]);
        let target = Target::new(&label, SplitCriterion::Gini);
        assert!((target.impurity(&[0, 1, 2]) - 4.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn numeric_target_impurity_is_variance() {
        let y = numeric("N:y", &["1", "2", "3", "4"]);
        let target = Target::new(&y, SplitCriterion::Gini);
        assert!((target.impurity(&[0, 1, 2, 3]) - 1.25).abs() < 1e-12);
    }

    #[test]
    fn variance_survives_a_large_offset() {
        let y = numeric("N:y", &["1000000000", "1000000001", "1000000002", "1000000003"]);
        let target = Target::new(&y, SplitCriterion::Gini);
        assert!((target.impurity(&[0, 1, 2, 3]) - 1.25).abs() < 1e-12);

        let y = numeric("N:y", &["NA", "100000002", "100000000", "100000001", "100000003"]);
        let target = Target::new(&y, SplitCriterion::Gini);
        assert!((target.impurity(&[0, 1, 2, 3, 4]) - 1.25).abs() < 1e-12);
        assert!((target.impurity(&[1, 2]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn missing_target_cases_are_ignored() {
        let y = numeric("N:y", &["1", "NA", "3"]);
        let target = Target::new(&y, SplitCriterion::Gini);
        assert!((target.impurity(&[0, 1, 2]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn split_impurity_weights_groups_by_size() {
        let label = categorical("C:label", &["a", "a", "b", "b"]);
        let target = Target::new(&label, SplitCriterion::Gini);
        let pure = Partition {
            left: vec![0, 1],
            right: vec![2, 3],
            missing: vec![],
        };
        assert!(target.split_impurity(&pure).abs() < 1e-12);

        let mixed = Partition {
            left: vec![0, 2],
            right: vec![1],
            missing: vec![3],
        };
        // (2 * 0.5 + 1 * 0 + 1 * 0) / 4
        assert!((target.split_impurity(&mixed) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn tally_absorb_and_release_are_inverse() {
        let label = categorical("C:label", &["a", "b", "b", "c"]);
        let target = Target::new(&label, SplitCriterion::Gini);
        let mut whole = target.empty_tally();
        let mut part = target.empty_tally();
        for case in 0..4 {
            target.add(&mut whole, case);
        }
        target.add(&mut part, 1);
        whole.release(&part);
        whole.absorb(&part);
        assert_eq!(whole.n(), 4);
        assert_eq!(whole.majority_class(), 1);
    }
}
