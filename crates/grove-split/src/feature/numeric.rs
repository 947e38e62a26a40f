use tracing::warn;

use super::{SplitCandidate, is_missing_token};
use crate::allocs::SplitScratch;
use crate::splitter::SplitDescriptor;
use crate::target::Target;

/// Dense real-valued feature with a missing mask.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NumFeature {
    pub(crate) name: String,
    pub(crate) values: Vec<f64>,
    pub(crate) missing: Vec<bool>,
}

impl NumFeature {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            values: Vec::new(),
            missing: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn n_cases(&self) -> usize {
        self.values.len()
    }

    /// Return the value of `case`, or `None` when it is missing.
    #[must_use]
    pub fn value(&self, case: usize) -> Option<f64> {
        (!self.missing[case]).then(|| self.values[case])
    }

    pub(crate) fn get_string(&self, case: usize) -> String {
        match self.value(case) {
            Some(v) => v.to_string(),
            None => "NA".to_string(),
        }
    }

    pub(crate) fn append(&mut self, raw: &str) {
        if is_missing_token(raw) {
            self.push_missing();
            return;
        }
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => {
                self.values.push(v);
                self.missing.push(false);
            }
            _ => {
                warn!(feature = %self.name, raw, "unparseable numeric value, treating as missing");
                self.push_missing();
            }
        }
    }

    fn push_missing(&mut self) {
        self.values.push(0.0);
        self.missing.push(true);
    }

    pub(crate) fn refresh_from(&mut self, src: &NumFeature) {
        self.name.clone_from(&src.name);
        self.values.clone_from(&src.values);
        self.missing.clone_from(&src.missing);
    }

    /// Replace missing cells with the mean of the observed values.
    pub(crate) fn impute_missing(&mut self) -> usize {
        let (sum, n) = self
            .values
            .iter()
            .zip(&self.missing)
            .filter(|&(_, &m)| !m)
            .fold((0.0f64, 0usize), |(s, n), (&v, _)| (s + v, n + 1));
        if n == 0 {
            if !self.missing.is_empty() {
                warn!(feature = %self.name, "no observed values, leaving missing cells unfilled");
            }
            return 0;
        }
        let mean = sum / n as f64;
        let mut filled = 0;
        for (v, m) in self.values.iter_mut().zip(self.missing.iter_mut()) {
            if *m {
                *v = mean;
                *m = false;
                filled += 1;
            }
        }
        filled
    }

    /// Sort-and-sweep search over thresholds between distinct adjacent values.
    pub(crate) fn best_split(
        &self,
        target: &Target<'_>,
        cases: &[usize],
        parent_impurity: f64,
        min_leaf_size: usize,
        scratch: &mut SplitScratch,
    ) -> Option<SplitCandidate> {
        let SplitScratch {
            order,
            missing,
            left,
            right,
            absent,
            ..
        } = scratch;

        order.clear();
        missing.clear();
        for &case in cases {
            match self.value(case) {
                Some(v) => order.push((v, case)),
                None => missing.push(case),
            }
        }
        let n = order.len();
        if n < 2 {
            return None;
        }
        order.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        target.reset_tally(left);
        target.reset_tally(right);
        target.reset_tally(absent);
        for &case in missing.iter() {
            target.add(absent, case);
        }
        for &(_, case) in order.iter() {
            target.add(right, case);
        }

        let mut best: Option<(f64, f64)> = None;
        for i in 0..(n - 1) {
            let (value, case) = order[i];
            target.remove(right, case);
            target.add(left, case);

            let next = order[i + 1].0;
            if value == next {
                continue;
            }
            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_leaf_size || n_right < min_leaf_size {
                continue;
            }

            let decrease = parent_impurity - target.weighted_impurity(&[&*left, &*right, &*absent]);
            if best.is_none_or(|(d, _)| decrease > d) {
                best = Some((decrease, midpoint(value, next)));
            }
        }

        best.map(|(impurity_decrease, threshold)| SplitCandidate {
            descriptor: SplitDescriptor::Numeric { threshold },
            impurity_decrease,
        })
    }
}

/// Threshold between two distinct sorted values; always `>= lo` and `< hi`.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid < hi { mid } else { lo }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;
    use crate::target::SplitCriterion;

    fn column(name: &str, raw: &[&str]) -> Feature {
        let mut f = Feature::numeric(name);
        for v in raw {
            f.append(v);
        }
        f
    }

    fn threshold_of(candidate: &SplitCandidate) -> f64 {
        match candidate.descriptor {
            SplitDescriptor::Numeric { threshold } => threshold,
            SplitDescriptor::Categorical { .. } => panic!("expected numeric descriptor"),
        }
    }

    #[test]
    fn append_parses_values_and_missing() {
        let f = column("N:x", &["1.5", "NA", "abc", "-2", "inf"]);
        let Feature::Numeric(f) = f else { unreachable!() };
        assert_eq!(f.value(0), Some(1.5));
        assert_eq!(f.value(1), None);
        assert_eq!(f.value(2), None);
        assert_eq!(f.value(3), Some(-2.0));
        assert_eq!(f.value(4), None);
    }

    #[test]
    fn get_string_formats_shortest_form() {
        let f = column("N:x", &["20", "2.50", "NA"]);
        assert_eq!(f.get_string(0), "20");
        assert_eq!(f.get_string(1), "2.5");
        assert_eq!(f.get_string(2), "NA");
    }

    #[test]
    fn separable_data_finds_correct_split() {
        let x = column("N:x", &["1", "2", "3", "10", "11", "12"]);
        let mut y = Feature::categorical("C:y");
        for v in ["0", "0", "0", "1", "1", "1"] {
            y.append(v);
        }
        let target = Target::new(&y, SplitCriterion::Gini);
        let cases: Vec<usize> = (0..6).collect();
        let mut scratch = SplitScratch::default();

        let split = x
            .best_split(&target, &cases, target.impurity(&cases), 1, &mut scratch)
            .expect("should find a split");
        let t = threshold_of(&split);
        assert!(t > 3.0 && t < 10.0);
        assert!((split.impurity_decrease - 0.5).abs() < 1e-12);
    }

    #[test]
    fn constant_feature_returns_none() {
        let x = column("N:x", &["5", "5", "5", "5"]);
        let y = column("N:y", &["0", "0", "1", "1"]);
        let target = Target::new(&y, SplitCriterion::Gini);
        let cases: Vec<usize> = (0..4).collect();
        let mut scratch = SplitScratch::default();
        assert!(x.best_split(&target, &cases, 0.25, 1, &mut scratch).is_none());
    }

    #[test]
    fn min_leaf_size_enforced() {
        let x = column("N:x", &["1", "10"]);
        let y = column("N:y", &["0", "1"]);
        let target = Target::new(&y, SplitCriterion::Gini);
        let mut scratch = SplitScratch::default();
        assert!(x.best_split(&target, &[0, 1], 0.25, 2, &mut scratch).is_none());
    }

    #[test]
    fn regression_target_uses_variance() {
        let x = column("N:x", &["1", "2", "3", "4"]);
        let y = column("N:y", &["0", "0", "10", "10"]);
        let target = Target::new(&y, SplitCriterion::Gini);
        let cases: Vec<usize> = (0..4).collect();
        let mut scratch = SplitScratch::default();
        let parent = target.impurity(&cases);
        assert!((parent - 25.0).abs() < 1e-9);

        let split = x.best_split(&target, &cases, parent, 1, &mut scratch).unwrap();
        assert!((threshold_of(&split) - 2.5).abs() < 1e-12);
        assert!((split.impurity_decrease - 25.0).abs() < 1e-9);
    }

    #[test]
    fn missing_cases_form_their_own_group() {
        // Case 4 is missing on x; its label stays in the weighted impurity.
        let x = column("N:x", &["1", "2", "3", "4", "NA"]);
        let mut y = Feature::categorical("C:y");
        for v in ["a", "a", "b", "b", "a"] {
            y.append(v);
        }
        let target = Target::new(&y, SplitCriterion::Gini);
        let cases: Vec<usize> = (0..5).collect();
        let parent = target.impurity(&cases);
        let mut scratch = SplitScratch::default();

        let split = x.best_split(&target, &cases, parent, 1, &mut scratch).unwrap();
        // All three groups pure: decrease equals the parent impurity.
        assert!((split.impurity_decrease - parent).abs() < 1e-12);
        assert!((threshold_of(&split) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn impute_fills_mean_and_clears_flags() {
        let mut f = column("N:x", &["1", "NA", "3", "NA"]);
        assert_eq!(f.impute_missing(), 2);
        assert_eq!(f.n_missing(), 0);
        assert_eq!(f.get_string(1), "2");
        assert_eq!(f.get_string(0), "1");
    }

    #[test]
    fn impute_all_missing_is_a_no_op() {
        let mut f = column("N:x", &["NA", "NA"]);
        assert_eq!(f.impute_missing(), 0);
        assert_eq!(f.n_missing(), 2);
    }

    #[test]
    fn midpoint_stays_below_upper_value() {
        let lo: f64 = 1.0;
        let hi = f64::from_bits(lo.to_bits() + 1);
        assert_eq!(midpoint(lo, hi), lo);
        assert_eq!(midpoint(2.0, 4.0), 3.0);
    }
}
