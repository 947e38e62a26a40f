use std::fmt;

use crate::error::SplitError;
use crate::feature::{Feature, FeatureKind};
use crate::matrix::FeatureMatrix;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a feature's search decided to cut, in the feature's own terms.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SplitDescriptor {
    /// Cases with `value <= threshold` go left.
    Numeric {
        /// Cut point between two observed values.
        threshold: f64,
    },
    /// Cases whose code is listed go left.
    Categorical {
        /// Sorted category codes sent left.
        left_codes: Vec<usize>,
    },
}

impl SplitDescriptor {
    /// Return the feature kind able to decode this descriptor.
    #[must_use]
    pub fn kind(&self) -> FeatureKind {
        match self {
            SplitDescriptor::Numeric { .. } => FeatureKind::Numeric,
            SplitDescriptor::Categorical { .. } => FeatureKind::Categorical,
        }
    }
}

/// The routing rule of a decoded [`Splitter`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SplitRule {
    /// Left when `value <= threshold`.
    Threshold(f64),
    /// Left when the case's category is in the set.
    Categories {
        /// Sorted category codes sent left.
        left_codes: Vec<usize>,
        /// Category strings for `left_codes`, same order.
        left_labels: Vec<String>,
    },
}

/// Cases divided by a [`Splitter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Cases routed left.
    pub left: Vec<usize>,
    /// Cases routed right.
    pub right: Vec<usize>,
    /// Cases missing a value on the split feature.
    pub missing: Vec<usize>,
}

/// A case-partitioning rule on one feature of a matrix.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Splitter {
    feature: FeatureIndex,
    name: String,
    rule: SplitRule,
}

impl Splitter {
    pub(crate) fn threshold(index: usize, name: String, threshold: f64) -> Self {
        Self {
            feature: FeatureIndex::new(index),
            name,
            rule: SplitRule::Threshold(threshold),
        }
    }

    pub(crate) fn categories(
        index: usize,
        name: String,
        left_codes: Vec<usize>,
        left_labels: Vec<String>,
    ) -> Self {
        Self {
            feature: FeatureIndex::new(index),
            name,
            rule: SplitRule::Categories {
                left_codes,
                left_labels,
            },
        }
    }

    /// Return the index of the split feature.
    #[must_use]
    pub fn feature(&self) -> FeatureIndex {
        self.feature
    }

    /// Return the name of the split feature.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn rule(&self) -> &SplitRule {
        &self.rule
    }

    /// Route `cases` through this rule using the matrix's split feature.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SplitError::FeatureIndexOutOfRange`] | the feature index is not in `matrix` |
    /// | [`SplitError::IncompatibleFeature`] | the feature's kind does not fit the rule |
    pub fn split(&self, matrix: &FeatureMatrix, cases: &[usize]) -> Result<Partition, SplitError> {
        let feature = matrix.feature(self.feature.index())?;
        let mut partition = Partition::default();
        match (&self.rule, feature) {
            (SplitRule::Threshold(threshold), Feature::Numeric(f)) => {
                for &case in cases {
                    match f.value(case) {
                        Some(v) if v <= *threshold => partition.left.push(case),
                        Some(_) => partition.right.push(case),
                        None => partition.missing.push(case),
                    }
                }
            }
            (SplitRule::Categories { left_codes, .. }, Feature::Categorical(f)) => {
                for &case in cases {
                    match f.code(case) {
                        Some(code) if left_codes.binary_search(&code).is_ok() => {
                            partition.left.push(case);
                        }
                        Some(_) => partition.right.push(case),
                        None => partition.missing.push(case),
                    }
                }
            }
            (rule, feature) => {
                let expected = match rule {
                    SplitRule::Threshold(_) => FeatureKind::Numeric,
                    SplitRule::Categories { .. } => FeatureKind::Categorical,
                };
                return Err(SplitError::IncompatibleFeature {
                    name: feature.name().to_string(),
                    expected,
                    found: feature.kind(),
                });
            }
        }
        Ok(partition)
    }
}

impl fmt::Display for Splitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            SplitRule::Threshold(t) => write!(f, "{} <= {t}", self.name),
            SplitRule::Categories { left_labels, .. } => {
                write!(f, "{} in {{{}}}", self.name, left_labels.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> FeatureMatrix {
        let mut x = Feature::numeric("N:x");
        let mut c = Feature::categorical("C:c");
        for (xv, cv) in [("1", "a"), ("5", "b"), ("NA", "a"), ("9", "NA")] {
            x.append(xv);
            c.append(cv);
        }
        let labels = (0..4).map(|i| i.to_string()).collect();
        FeatureMatrix::new(vec![x, c], labels).unwrap()
    }

    #[test]
    fn feature_index_roundtrip() {
        let fi = FeatureIndex::new(7);
        assert_eq!(fi.index(), 7);
        assert_eq!(format!("{fi}"), "7");
    }

    #[test]
    fn threshold_routes_missing_separately() {
        let fm = matrix();
        let s = Splitter::threshold(0, "N:x".into(), 5.0);
        let p = s.split(&fm, &[0, 1, 2, 3]).unwrap();
        assert_eq!(p.left, vec![0, 1]);
        assert_eq!(p.right, vec![3]);
        assert_eq!(p.missing, vec![2]);
    }

    #[test]
    fn categories_route_by_code() {
        let fm = matrix();
        let s = Splitter::categories(1, "C:c".into(), vec![1], vec!["b".into()]);
        let p = s.split(&fm, &[0, 1, 2, 3]).unwrap();
        assert_eq!(p.left, vec![1]);
        assert_eq!(p.right, vec![0, 2]);
        assert_eq!(p.missing, vec![3]);
        assert_eq!(s.to_string(), "C:c in {b}");
    }

    #[test]
    fn rule_kind_mismatch_is_an_error() {
        let fm = matrix();
        let s = Splitter::threshold(1, "C:c".into(), 0.5);
        assert!(matches!(
            s.split(&fm, &[0]),
            Err(SplitError::IncompatibleFeature { .. })
        ));
    }

    #[test]
    fn descriptor_kind() {
        assert_eq!(
            SplitDescriptor::Numeric { threshold: 1.0 }.kind(),
            FeatureKind::Numeric
        );
        assert_eq!(
            SplitDescriptor::Categorical { left_codes: vec![] }.kind(),
            FeatureKind::Categorical
        );
    }
}
