//! Column-oriented feature matrix and the per-node best-split search.

use std::collections::HashMap;
use std::io::{self, Write};

use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::allocs::BestSplitAllocs;
use crate::config::SplitterConfig;
use crate::error::SplitError;
use crate::feature::{Feature, SplitCandidate};
use crate::splitter::{SplitDescriptor, Splitter};
use crate::target::{SplitCriterion, Target};

/// Smallest impurity decrease a split must strictly exceed to be accepted.
pub const MIN_IMPURITY_DECREASE: f64 = 1e-12;

/// Result of [`FeatureMatrix::best_splitter`].
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutcome {
    /// The winning split, or `None` when no candidate cleared
    /// [`MIN_IMPURITY_DECREASE`].
    pub splitter: Option<Splitter>,
    /// The winner's (possibly re-scored and vetted) decrease, or exactly
    /// [`MIN_IMPURITY_DECREASE`] when there is no winner.
    pub impurity_decrease: f64,
}

/// Ordered feature columns sharing one set of cases.
///
/// Feature names are unique; `index_of(features[i].name()) == Some(i)`
/// holds for every column.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeatureMatrix {
    features: Vec<Feature>,
    index: HashMap<String, usize>,
    case_labels: Vec<String>,
}

impl FeatureMatrix {
    /// Build a matrix from fully loaded features.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SplitError::CaseCountMismatch`] | a feature's case count differs from `case_labels.len()` |
    /// | [`SplitError::DuplicateFeatureName`] | two features share a name |
    pub fn new(features: Vec<Feature>, case_labels: Vec<String>) -> Result<Self, SplitError> {
        for f in &features {
            if f.n_cases() != case_labels.len() {
                return Err(SplitError::CaseCountMismatch {
                    name: f.name().to_string(),
                    expected: case_labels.len(),
                    got: f.n_cases(),
                });
            }
        }
        let index = build_index(&features)?;
        Ok(Self {
            features,
            index,
            case_labels,
        })
    }

    /// Build a matrix from empty features whose cases arrive later through
    /// [`load_cases`](Self::load_cases).
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new) with no case labels.
    pub fn with_features(features: Vec<Feature>) -> Result<Self, SplitError> {
        Self::new(features, Vec::new())
    }

    // --- Accessors ---

    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Return the feature at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::FeatureIndexOutOfRange`] if `index` is past the end.
    pub fn feature(&self, index: usize) -> Result<&Feature, SplitError> {
        self.features
            .get(index)
            .ok_or(SplitError::FeatureIndexOutOfRange {
                index,
                n_features: self.features.len(),
            })
    }

    #[must_use]
    pub fn feature_by_name(&self, name: &str) -> Option<&Feature> {
        self.index_of(name).map(|i| &self.features[i])
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn case_labels(&self) -> &[String] {
        &self.case_labels
    }

    #[must_use]
    pub fn n_cases(&self) -> usize {
        self.case_labels.len()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Wrap the named feature as a [`Target`].
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::UnknownFeature`] if no feature has that name.
    pub fn target(&self, name: &str, criterion: SplitCriterion) -> Result<Target<'_>, SplitError> {
        let feature = self
            .feature_by_name(name)
            .ok_or_else(|| SplitError::UnknownFeature {
                name: name.to_string(),
            })?;
        Ok(Target::new(feature, criterion))
    }

    // --- Serialization ---

    /// Write the selected cases as tab-separated text, one row per feature.
    ///
    /// The header row is `.` followed by the case labels; each feature row is
    /// the feature name followed by its values. Names are written as they are
    /// stored, so a type prefix survives only if the name carries one.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SplitError::CaseIndexOutOfRange`] | a case is past the end (nothing written) |
    /// | [`SplitError::WriteCases`] | the writer failed; earlier rows stay written |
    pub fn write_cases<W: Write>(&self, writer: &mut W, cases: &[usize]) -> Result<(), SplitError> {
        self.check_cases(cases)?;
        self.write_rows(writer, cases)
            .map_err(|source| SplitError::WriteCases { source })
    }

    fn write_rows<W: Write>(&self, w: &mut W, cases: &[usize]) -> io::Result<()> {
        w.write_all(b".")?;
        for &case in cases {
            write!(w, "\t{}", self.case_labels[case])?;
        }
        w.write_all(b"\n")?;
        for feature in &self.features {
            w.write_all(feature.name().as_bytes())?;
            for &case in cases {
                write!(w, "\t{}", feature.get_string(case))?;
            }
            w.write_all(b"\n")?;
        }
        w.flush()
    }

    /// Append one case per record, values matched to features by position.
    ///
    /// With `has_row_labels` the first field is the case label; otherwise
    /// cases are labelled by their zero-based position. A read error or a
    /// record of the wrong width is logged and ends loading. Returns the
    /// number of cases appended.
    #[instrument(skip_all, fields(n_features = self.features.len(), has_row_labels = has_row_labels))]
    pub fn load_cases<R: io::Read>(&mut self, reader: &mut csv::Reader<R>, has_row_labels: bool) -> usize {
        let expected = self.features.len() + usize::from(has_row_labels);
        let mut loaded = 0;
        for (row, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!(row, error = %e, "unreadable record, stopping case load");
                    break;
                }
            };
            if record.len() != expected {
                warn!(row, expected, got = record.len(), "record width mismatch, stopping case load");
                break;
            }
            let mut fields = record.iter();
            let label = if has_row_labels {
                fields.next().unwrap_or_default().to_string()
            } else {
                self.case_labels.len().to_string()
            };
            for (feature, raw) in self.features.iter_mut().zip(fields) {
                feature.append(raw);
            }
            self.case_labels.push(label);
            loaded += 1;
        }
        debug!(loaded, n_cases = self.case_labels.len(), "cases loaded");
        loaded
    }

    // --- Mutation ---

    /// Append `n` shuffled copies of features drawn uniformly, with
    /// replacement, from the features present before the call.
    #[instrument(skip(self, rng), fields(n_features = self.features.len()))]
    pub fn add_contrasts(&mut self, n: usize, rng: &mut impl Rng) {
        let n_original = self.features.len();
        if n_original == 0 {
            if n > 0 {
                warn!("matrix has no features, no contrasts added");
            }
            return;
        }
        for _ in 0..n {
            let source = rng.gen_range(0..n_original);
            let copy = self.features[source].shuffled_copy(rng);
            self.push_contrast(copy);
        }
        info!(added = n, n_features = self.features.len(), "contrast features added");
    }

    /// Append one shuffled copy of every feature, doubling the width.
    #[instrument(skip_all, fields(n_features = self.features.len()))]
    pub fn contrast_all(&mut self, rng: &mut impl Rng) {
        let n_original = self.features.len();
        for source in 0..n_original {
            let copy = self.features[source].shuffled_copy(rng);
            self.push_contrast(copy);
        }
        info!(n_features = self.features.len(), "contrast copy of every feature added");
    }

    /// Register a contrast, suffixing `:2`, `:3`, ... while its name is taken.
    fn push_contrast(&mut self, mut feature: Feature) {
        if self.index.contains_key(feature.name()) {
            let base = feature.name().to_string();
            let mut k = 2;
            while self.index.contains_key(&format!("{base}:{k}")) {
                k += 1;
            }
            feature.set_name(format!("{base}:{k}"));
        }
        self.index.insert(feature.name().to_string(), self.features.len());
        self.features.push(feature);
    }

    /// Fill missing cells in every feature. Returns the number of cells filled.
    #[instrument(skip_all, fields(n_features = self.features.len()))]
    pub fn impute_missing(&mut self) -> usize {
        let filled: usize = self.features.iter_mut().map(Feature::impute_missing).sum();
        info!(filled, "missing values imputed");
        filled
    }

    // --- Split search ---

    /// Find the candidate feature whose best split of `cases` most reduces
    /// the target's impurity.
    ///
    /// With `eval_oob`, a candidate that could become the new best is
    /// re-scored on `oob`. With `vet`, the decrease the same feature achieves
    /// against a shuffled copy of the target is subtracted; that search runs
    /// over `oob` when `eval_oob` is set, else over `cases`, and is always
    /// measured from the impurity of `cases`. A candidate
    /// replaces the current best only if its final decrease is strictly
    /// larger, so earlier candidates win ties.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SplitError::InvalidMinLeafSize`] | `config.min_leaf_size()` is zero |
    /// | [`SplitError::FeatureIndexOutOfRange`] | a candidate is not a feature index |
    /// | [`SplitError::CaseIndexOutOfRange`] | a case in `cases` or `oob` is past the end |
    /// | [`SplitError::IncompatibleFeature`] | vetting with a bundle shaped for another target kind |
    #[instrument(
        skip_all,
        fields(
            n_cases = cases.len(),
            n_candidates = candidates.len(),
            n_oob = oob.len(),
            vet = config.vet,
            eval_oob = config.eval_oob,
        )
    )]
    pub fn best_splitter(
        &self,
        target: &Target<'_>,
        cases: &[usize],
        candidates: &[usize],
        oob: &[usize],
        config: &SplitterConfig,
        allocs: &mut BestSplitAllocs,
    ) -> Result<SplitOutcome, SplitError> {
        let min_leaf_size = config.min_leaf_size;
        if min_leaf_size == 0 {
            return Err(SplitError::InvalidMinLeafSize { min_leaf_size });
        }
        for &index in candidates {
            self.feature(index)?;
        }
        self.check_cases(cases)?;
        if config.eval_oob || config.vet {
            self.check_cases(oob)?;
        }

        let BestSplitAllocs {
            scratch,
            contrast,
            rng,
        } = allocs;
        if config.vet {
            target.feature().copy_into(contrast)?;
        }

        let parent = target.impurity(cases);
        let oob_parent = if config.eval_oob {
            target.impurity(oob)
        } else {
            0.0
        };
        let vet_cases = if config.eval_oob { oob } else { cases };

        let mut best: Option<(usize, SplitDescriptor)> = None;
        let mut best_decrease = MIN_IMPURITY_DECREASE;

        for &index in candidates {
            let feature = &self.features[index];
            let Some(SplitCandidate {
                descriptor,
                impurity_decrease: mut decrease,
            }) = feature.best_split(target, cases, parent, min_leaf_size, scratch)
            else {
                continue;
            };

            if config.eval_oob && decrease > best_decrease {
                let partition = feature.decode_split(index, &descriptor)?.split(self, oob)?;
                decrease = oob_parent - target.split_impurity(&partition);
            }

            if config.vet && decrease > best_decrease {
                contrast.shuffle_cases(vet_cases, rng);
                let contrast_target = Target::new(&*contrast, target.criterion());
                // Scored against the in-bag parent even when searching `oob`.
                let vet_decrease = feature
                    .best_split(&contrast_target, vet_cases, parent, min_leaf_size, scratch)
                    .map_or(0.0, |c| c.impurity_decrease);
                decrease -= vet_decrease;
            }

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((index, descriptor));
            }
        }

        let Some((index, descriptor)) = best else {
            debug!("no candidate cleared the minimum decrease");
            return Ok(SplitOutcome {
                splitter: None,
                impurity_decrease: MIN_IMPURITY_DECREASE,
            });
        };
        let splitter = self.features[index].decode_split(index, &descriptor)?;
        debug!(feature = splitter.name(), decrease = best_decrease, "best split selected");
        Ok(SplitOutcome {
            splitter: Some(splitter),
            impurity_decrease: best_decrease,
        })
    }

    fn check_cases(&self, cases: &[usize]) -> Result<(), SplitError> {
        let n_cases = self.n_cases();
        match cases.iter().find(|&&c| c >= n_cases) {
            Some(&index) => Err(SplitError::CaseIndexOutOfRange { index, n_cases }),
            None => Ok(()),
        }
    }
}

fn build_index(features: &[Feature]) -> Result<HashMap<String, usize>, SplitError> {
    let mut index = HashMap::with_capacity(features.len());
    for (i, f) in features.iter().enumerate() {
        if let Some(&first) = index.get(f.name()) {
            return Err(SplitError::DuplicateFeatureName {
                name: f.name().to_string(),
                first,
                second: i,
            });
        }
        index.insert(f.name().to_string(), i);
    }
    Ok(index)
}
