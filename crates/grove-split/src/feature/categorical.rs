use std::collections::HashMap;

use tracing::warn;

use super::{SplitCandidate, is_missing_token};
use crate::allocs::SplitScratch;
use crate::splitter::SplitDescriptor;
use crate::target::Target;

/// Observed-category count at or below which every two-way partition is tried.
pub const MAX_EXHAUSTIVE_CATEGORIES: usize = 10;

/// Append-only bidirectional mapping between category strings and codes.
///
/// Codes are assigned densely in first-seen order starting at zero.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CatMap {
    codes: HashMap<String, usize>,
    labels: Vec<String>,
}

impl CatMap {
    /// Return the code for `label`, assigning the next unused code if unseen.
    pub fn code_or_insert(&mut self, label: &str) -> usize {
        if let Some(&code) = self.codes.get(label) {
            return code;
        }
        let code = self.labels.len();
        self.labels.push(label.to_string());
        self.codes.insert(label.to_string(), code);
        code
    }

    #[must_use]
    pub fn code(&self, label: &str) -> Option<usize> {
        self.codes.get(label).copied()
    }

    #[must_use]
    pub fn label(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    /// Number of distinct categories seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Dense categorical feature: per-case codes into a [`CatMap`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CatFeature {
    pub(crate) name: String,
    pub(crate) map: CatMap,
    pub(crate) codes: Vec<usize>,
    pub(crate) missing: Vec<bool>,
}

impl CatFeature {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            map: CatMap::default(),
            codes: Vec::new(),
            missing: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn map(&self) -> &CatMap {
        &self.map
    }

    #[must_use]
    pub fn n_cases(&self) -> usize {
        self.codes.len()
    }

    /// Return the category code of `case`, or `None` when it is missing.
    #[must_use]
    pub fn code(&self, case: usize) -> Option<usize> {
        (!self.missing[case]).then(|| self.codes[case])
    }

    pub(crate) fn get_string(&self, case: usize) -> String {
        self.code(case)
            .and_then(|code| self.map.label(code))
            .unwrap_or("NA")
            .to_string()
    }

    pub(crate) fn append(&mut self, raw: &str) {
        if is_missing_token(raw) {
            self.codes.push(0);
            self.missing.push(true);
            return;
        }
        let code = self.map.code_or_insert(raw);
        self.codes.push(code);
        self.missing.push(false);
    }

    pub(crate) fn refresh_from(&mut self, src: &CatFeature) {
        self.name.clone_from(&src.name);
        self.map.clone_from(&src.map);
        self.codes.clone_from(&src.codes);
        self.missing.clone_from(&src.missing);
    }

    /// Replace missing cells with the most frequent code (lowest code on ties).
    pub(crate) fn impute_missing(&mut self) -> usize {
        let mut counts = vec![0usize; self.map.len()];
        for (&code, &m) in self.codes.iter().zip(&self.missing) {
            if !m {
                counts[code] += 1;
            }
        }
        let mode = counts
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, usize)>, (code, &c)| match best {
                Some((_, bc)) if bc >= c => best,
                _ if c > 0 => Some((code, c)),
                _ => best,
            });
        let Some((mode, _)) = mode else {
            if !self.missing.is_empty() {
                warn!(feature = %self.name, "no observed categories, leaving missing cells unfilled");
            }
            return 0;
        };
        let mut filled = 0;
        for (code, m) in self.codes.iter_mut().zip(self.missing.iter_mut()) {
            if *m {
                *code = mode;
                *m = false;
                filled += 1;
            }
        }
        filled
    }

    /// Subset search over the categories observed in `cases`.
    ///
    /// Exhaustive for up to [`MAX_EXHAUSTIVE_CATEGORIES`] categories; above
    /// that, categories are ordered by target score and prefixes are swept.
    pub(crate) fn best_split(
        &self,
        target: &Target<'_>,
        cases: &[usize],
        parent_impurity: f64,
        min_leaf_size: usize,
        scratch: &mut SplitScratch,
    ) -> Option<SplitCandidate> {
        let SplitScratch {
            left,
            right,
            absent,
            per_category,
            category_cases,
            observed,
            ..
        } = scratch;

        let n_codes = self.map.len();
        per_category.resize_with(n_codes, Default::default);
        for tally in per_category.iter_mut() {
            target.reset_tally(tally);
        }
        category_cases.clear();
        category_cases.resize(n_codes, 0);
        target.reset_tally(absent);

        for &case in cases {
            match self.code(case) {
                Some(code) => {
                    target.add(&mut per_category[code], case);
                    category_cases[code] += 1;
                }
                None => target.add(absent, case),
            }
        }

        observed.clear();
        observed.extend((0..n_codes).filter(|&code| category_cases[code] > 0));
        let k = observed.len();
        if k < 2 {
            return None;
        }
        let n_present: usize = observed.iter().map(|&code| category_cases[code]).sum();

        let mut best: Option<(f64, Vec<usize>)> = None;

        if k <= MAX_EXHAUSTIVE_CATEGORIES {
            // observed[0] stays left so each partition is visited once; the
            // all-left mask is excluded.
            let n_masks = 1usize << (k - 1);
            for mask in 0..(n_masks - 1) {
                target.reset_tally(left);
                target.reset_tally(right);
                let mut n_left = 0;
                for (j, &code) in observed.iter().enumerate() {
                    let goes_left = j == 0 || (mask >> (j - 1)) & 1 == 1;
                    if goes_left {
                        left.absorb(&per_category[code]);
                        n_left += category_cases[code];
                    } else {
                        right.absorb(&per_category[code]);
                    }
                }
                let n_right = n_present - n_left;
                if n_left < min_leaf_size || n_right < min_leaf_size {
                    continue;
                }
                let decrease =
                    parent_impurity - target.weighted_impurity(&[&*left, &*right, &*absent]);
                if best.as_ref().is_none_or(|(d, _)| decrease > *d) {
                    let codes = observed
                        .iter()
                        .enumerate()
                        .filter(|&(j, _)| j == 0 || (mask >> (j - 1)) & 1 == 1)
                        .map(|(_, &code)| code)
                        .collect();
                    best = Some((decrease, codes));
                }
            }
        } else {
            target.reset_tally(left);
            target.reset_tally(right);
            for &code in observed.iter() {
                right.absorb(&per_category[code]);
            }
            let focus = right.majority_class();
            // Stable sort keeps code order among equal scores.
            observed.sort_by(|&a, &b| {
                per_category[a]
                    .score(focus)
                    .total_cmp(&per_category[b].score(focus))
            });

            let mut n_left = 0;
            for i in 0..(k - 1) {
                let code = observed[i];
                left.absorb(&per_category[code]);
                right.release(&per_category[code]);
                n_left += category_cases[code];
                let n_right = n_present - n_left;
                if n_left < min_leaf_size || n_right < min_leaf_size {
                    continue;
                }
                let decrease =
                    parent_impurity - target.weighted_impurity(&[&*left, &*right, &*absent]);
                if best.as_ref().is_none_or(|(d, _)| decrease > *d) {
                    best = Some((decrease, observed[..=i].to_vec()));
                }
            }
        }

        best.map(|(impurity_decrease, mut left_codes)| {
            left_codes.sort_unstable();
            SplitCandidate {
                descriptor: SplitDescriptor::Categorical { left_codes },
                impurity_decrease,
            }
        })
    }
}
