//! Per-worker scratch state reused across best-split searches.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::feature::Feature;
use crate::target::{Tally, Target};

/// Buffers used by a single feature's split search.
///
/// Contents are meaningless between calls; every search resets what it uses.
#[derive(Debug, Default)]
pub struct SplitScratch {
    pub(crate) order: Vec<(f64, usize)>,
    pub(crate) missing: Vec<usize>,
    pub(crate) left: Tally,
    pub(crate) right: Tally,
    pub(crate) absent: Tally,
    pub(crate) per_category: Vec<Tally>,
    pub(crate) category_cases: Vec<usize>,
    pub(crate) observed: Vec<usize>,
}

/// Reusable state for one stream of [`FeatureMatrix::best_splitter`] calls.
///
/// Holds the split-search buffers, a private contrast-target buffer that
/// vetting shuffles in place, and the stream's own random generator.
/// Not `Clone`; each worker owns one and lends it by `&mut`.
///
/// [`FeatureMatrix::best_splitter`]: crate::FeatureMatrix::best_splitter
#[derive(Debug)]
pub struct BestSplitAllocs {
    pub(crate) scratch: SplitScratch,
    pub(crate) contrast: Feature,
    pub(crate) rng: ChaCha8Rng,
}

impl BestSplitAllocs {
    /// Create a bundle shaped for `target`, seeding its generator with `seed`.
    #[must_use]
    pub fn new(target: &Target<'_>, seed: u64) -> Self {
        Self {
            scratch: SplitScratch::default(),
            contrast: target.feature().clone(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Return the contrast-target buffer.
    #[must_use]
    pub fn contrast(&self) -> &Feature {
        &self.contrast
    }

    /// Mutable access to the split-search buffers, for calling
    /// [`Feature::best_split`] directly.
    pub fn scratch_mut(&mut self) -> &mut SplitScratch {
        &mut self.scratch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::SplitCriterion;

    #[test]
    fn contrast_buffer_matches_target_shape() {
        let mut y = Feature::categorical("C:y");
        for v in ["a", "b", "a"] {
            y.append(v);
        }
        let target = Target::new(&y, SplitCriterion::Gini);
        let allocs = BestSplitAllocs::new(&target, 1);
        assert_eq!(allocs.contrast().kind(), y.kind());
        assert_eq!(allocs.contrast().n_cases(), 3);
    }
}
