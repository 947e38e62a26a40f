//! Ranking features by the impurity decrease credited to them.

use crate::feature::CONTRAST_SUFFIX;

/// A ranked feature with name, importance score, and rank.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Normalized importance score (sums to 1.0 when any decrease was credited).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
    /// Whether the feature is a shuffled contrast copy.
    pub is_contrast: bool,
    /// Number of rounds this feature won.
    pub wins: usize,
}

/// Whether `name` belongs to a contrast produced by shuffling.
#[must_use]
pub fn is_contrast_name(name: &str) -> bool {
    name.contains(CONTRAST_SUFFIX)
}

/// Credit each round's winning decrease to its feature and rank the totals.
///
/// `winners` holds `(feature_index, decrease)` for rounds that split. Only
/// features listed in `ranked_indices` are reported; ties keep their
/// listed order.
pub(crate) fn aggregate_wins(
    winners: &[(usize, f64)],
    names: &[String],
    ranked_indices: &[usize],
) -> Vec<RankedFeature> {
    let mut totals = vec![0.0f64; names.len()];
    let mut wins = vec![0usize; names.len()];
    for &(index, decrease) in winners {
        totals[index] += decrease;
        wins[index] += 1;
    }

    let sum: f64 = ranked_indices.iter().map(|&i| totals[i]).sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }

    let mut features: Vec<RankedFeature> = ranked_indices
        .iter()
        .map(|&i| RankedFeature {
            name: names[i].clone(),
            importance: totals[i],
            rank: 0,
            is_contrast: is_contrast_name(&names[i]),
            wins: wins[i],
        })
        .collect();

    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feat) in features.iter_mut().enumerate() {
        feat.rank = i + 1;
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        ["N:a", "N:b", "C:y", "N:a:SHUFFLED"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn totals_are_normalized_and_ranked() {
        let winners = [(0, 0.3), (1, 0.1), (0, 0.3), (3, 0.1)];
        let ranked = aggregate_wins(&winners, &names(), &[0, 1, 3]);

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].name, "N:a");
        assert_eq!(ranked[0].wins, 2);
        assert_eq!(ranked[0].rank, 1);
        assert!((ranked[0].importance - 0.75).abs() < 1e-12);
        let sum: f64 = ranked.iter().map(|r| r.importance).sum();
        assert!((sum - 1.0).abs() < 1e-12);
        // Equal scores keep index order.
        assert_eq!(ranked[1].name, "N:b");
        assert!(ranked[2].is_contrast);
    }

    #[test]
    fn no_winners_gives_zero_importances() {
        let ranked = aggregate_wins(&[], &names(), &[0, 1]);
        assert!(ranked.iter().all(|r| r.importance == 0.0 && r.wins == 0));
        assert_eq!(ranked[0].name, "N:a");
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn contrast_names() {
        assert!(is_contrast_name("N:x:SHUFFLED"));
        assert!(is_contrast_name("N:x:SHUFFLED:3"));
        assert!(!is_contrast_name("N:x"));
    }
}
