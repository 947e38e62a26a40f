use crate::feature::FeatureKind;

/// Errors from split search, matrix construction and case serialization.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    /// Returned when min_leaf_size is zero.
    #[error("min_leaf_size must be at least 1, got {min_leaf_size}")]
    InvalidMinLeafSize {
        /// The invalid min_leaf_size value provided.
        min_leaf_size: usize,
    },

    /// Returned when the survey round count is zero.
    #[error("n_rounds must be at least 1, got {n_rounds}")]
    InvalidRoundCount {
        /// The invalid n_rounds value provided.
        n_rounds: usize,
    },

    /// Returned when bootstrap_fraction is not in (0.0, 1.0].
    #[error("bootstrap_fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidBootstrapFraction {
        /// The invalid bootstrap_fraction value provided.
        fraction: f64,
    },

    /// Returned when candidates_per_round is zero.
    #[error("candidates_per_round must be at least 1 when set, got {candidates}")]
    InvalidCandidateCount {
        /// The invalid candidate count.
        candidates: usize,
    },

    /// Returned when a survey runs on a matrix with no cases.
    #[error("feature matrix has no cases")]
    EmptyDataset,

    /// Returned when a candidate feature index does not exist in the matrix.
    #[error("feature index {index} out of range for matrix with {n_features} features")]
    FeatureIndexOutOfRange {
        /// The offending feature index.
        index: usize,
        /// Number of features in the matrix.
        n_features: usize,
    },

    /// Returned when a case index exceeds the matrix case count.
    #[error("case index {index} out of range for matrix with {n_cases} cases")]
    CaseIndexOutOfRange {
        /// The offending case index.
        index: usize,
        /// Number of cases in the matrix.
        n_cases: usize,
    },

    /// Returned when two features of different kinds meet where one kind is required.
    #[error("feature \"{name}\" is {found}, expected {expected}")]
    IncompatibleFeature {
        /// Name of the feature with the wrong kind.
        name: String,
        /// The kind required by the operation.
        expected: FeatureKind,
        /// The kind actually found.
        found: FeatureKind,
    },

    /// Returned when a feature's case count disagrees with the case labels.
    #[error("feature \"{name}\" has {got} cases, expected {expected}")]
    CaseCountMismatch {
        /// Name of the offending feature.
        name: String,
        /// The expected case count (number of case labels).
        expected: usize,
        /// The feature's actual case count.
        got: usize,
    },

    /// Returned when two features share a name at construction time.
    #[error("duplicate feature name \"{name}\" at positions {first} and {second}")]
    DuplicateFeatureName {
        /// The duplicated name.
        name: String,
        /// Position of the first occurrence.
        first: usize,
        /// Position of the second occurrence.
        second: usize,
    },

    /// Returned when the named feature is absent from the matrix.
    #[error("no feature named \"{name}\"")]
    UnknownFeature {
        /// The requested name.
        name: String,
    },

    /// Returned when writing a case subset fails part way.
    #[error("failed to write cases")]
    WriteCases {
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
