//! I/O error types for grove-io.

use std::path::PathBuf;

use grove_split::SplitError;

/// Errors from matrix parsing, case writing, and snapshot serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the file extension names a format this crate does not parse.
    #[error("unsupported matrix format \"{extension}\" for {path}")]
    UnsupportedFormat {
        /// Path of the rejected file.
        path: PathBuf,
        /// The offending extension.
        extension: String,
    },

    /// Returned when a zip archive cannot be opened or its entry cannot be read.
    #[error("cannot unpack archive {path}")]
    Archive {
        /// Path to the archive.
        path: PathBuf,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },

    /// Returned when a zip archive holds no entries.
    #[error("archive {path} has no entries")]
    EmptyArchive {
        /// Path to the archive.
        path: PathBuf,
    },

    /// Returned when the tab-separated parser encounters a malformed record.
    #[error("parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the matrix file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the file has no header row.
    #[error("empty matrix file {path}")]
    EmptyMatrix {
        /// Path to the matrix file.
        path: PathBuf,
    },

    /// Returned when a feature row has a different number of values than the header has cases.
    #[error("inconsistent row length in {path}: feature \"{name}\" has {got} values, expected {expected}")]
    InconsistentRowLength {
        /// Path to the matrix file.
        path: PathBuf,
        /// Name of the offending feature.
        name: String,
        /// Number of cases named by the header.
        expected: usize,
        /// Number of values in this row.
        got: usize,
    },

    /// Returned when the parsed columns do not form a valid matrix.
    #[error("invalid matrix in {path}")]
    InvalidMatrix {
        /// Path to the matrix file.
        path: PathBuf,
        /// Underlying construction error.
        source: SplitError,
    },

    /// Returned when an output file cannot be created or written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying error, either I/O or a rejected case selection.
        source: SplitError,
    },

    /// Returned when snapshot encoding fails.
    #[error("failed to serialize matrix snapshot")]
    SerializeSnapshot {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when snapshot decoding fails.
    #[error("failed to deserialize matrix snapshot from {path}")]
    DeserializeSnapshot {
        /// Path to the snapshot file.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when a snapshot file cannot be read or written.
    #[error("snapshot I/O failed for {path}")]
    SnapshotIo {
        /// Path to the snapshot file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a snapshot with an incompatible format version.
    #[error("incompatible snapshot version in {path}: expected {expected}, found {found}")]
    IncompatibleSnapshotVersion {
        /// Path to the snapshot file.
        path: PathBuf,
        /// The version this build writes.
        expected: u32,
        /// The version found in the file.
        found: u32,
    },
}
