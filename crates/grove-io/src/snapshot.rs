//! Binary matrix snapshots via bincode.

use std::path::Path;

use grove_split::FeatureMatrix;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for a serialized matrix.
#[derive(serde::Serialize, serde::Deserialize)]
struct SnapshotEnvelope {
    format_version: u32,
    n_features: usize,
    n_cases: usize,
    matrix: FeatureMatrix,
}

/// Saves and restores a parsed [`FeatureMatrix`] without re-parsing text.
pub struct MatrixSnapshot;

impl MatrixSnapshot {
    /// Save `matrix` to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeSnapshot`] | bincode encoding failed |
    /// | [`IoError::SnapshotIo`] | file write failed |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(matrix: &FeatureMatrix, path: impl AsRef<Path>) -> Result<(), IoError> {
        let path = path.as_ref();
        let envelope = SnapshotEnvelope {
            format_version: FORMAT_VERSION,
            n_features: matrix.n_features(),
            n_cases: matrix.n_cases(),
            matrix: matrix.clone(),
        };
        let bytes = bincode::serialize(&envelope)
            .map_err(|e| IoError::SerializeSnapshot { source: e })?;
        std::fs::write(path, &bytes).map_err(|e| IoError::SnapshotIo {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!(size_bytes = bytes.len(), "matrix snapshot saved");
        Ok(())
    }

    /// Load a matrix from a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SnapshotIo`] | file read failed |
    /// | [`IoError::DeserializeSnapshot`] | bincode decoding failed |
    /// | [`IoError::IncompatibleSnapshotVersion`] | format version mismatch |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<FeatureMatrix, IoError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| IoError::SnapshotIo {
            path: path.to_path_buf(),
            source: e,
        })?;
        let envelope: SnapshotEnvelope =
            bincode::deserialize(&bytes).map_err(|e| IoError::DeserializeSnapshot {
                path: path.to_path_buf(),
                source: e,
            })?;
        if envelope.format_version != FORMAT_VERSION {
            return Err(IoError::IncompatibleSnapshotVersion {
                path: path.to_path_buf(),
                expected: FORMAT_VERSION,
                found: envelope.format_version,
            });
        }
        debug!(
            n_features = envelope.n_features,
            n_cases = envelope.n_cases,
            "matrix snapshot loaded"
        );
        Ok(envelope.matrix)
    }
}

#[cfg(test)]
mod tests {
    use grove_split::Feature;
    use tempfile::TempDir;

    use super::*;

    fn small_matrix() -> FeatureMatrix {
        let mut x = Feature::numeric("N:x");
        let mut c = Feature::categorical("C:c");
        for (xv, cv) in [("1", "a"), ("NA", "b"), ("3", "NA")] {
            x.append(xv);
            c.append(cv);
        }
        FeatureMatrix::new(vec![x, c], vec!["r0".into(), "r1".into(), "r2".into()]).unwrap()
    }

    #[test]
    fn round_trip_preserves_matrix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.bin");
        let fm = small_matrix();
        MatrixSnapshot::save(&fm, &path).unwrap();
        let loaded = MatrixSnapshot::load(&path).unwrap();
        assert_eq!(loaded, fm);
        assert_eq!(loaded.index_of("C:c"), Some(1));
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.bin");
        let envelope = SnapshotEnvelope {
            format_version: FORMAT_VERSION + 1,
            n_features: 2,
            n_cases: 3,
            matrix: small_matrix(),
        };
        std::fs::write(&path, bincode::serialize(&envelope).unwrap()).unwrap();
        let err = MatrixSnapshot::load(&path).unwrap_err();
        assert!(matches!(
            err,
            IoError::IncompatibleSnapshotVersion { found, .. } if found == FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn missing_file_error() {
        let dir = TempDir::new().unwrap();
        let err = MatrixSnapshot::load(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, IoError::SnapshotIo { .. }));
    }

    #[test]
    fn corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"not a snapshot").unwrap();
        let err = MatrixSnapshot::load(&path).unwrap_err();
        assert!(matches!(err, IoError::DeserializeSnapshot { .. }));
    }
}
