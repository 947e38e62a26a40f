//! Tab-separated case writer.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use grove_split::{FeatureMatrix, SplitError};
use tracing::{info, instrument};

use crate::IoError;

/// Writes a subset of a matrix's cases to a features-in-rows AFM file.
pub struct CaseWriter {
    path: PathBuf,
}

impl CaseWriter {
    /// Create a new writer targeting `path`. Nothing is touched until [`write`](Self::write).
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Write `cases` of `matrix`, truncating any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be created, a case
    /// is out of range, or a write fails part way.
    #[instrument(skip(self, matrix, cases), fields(path = %self.path.display(), n_cases = cases.len()))]
    pub fn write(&self, matrix: &FeatureMatrix, cases: &[usize]) -> Result<(), IoError> {
        let wrap = |source: SplitError| IoError::WriteFile {
            path: self.path.clone(),
            source,
        };
        let file = File::create(&self.path).map_err(|source| wrap(SplitError::WriteCases { source }))?;
        let mut out = BufWriter::new(file);
        matrix.write_cases(&mut out, cases).map_err(wrap)?;
        info!(n_features = matrix.n_features(), "cases written");
        Ok(())
    }

    /// Write every case of `matrix`.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn write_all(&self, matrix: &FeatureMatrix) -> Result<(), IoError> {
        let cases: Vec<usize> = (0..matrix.n_cases()).collect();
        self.write(matrix, &cases)
    }
}
