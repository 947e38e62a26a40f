//! Annotated feature matrix (AFM) reader.
//!
//! An AFM file is tab-separated text in one of two orientations:
//!
//! - **Features in rows** (default): the header is a corner cell followed by
//!   case labels; every following row is a feature name then one value per
//!   case.
//! - **Features in columns**: detected when the first header cell after the
//!   corner starts with `N:`, `C:` or `B:`. The header then names the
//!   features and each following row is one case, case label first.
//!
//! Names starting with `N:` become numeric features; every other name
//! becomes categorical.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use grove_split::{Feature, FeatureMatrix, SplitError};
use tracing::{debug, info, instrument};

use crate::IoError;

const TYPE_PREFIXES: [&str; 3] = ["N:", "C:", "B:"];
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
/// Zip signatures: local file header, empty archive, spanned archive.
const ZIP_MAGICS: [[u8; 4]; 3] = [
    [b'P', b'K', 0x03, 0x04],
    [b'P', b'K', 0x05, 0x06],
    [b'P', b'K', 0x07, 0x08],
];
const UNSUPPORTED_EXTENSIONS: [&str; 2] = ["arff", "libsvm"];

/// Reads a [`FeatureMatrix`] from an AFM file: plain, gzip-compressed, or the
/// first entry of a zip archive.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::UnsupportedFormat`] | the file ends in `.arff` or `.libsvm` |
/// | [`IoError::FileNotFound`] | the file doesn't exist or is unreadable |
/// | [`IoError::Archive`] | a zip archive is corrupt or its entry unreadable |
/// | [`IoError::EmptyArchive`] | a zip archive has no entries |
/// | [`IoError::EmptyMatrix`] | the file has no header row |
/// | [`IoError::CsvParse`] | a feature row is malformed |
/// | [`IoError::InconsistentRowLength`] | a feature row's width differs from the header |
/// | [`IoError::InvalidMatrix`] | duplicate feature names or mismatched case counts |
pub struct AfmReader {
    path: PathBuf,
}

impl AfmReader {
    /// Create a new reader for the given path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and parse the file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<FeatureMatrix, IoError> {
        if let Some(ext) = self.path.extension().and_then(std::ffi::OsStr::to_str)
            && UNSUPPORTED_EXTENSIONS.iter().any(|u| ext.eq_ignore_ascii_case(u))
        {
            return Err(IoError::UnsupportedFormat {
                path: self.path.clone(),
                extension: ext.to_string(),
            });
        }

        let input = self.open()?;
        let matrix = parse_afm_from(input, &self.path)?;
        info!(
            n_features = matrix.n_features(),
            n_cases = matrix.n_cases(),
            "feature matrix loaded"
        );
        Ok(matrix)
    }

    /// Open the file, unwrapping a zip archive or gzip stream when the magic
    /// bytes match.
    fn open(&self) -> Result<Box<dyn Read>, IoError> {
        let not_found = |e: std::io::Error| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        };
        let mut buffered = BufReader::new(File::open(&self.path).map_err(not_found)?);
        let head = buffered.fill_buf().map_err(not_found)?;
        let zipped = ZIP_MAGICS.iter().any(|m| head.starts_with(m));
        let gzipped = head.starts_with(&GZIP_MAGIC);
        if zipped {
            self.first_archive_entry(buffered)
        } else if gzipped {
            debug!("gzip stream detected");
            Ok(Box::new(GzDecoder::new(buffered)))
        } else {
            Ok(Box::new(buffered))
        }
    }

    /// Read the first entry of a zip archive into memory.
    fn first_archive_entry(&self, input: BufReader<File>) -> Result<Box<dyn Read>, IoError> {
        let archive_error = |source: zip::result::ZipError| IoError::Archive {
            path: self.path.clone(),
            source,
        };
        let mut archive = zip::ZipArchive::new(input).map_err(archive_error)?;
        if archive.is_empty() {
            return Err(IoError::EmptyArchive {
                path: self.path.clone(),
            });
        }
        let n_entries = archive.len();
        let mut entry = archive.by_index(0).map_err(archive_error)?;
        debug!(entry = entry.name(), n_entries, "zip archive detected");

        let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| archive_error(zip::result::ZipError::Io(e)))?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}

/// Parse an AFM stream held in memory or piped from elsewhere.
///
/// # Errors
///
/// Same as [`AfmReader::read`], minus the file-level variants. Errors name
/// the source as `-`.
pub fn parse_afm<R: Read>(input: R) -> Result<FeatureMatrix, IoError> {
    parse_afm_from(input, Path::new("-"))
}

/// Build one feature from a features-in-rows record: name, then values.
///
/// Returns `None` for an empty record.
#[must_use]
pub fn parse_feature(record: &csv::StringRecord) -> Option<Feature> {
    let mut fields = record.iter();
    let mut feature = feature_for_name(fields.next()?);
    for raw in fields {
        feature.append(raw);
    }
    Some(feature)
}

fn feature_for_name(name: &str) -> Feature {
    if name.starts_with("N:") {
        Feature::numeric(name)
    } else {
        Feature::categorical(name)
    }
}

fn tsv_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(input)
}

fn parse_error(path: &Path, e: csv::Error) -> IoError {
    IoError::CsvParse {
        path: path.to_path_buf(),
        offset: e.position().map_or(0, |p| p.byte()),
        source: e,
    }
}

fn parse_afm_from<R: Read>(input: R, path: &Path) -> Result<FeatureMatrix, IoError> {
    let mut rdr = tsv_reader(input);
    let mut header = csv::StringRecord::new();
    let has_header = rdr
        .read_record(&mut header)
        .map_err(|e| parse_error(path, e))?;
    if !has_header {
        return Err(IoError::EmptyMatrix {
            path: path.to_path_buf(),
        });
    }

    let invalid = |source: SplitError| IoError::InvalidMatrix {
        path: path.to_path_buf(),
        source,
    };

    let features_in_columns = header
        .get(1)
        .is_some_and(|first| TYPE_PREFIXES.iter().any(|p| first.starts_with(p)));

    if features_in_columns {
        debug!(n_features = header.len() - 1, "features in columns");
        let features = header.iter().skip(1).map(feature_for_name).collect();
        let mut matrix = FeatureMatrix::with_features(features).map_err(invalid)?;
        matrix.load_cases(&mut rdr, true);
        return Ok(matrix);
    }

    let case_labels: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
    debug!(n_cases = case_labels.len(), "features in rows");
    let mut features = Vec::new();
    let mut record = csv::StringRecord::new();
    while rdr
        .read_record(&mut record)
        .map_err(|e| parse_error(path, e))?
    {
        let Some(feature) = parse_feature(&record) else {
            continue;
        };
        if feature.n_cases() != case_labels.len() {
            return Err(IoError::InconsistentRowLength {
                path: path.to_path_buf(),
                name: feature.name().to_string(),
                expected: case_labels.len(),
                got: feature.n_cases(),
            });
        }
        features.push(feature);
    }
    FeatureMatrix::new(features, case_labels).map_err(invalid)
}
