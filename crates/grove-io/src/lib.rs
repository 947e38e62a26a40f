//! File I/O for grove feature matrices: AFM parsing (plain, gzip, zip), case writing, snapshots.

mod afm;
mod error;
mod snapshot;
mod writer;

pub use afm::{AfmReader, parse_afm, parse_feature};
pub use error::IoError;
pub use snapshot::MatrixSnapshot;
pub use writer::CaseWriter;
