//! Error types for the speed study pipeline.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudyError {
    #[error("unable to parse header for file {file}")]
    HeaderIncomplete { file: String },
    #[error("invalid date {value:?} in header of file {file}")]
    InvalidDate { file: String, value: String },
    #[error("invalid speed limit {value:?} in header of file {file}")]
    InvalidSpeedLimit { file: String, value: String },
    #[error("no valid vehicle observations to analyse")]
    EmptyInput,
    #[error("bucket interval must be positive, got {0} seconds")]
    InvalidInterval(i64),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, StudyError>;
