//! Crate-wide error type.
//!
//! Bad configuration, I/O failures on any declared path, and malformed SAM
//! records are all fatal. Malformed contig headers and bundle lines are not
//! errors here — they are skipped (contig headers silently, bundle lines to
//! a side-channel file).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SigmaError {
    #[error("error opening file: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown {key}: {value}")]
    Config { key: &'static str, value: String },

    #[error("invalid SAM record: {line}")]
    MalformedSam { line: String },

    #[error("malformed sigma contigs snapshot: {reason}")]
    MalformedSnapshot { reason: String },
}

pub type Result<T> = std::result::Result<T, SigmaError>;

impl SigmaError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SigmaError::Io { path: path.into(), source }
    }
}
