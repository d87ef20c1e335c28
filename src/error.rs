use std::path::PathBuf;

use thiserror::Error;

/// A normalizer could not match its expected pattern. Always recoverable:
/// the caller logs it and leaves the field empty.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("auction date does not match the expected shape: {0:?}")]
    DateShape(String),

    #[error("unknown {kind} name {name:?}")]
    UnknownName { kind: &'static str, name: String },

    #[error("date out of range: {0:?}")]
    DateOutOfRange(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(
        "integrity violation at {path}: stored {stored_len} bytes differ from new {new_len} bytes"
    )]
    IntegrityViolation {
        path: PathBuf,
        stored_len: u64,
        new_len: u64,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
