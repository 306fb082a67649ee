//! Error types for the persistent store

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single driver to encode or decode a record mapping.
///
/// During format detection these are expected and only mean "not this
/// format"; they reach the caller only from `sync`.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MessagePack encode error: {0}")]
    MsgPackEncode(String),

    #[error("MessagePack decode error: {0}")]
    MsgPackDecode(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Value at '{path}' cannot be represented in JSON")]
    NotJsonSafe { path: String },

    #[error("Unexpected data after the end of the encoded mapping")]
    TrailingBytes,

    #[error("Row {row} has {columns} columns, expected 2")]
    MalformedRow { row: usize, columns: usize },
}

impl From<rmp_serde::encode::Error> for DriverError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        DriverError::MsgPackEncode(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for DriverError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        DriverError::MsgPackDecode(e.to_string())
    }
}

/// Persistent store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File {path:?} is not in a supported format")]
    NoSupportedFormat { path: PathBuf },

    #[error("Unsupported format: {0:?}")]
    UnsupportedFormat(String),

    #[error("Unknown open mode: {0:?}")]
    UnknownMode(String),

    #[error("Serialization failed: {0}")]
    Driver(#[from] DriverError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
