//! Durable store errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::RecordId;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a durable record store
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with this id exists
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// The store file already exists
    #[error("store already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Disk I/O failure
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A record could not be encoded
    #[error("failed to encode record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored line failed checksum or parse validation
    #[error("corrupted store line {line}: {reason}")]
    Corruption { line: usize, reason: String },

    /// Record or loan ids are exhausted
    #[error("id space exhausted")]
    IdsExhausted,

    /// The record has an open loan
    #[error("record {0} is on loan")]
    OnLoan(RecordId),

    /// No open loan exists for the record
    #[error("record {0} has no open loan")]
    NoOpenLoan(RecordId),
}

impl StoreError {
    /// Wrap an I/O error with context
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "LIBRIS_STORE_NOT_FOUND",
            StoreError::AlreadyExists(_) => "LIBRIS_STORE_ALREADY_EXISTS",
            StoreError::Io { .. } => "LIBRIS_STORE_IO_ERROR",
            StoreError::Serialization(_) => "LIBRIS_STORE_SERIALIZATION",
            StoreError::Corruption { .. } => "LIBRIS_DATA_CORRUPTION",
            StoreError::IdsExhausted => "LIBRIS_STORE_IDS_EXHAUSTED",
            StoreError::OnLoan(_) => "LIBRIS_STORE_ON_LOAN",
            StoreError::NoOpenLoan(_) => "LIBRIS_STORE_NO_OPEN_LOAN",
        }
    }
}
