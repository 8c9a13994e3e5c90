//! Catalog service errors

use thiserror::Error;

use crate::index::IndexError;
use crate::store::StoreError;

use super::record::RecordId;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors surfaced by the [`Library`](super::Library) service
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The record failed validation; nothing was written
    #[error("validation failed: {0}")]
    Validation(String),

    /// The record is not available for borrowing
    #[error("record {0} is not available for borrowing")]
    Unavailable(RecordId),

    /// The record is borrowed and cannot be removed
    #[error("record {0} is currently borrowed")]
    OnLoan(RecordId),

    /// The durable store refused or failed the operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The index layer reported a failure
    #[error(transparent)]
    Index(#[from] IndexError),
}

impl CatalogError {
    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::Validation(_) => "LIBRIS_VALIDATION_FAILED",
            CatalogError::Unavailable(_) => "LIBRIS_RECORD_UNAVAILABLE",
            CatalogError::OnLoan(_) => "LIBRIS_RECORD_ON_LOAN",
            CatalogError::Store(e) => e.code(),
            CatalogError::Index(e) => e.code().code(),
        }
    }
}
