//! Index error types
//!
//! Error codes:
//! - LIBRIS_INDEX_CORRUPTION (FATAL)
//! - LIBRIS_INDEX_INVALID_CAPACITY (FATAL)
//! - LIBRIS_INDEX_LOAD_FAILED (FATAL)
//! - LIBRIS_INDEX_SOURCE_UNAVAILABLE (ERROR)
//!
//! A lookup miss is never an error. Fatal codes mean the in-memory indexes
//! can no longer be trusted and must be rebuilt from the durable store.

use std::fmt;

/// Severity levels for index errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation failed, the indexes are still consistent
    Error,
    /// Index state is corrupt or was never built
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// A structural invariant does not hold
    LibrisIndexCorruption,
    /// A hash index was asked for a zero capacity
    LibrisIndexInvalidCapacity,
    /// Enumerating the durable store during load failed
    LibrisIndexLoadFailed,
    /// The durable store could not serve a cache-miss fallback
    LibrisIndexSourceUnavailable,
}

impl IndexErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::LibrisIndexCorruption => "LIBRIS_INDEX_CORRUPTION",
            IndexErrorCode::LibrisIndexInvalidCapacity => "LIBRIS_INDEX_INVALID_CAPACITY",
            IndexErrorCode::LibrisIndexLoadFailed => "LIBRIS_INDEX_LOAD_FAILED",
            IndexErrorCode::LibrisIndexSourceUnavailable => "LIBRIS_INDEX_SOURCE_UNAVAILABLE",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            IndexErrorCode::LibrisIndexSourceUnavailable => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with full context
#[derive(Debug, Clone)]
pub struct IndexError {
    /// Error code
    code: IndexErrorCode,
    /// Human-readable message
    message: String,
    /// Name of the index the error was raised by, if any
    index: Option<&'static str>,
}

impl IndexError {
    /// Create a corruption error for the named index
    pub fn corruption(index: &'static str, reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::LibrisIndexCorruption,
            message: reason.into(),
            index: Some(index),
        }
    }

    /// Create an invalid capacity error
    pub fn invalid_capacity(capacity: usize) -> Self {
        Self {
            code: IndexErrorCode::LibrisIndexInvalidCapacity,
            message: format!("hash index capacity must be positive, got {}", capacity),
            index: None,
        }
    }

    /// Create a load failed error
    pub fn load_failed(reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::LibrisIndexLoadFailed,
            message: reason.into(),
            index: None,
        }
    }

    /// Create a source unavailable error
    pub fn source_unavailable(reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::LibrisIndexSourceUnavailable,
            message: reason.into(),
            index: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the index name if applicable
    pub fn index(&self) -> Option<&'static str> {
        self.index
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(index) = self.index {
            write!(f, " [index {}]", index)?;
        }
        Ok(())
    }
}

impl std::error::Error for IndexError {}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
