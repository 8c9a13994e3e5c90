//! CLI-specific error types
//!
//! Every failure becomes a single coded error response on stdout.

use std::fmt;
use std::io;

use crate::catalog::CatalogError;
use crate::index::IndexError;
use crate::store::StoreError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout)
    IoError,
    /// Store file already exists
    AlreadyInitialized,
    /// Store file missing
    NotInitialized,
    /// No record with the requested id
    RecordNotFound,
    /// Failure reported by the catalog, store or index layer, with its code
    Library(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "LIBRIS_CLI_CONFIG_ERROR",
            Self::IoError => "LIBRIS_CLI_IO_ERROR",
            Self::AlreadyInitialized => "LIBRIS_CLI_ALREADY_INITIALIZED",
            Self::NotInitialized => "LIBRIS_CLI_NOT_INITIALIZED",
            Self::RecordNotFound => "LIBRIS_CLI_RECORD_NOT_FOUND",
            Self::Library(code) => code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Store file already exists
    pub fn already_initialized() -> Self {
        Self::new(
            CliErrorCode::AlreadyInitialized,
            "Record store already initialized",
        )
    }

    /// Store file missing
    pub fn not_initialized() -> Self {
        Self::new(
            CliErrorCode::NotInitialized,
            "Record store not initialized. Run 'libris init' first.",
        )
    }

    /// Unknown record id
    pub fn record_not_found(id: u32) -> Self {
        Self::new(
            CliErrorCode::RecordNotFound,
            format!("Record {} not found", id),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists(_) => Self::already_initialized(),
            StoreError::NotFound(id) => Self::record_not_found(id),
            other => Self::new(CliErrorCode::Library(other.code()), other.to_string()),
        }
    }
}

impl From<IndexError> for CliError {
    fn from(e: IndexError) -> Self {
        Self::new(CliErrorCode::Library(e.code().code()), e.message())
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::Store(e) => e.into(),
            CatalogError::Index(e) => e.into(),
            other => Self::new(CliErrorCode::Library(other.code()), other.to_string()),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
