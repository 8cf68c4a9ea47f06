//! Error types for the Labbook editing core
//!
//! This module provides error handling using thiserror for structured
//! error definitions and anyhow for propagation at the binary boundary.
//!
//! Store failures are classified once, at the store boundary, into
//! [`StoreError`] so that callers can tell an expected referential-integrity
//! refusal apart from every other failure without inspecting messages.

use thiserror::Error;

/// Main error type for Labbook operations
#[derive(Error, Debug)]
pub enum LabbookError {
    /// Relational store operation failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Anchor string is not of the form `<kind>/<identifier>`
    #[error("Invalid anchor: {0}")]
    InvalidAnchor(String),

    /// Owner kind or identifier could not be parsed
    #[error("Invalid owner: {0}")]
    InvalidOwner(String),

    /// Invalid operation (e.g., committing without an open transaction)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Labbook operations
pub type Result<T> = std::result::Result<T, LabbookError>;

/// Convert anyhow::Error to LabbookError
impl From<anyhow::Error> for LabbookError {
    fn from(err: anyhow::Error) -> Self {
        LabbookError::Other(err.to_string())
    }
}

/// Classified failure reported by the relational store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A foreign-key constraint refused the statement
    #[error("referential integrity violation: {0}")]
    IntegrityViolation(String),

    /// Any other store failure
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Whether this is a referential-integrity refusal
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, StoreError::IntegrityViolation(_))
    }
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, _)
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                StoreError::IntegrityViolation(err.to_string())
            }
            other => StoreError::Other(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for LabbookError {
    fn from(err: rusqlite::Error) -> Self {
        LabbookError::Store(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LabbookError::InvalidAnchor("tagless".to_string());
        assert_eq!(err.to_string(), "Invalid anchor: tagless");
    }

    #[test]
    fn test_foreign_key_failure_is_classified() {
        let failure = rusqlite::ffi::Error {
            code: rusqlite::ErrorCode::ConstraintViolation,
            extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
        };
        let err: StoreError = rusqlite::Error::SqliteFailure(failure, None).into();
        assert!(err.is_integrity_violation());
    }

    #[test]
    fn test_other_constraint_is_not_integrity() {
        let failure = rusqlite::ffi::Error {
            code: rusqlite::ErrorCode::ConstraintViolation,
            extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
        };
        let err: StoreError = rusqlite::Error::SqliteFailure(failure, None).into();
        assert!(!err.is_integrity_violation());
    }
}
