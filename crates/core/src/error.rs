//! Shared error model for the foundation primitives.

use thiserror::Error;

/// Result type used by the foundation primitives.
pub type CoreResult<T> = Result<T, CoreError>;

/// Foundation-level error.
///
/// Kept to failures of the primitives themselves (parsing, validation).
/// Runtime failures of background work are reported by the jobs crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
