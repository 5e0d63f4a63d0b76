//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The progress record (or another keyed entity) does not exist.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// A remote operation did not finish within its deadline.
    #[error("timed out: {0}")]
    Timeout(String),
}

impl DomainError {
    /// Returns `true` for failures caused by the remote side being
    /// unreachable or slow, which callers degrade around instead of
    /// surfacing.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Infrastructure(_) | Self::Timeout(_))
    }
}
