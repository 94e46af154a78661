//! Error types for Casket core.

use casket_store::{EntityId, Version};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Casket core operations.
///
/// A missing entity is never an error; lookups return `Option`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Backing store error.
    #[error("store error: {0}")]
    Store(#[from] casket_store::StoreError),

    /// Attribute codec error.
    #[error("codec error: {0}")]
    Codec(#[from] casket_codec::CodecError),

    /// A conditional insert found an existing row.
    #[error("entity '{id}' already exists")]
    DuplicateId {
        /// The id that already exists.
        id: EntityId,
    },

    /// A conditional update lost the race against another writer.
    ///
    /// The in-memory entity can no longer be trusted; the whole business
    /// operation must be retried from the start.
    #[error(
        "stale version for entity '{id}': expected {expected}, store has {}",
        describe_version(.actual)
    )]
    StaleVersionConflict {
        /// The entity that conflicted.
        id: EntityId,
        /// Version the writer expected to replace.
        expected: Version,
        /// Version found in the store, `None` if the row is gone.
        actual: Option<Version>,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

/// How a consuming layer should surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Lost update; the operation may be retried from scratch.
    Conflict,
    /// The entity already exists.
    AlreadyExists,
    /// The store could not be reached; the operation may be retried.
    Unavailable,
    /// Schema mismatch, corruption or a programming error.
    Unexpected,
}

impl CoreError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns the category a consuming layer should map this error to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::StaleVersionConflict { .. } => ErrorCategory::Conflict,
            Self::DuplicateId { .. } => ErrorCategory::AlreadyExists,
            Self::Store(e) if e.is_retryable() => ErrorCategory::Unavailable,
            Self::Store(_) | Self::Codec(_) | Self::InvalidOperation { .. } => {
                ErrorCategory::Unexpected
            }
        }
    }

    /// Returns true if repeating the whole business operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Conflict | ErrorCategory::Unavailable
        )
    }
}

fn describe_version(version: &Option<Version>) -> String {
    match version {
        Some(version) => version.to_string(),
        None => "no row".to_string(),
    }
}
