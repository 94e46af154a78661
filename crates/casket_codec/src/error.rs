//! Error types for the codec crate.

use crate::kind::AttributeKind;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding attribute values.
///
/// Codec errors indicate corrupted data or a schema mismatch. They are
/// never transient and must not be retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A value could not be serialized.
    #[error("failed to encode attribute '{name}': {message}")]
    Encode {
        /// Attribute name.
        name: String,
        /// Description of the encoding error.
        message: String,
    },

    /// A stored value could not be parsed as the requested kind.
    #[error("failed to decode attribute '{name}' as {kind}: {message}")]
    Decode {
        /// Attribute name.
        name: String,
        /// The kind the caller asked for.
        kind: AttributeKind,
        /// Description of the decoding error.
        message: String,
    },
}

impl CodecError {
    /// Creates an encoding error.
    pub fn encode(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encode {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a decoding error.
    pub fn decode(
        name: impl Into<String>,
        kind: AttributeKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Decode {
            name: name.into(),
            kind,
            message: message.into(),
        }
    }

    /// Returns the attribute name the error refers to.
    #[must_use]
    pub fn attribute(&self) -> &str {
        match self {
            Self::Encode { name, .. } | Self::Decode { name, .. } => name,
        }
    }
}
