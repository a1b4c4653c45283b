//! Error types for the Makeover application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Makeover application.
///
/// Intent-level rejections (`Validation`, `Busy`, `IndexOutOfRange`) are raised
/// synchronously by the composition engine. `Backend` carries the message of a
/// failed generation call; every backend failure cause is flattened into it.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MakeoverError {
    /// A required input is missing or malformed (portrait, instruction, source artifact)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A generation or edit request is already outstanding
    #[error("A generation request is already in progress")]
    Busy,

    /// Slot index outside the fixed slot range
    #[error("Slot index {index} is out of range (expected 0..={max})")]
    IndexOutOfRange { index: usize, max: usize },

    /// The external image backend failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", "base64", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MakeoverError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a Busy error
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }

    /// Check if this is an IndexOutOfRange error
    pub fn is_index_out_of_range(&self) -> bool {
        matches!(self, Self::IndexOutOfRange { .. })
    }

    /// Check if this is a Backend error
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// Check if this is an IO error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns the bare message without the variant prefix.
    ///
    /// Used when a backend failure is folded into the orchestrator's
    /// `Error(message)` state.
    pub fn message(&self) -> String {
        match self {
            Self::Validation(message)
            | Self::Backend(message)
            | Self::Config(message)
            | Self::Internal(message) => message.clone(),
            Self::Io { message } => message.clone(),
            Self::Serialization { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for MakeoverError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for MakeoverError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for MakeoverError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for MakeoverError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<base64::DecodeError> for MakeoverError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Serialization {
            format: "base64".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for MakeoverError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, MakeoverError>`.
pub type Result<T> = std::result::Result<T, MakeoverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_strips_variant_prefix() {
        let err = MakeoverError::backend("quota exceeded");
        assert_eq!(err.to_string(), "Backend error: quota exceeded");
        assert_eq!(err.message(), "quota exceeded");
    }

    #[test]
    fn test_index_out_of_range_display() {
        let err = MakeoverError::IndexOutOfRange { index: 7, max: 6 };
        assert!(err.is_index_out_of_range());
        assert_eq!(err.to_string(), "Slot index 7 is out of range (expected 0..=6)");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.png");
        let err: MakeoverError = io.into();
        assert!(err.is_io());
        assert!(err.message().contains("missing.png"));
    }
}
