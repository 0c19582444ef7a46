//! Error types for Trellis.
//!
//! This module defines the error types shared across the Trellis platform,
//! with a focus on clear failure modes and operational visibility.

use thiserror::Error;

/// Main error type for Trellis operations
#[derive(Error, Debug)]
pub enum TrellisError {
    /// Configuration errors (malformed input documents, unreadable files)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Resource validation errors
    ///
    /// The resource was rejected by the validator. `errors` holds the
    /// field-path-tagged messages, one per violated invariant.
    #[error("Validation failed for {resource}: {} error(s)", .errors.len())]
    Validation {
        resource: String,
        errors: Vec<String>,
    },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TrellisError {
    /// Create a configuration error without a source
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error without a source
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type alias for Trellis operations
pub type TrellisResult<T> = Result<T, TrellisError>;
