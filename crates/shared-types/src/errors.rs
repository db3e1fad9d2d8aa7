//! # Error Types
//!
//! Parsing errors for the shared vocabulary.

use thiserror::Error;

/// Errors raised while parsing shared types from their string form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Identifier was not a valid UUID.
    #[error("Invalid identifier '{value}': {reason}")]
    InvalidId { value: String, reason: String },

    /// Status code did not match any known queue status.
    #[error("Unknown queue status: {0}")]
    UnknownStatus(String),

    /// Identifier was empty.
    #[error("Empty {kind} identifier")]
    Empty { kind: &'static str },
}
