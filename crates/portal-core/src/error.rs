//! Error types for the portal subsystem
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for portal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the portal subsystem
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A fixed-capacity table is full
    #[error("Capacity exhausted: {0}")]
    Capacity(String),

    /// An entry with the same key is already registered
    #[error("Already registered: {0}")]
    Duplicate(String),

    /// A domain name could not be converted to or from wire format
    #[error("Invalid domain name: {0}")]
    InvalidName(String),

    /// A wire read ran past the end of the buffer
    #[error("Truncated input: needed {needed} byte(s), {remaining} remaining")]
    Truncated {
        /// Bytes the read required
        needed: usize,
        /// Bytes left in the buffer
        remaining: usize,
    },

    /// No data point with this name
    #[error("Not found: {0}")]
    NotFound(String),

    /// The write was refused before validation (read-only point, null slot)
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The value failed type validation or was vetoed by the setter hook
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a capacity error
    pub fn capacity(msg: impl Into<String>) -> Self {
        Self::Capacity(msg.into())
    }

    /// Create a duplicate registration error
    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::Duplicate(msg.into())
    }

    /// Create an invalid domain name error
    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self::InvalidName(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a rejected write error
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Create an invalid value error
    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    /// Whether this error means the write was refused outright
    /// (no such point, or the point cannot be written) rather than
    /// the value being bad.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::NotFound(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_family() {
        assert!(Error::not_found("x").is_rejection());
        assert!(Error::rejected("x").is_rejection());
        assert!(!Error::invalid_value("x").is_rejection());
        assert!(!Error::capacity("x").is_rejection());
    }

    #[test]
    fn test_truncated_message() {
        let err = Error::Truncated { needed: 2, remaining: 1 };
        assert_eq!(
            err.to_string(),
            "Truncated input: needed 2 byte(s), 1 remaining"
        );
    }
}
