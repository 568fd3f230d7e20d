//! Error types for Canopy
//!
//! All fallible operations return `Result<T, Error>`.
//! An input that the grammar does not derive is *not* an error: parsing
//! returns an empty forest instead.

/// Canopy error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed grammar, detected before any parsing begins
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Syntax violation in grammar text (message carries line:column)
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Malformed caller input, such as a word/tag count mismatch
    #[error("Input error: {0}")]
    InputError(String),

    /// A caller-imposed bound on sentence length or output size was hit
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

/// Result type alias for Canopy operations
pub type Result<T> = std::result::Result<T, Error>;
