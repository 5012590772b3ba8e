//! Error types for wikirelay.

use thiserror::Error;

/// Result type alias using wikirelay's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for wikirelay operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Key-value store read or write failed (not a compare-and-set conflict)
    #[error("Store error: {0}")]
    Store(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Alias or site+discriminator pair already taken in the channel
    #[error("{0}")]
    Conflict(String),

    /// Secondary indices no longer agree with the primary map
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Compare-and-set kept losing to concurrent writers
    #[error("reached write attempt limit ({attempts} attempts)")]
    WriteAttemptLimit { attempts: u32 },

    /// Edit removed the old subscription but could neither add the new one
    /// nor restore the original
    #[error("Edit partially failed, subscription removed: {0}")]
    EditPartiallyFailed(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
