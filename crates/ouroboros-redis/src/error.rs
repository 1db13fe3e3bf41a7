//! Store-adapter error types

use thiserror::Error;

/// Errors surfaced by [`StoreAdapter`](crate::StoreAdapter) operations.
///
/// "Key not present" is never an error: retrieval returns `None` and
/// statistics return [`KeyStatsLookup::NotFound`](crate::KeyStatsLookup::NotFound).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached, or rejected the credential, at construction.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A command failed mid-operation. Writes issued before the failure stay applied.
    #[error("Backend error: {0}")]
    Backend(String),

    /// A stored payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid cursor {0}: last published index must be >= -1")]
    InvalidCursor(i64),
}

impl StoreError {
    /// Returns true if the store itself failed (as opposed to bad data or input)
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::Backend(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Encode(err.to_string())
        }
    }
}
