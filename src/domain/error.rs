//! Domain error types

use thiserror::Error;

/// Error when the preference store fails
#[derive(Debug, Clone, Error)]
pub enum PreferenceError {
    #[error("Failed to read preferences file: {0}")]
    ReadError(String),

    #[error("Failed to parse preferences file: {0}")]
    ParseError(String),

    #[error("Failed to write preferences file: {0}")]
    WriteError(String),
}
