//! Error types for the descriptor crate.

use thiserror::Error;

/// Descriptor codec error type.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The document is not valid YAML or does not match the descriptor shape.
    #[error("malformed descriptor: {0}")]
    Decode(String),

    /// The model could not be rendered back to YAML.
    #[error("failed to encode descriptor: {0}")]
    Encode(String),
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

impl From<serde_yaml::Error> for CodecError {
    fn from(err: serde_yaml::Error) -> Self {
        CodecError::Decode(err.to_string())
    }
}
