use thiserror::Error;

/// Unified error type for the Rotor crate
///
/// Network-layer failures during validation, health probing, and geo lookups
/// are absorbed where they occur and converted into metrics signal; the only
/// errors that surface through the public API are caller mistakes.
#[derive(Error, Debug)]
pub enum RotorError {
    // Caller errors
    #[error("Unknown pool type: {0}")]
    UnknownPoolType(String),

    #[error("Invalid proxy URL: {0}")]
    InvalidProxyUrl(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Rotor operations
pub type Result<T> = std::result::Result<T, RotorError>;

// Convert from URL parse errors
impl From<url::ParseError> for RotorError {
    fn from(err: url::ParseError) -> Self {
        RotorError::InvalidProxyUrl(err.to_string())
    }
}

// Convert from reqwest errors
impl From<reqwest::Error> for RotorError {
    fn from(err: reqwest::Error) -> Self {
        RotorError::Http(err.to_string())
    }
}
