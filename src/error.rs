//! Error types for meme composition

use thiserror::Error;

/// Result type alias for meme operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or composing a meme
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load the image resource
    #[error("Failed to load image: {0}")]
    LoadError(String),

    /// Network error while fetching a remote image
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The fetched bytes are not a decodable image
    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    /// Invalid configuration or input contract violation
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::DecodeError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkError(err.to_string())
    }
}
