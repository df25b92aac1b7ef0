//! Error handling for mp3loader

use thiserror::Error;

/// Main error type for mp3loader
#[derive(Debug, Error)]
pub enum Mp3LoaderError {
    #[error("Missing required tools: {0}. Please install them and make sure they are in your PATH")]
    MissingDependency(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Could not start yt-dlp: {0}")]
    Spawn(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
