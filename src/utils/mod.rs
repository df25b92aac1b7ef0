//! Utility modules for error handling, configuration and notifications

pub mod config;
pub mod error;
pub mod notify;

// Re-export for convenience
pub use config::AppConfig;
pub use error::Mp3LoaderError;
