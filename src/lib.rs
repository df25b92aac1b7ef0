//! mp3loader library

pub mod backend;
pub mod classify;
pub mod downloader;
pub mod gui;
pub mod utils;

// Re-export main types for easier use
pub use backend::{BackendActor, BackendCommand, BackendEvent};
pub use classify::{classify, UrlKind};
pub use downloader::{DownloadOutcome, DownloadRequest};
pub use gui::{Message, Mp3LoaderApp};
pub use utils::{AppConfig, Mp3LoaderError};
