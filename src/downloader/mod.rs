//! Download pipeline: request validation, yt-dlp invocation, output
//! scraping, and post-stop cleanup.

pub mod cleanup;
pub mod command;
pub mod playlist;
pub mod request;
pub mod runner;
pub mod session;
pub mod tools;

pub use request::DownloadRequest;
pub use runner::{DownloadOutcome, WorkerEvent};
pub use session::{ActiveTargets, SessionFlags};
