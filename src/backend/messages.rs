use crate::downloader::{DownloadOutcome, DownloadRequest};

/// Commands sent from GUI to Backend
#[derive(Debug, Clone)]
pub enum BackendCommand {
    StartDownload(DownloadRequest),
    Stop,
    // System
    Shutdown,
}

/// Events sent from Backend to GUI
#[derive(Debug, Clone)]
pub enum BackendEvent {
    /// A line for the visible log view
    Log(String),
    /// Progress bar update; either part may be absent
    Progress {
        fraction: Option<f32>,
        label: Option<String>,
    },
    /// Partial-file cleanup after a stop finished
    CleanupFinished { deleted: usize },
    /// The worker finished; controls can be re-enabled
    Finished(DownloadOutcome),
    /// The worker never produced an outcome
    Failed(String),
}
