//! Desktop notifications
//!
//! Strictly best-effort: every failure is swallowed after a debug log. The
//! primary channel is the platform notification system via notify-rust; if
//! that fails, fall back to spawning `notify-send` directly.

use std::process::{Command, Stdio};
use tracing::debug;

const APP_NAME: &str = "YouTube MP3 Downloader";

/// Urgency hint for the notification icon.
#[derive(Debug, Clone, Copy)]
pub enum NotifyKind {
    Info,
    Success,
    Warning,
}

impl NotifyKind {
    fn icon(self) -> &'static str {
        match self {
            NotifyKind::Info => "dialog-information",
            NotifyKind::Success => "emblem-default",
            NotifyKind::Warning => "dialog-warning",
        }
    }
}

/// Send a desktop notification, silently doing nothing on failure.
pub fn send(title: &str, body: &str, kind: NotifyKind) {
    match notify_rust::Notification::new()
        .appname(APP_NAME)
        .summary(title)
        .body(body)
        .icon(kind.icon())
        .show()
    {
        Ok(_) => {
            debug!("Notification sent: {}", title);
            return;
        }
        Err(e) => debug!("notify-rust failed: {}", e),
    }

    if which::which("notify-send").is_err() {
        debug!("notify-send not available; skipping notification");
        return;
    }

    let result = Command::new("notify-send")
        .args(["-a", APP_NAME, "-i", kind.icon(), title, body])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    match result {
        Ok(_) => debug!("Notification sent via notify-send: {}", title),
        Err(e) => debug!("notify-send failed: {}", e),
    }
}
