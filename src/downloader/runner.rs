//! Process lifecycle for one download
//!
//! Spawns yt-dlp with stdout and stderr funneled into a single line stream,
//! feeds every line through the session state machine, and maps the final
//! process state onto a `DownloadOutcome`. Cancellation is cooperative: a stop
//! request terminates the external process, which closes the stream and lets
//! the read loop drain out.

use crate::downloader::cleanup::cleanup_partial_files;
use crate::downloader::command;
use crate::downloader::playlist;
use crate::downloader::request::DownloadRequest;
use crate::downloader::session::{
    ActiveTargets, DownloadSession, FailedItem, ProgressUpdate, SessionFlags,
};
use crate::downloader::tools;
use crate::utils::error::Mp3LoaderError;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// How long a graceful termination gets before the hard kill.
const GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Terminal state of one download run.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    /// Stop was requested before the main process was ever launched
    CancelledBeforeStart,
    /// Stop was requested mid-run; not an error
    Stopped { completed: u32 },
    /// At least one file landed; `failed` itemizes per-item losses
    Completed {
        downloaded: u32,
        failed: Vec<FailedItem>,
    },
    /// The process exited cleanly but nothing was downloaded
    NothingDownloaded,
    /// Non-zero exit with zero successes
    Failed { exit_code: Option<i32> },
}

/// Sink for everything the worker wants the UI to render.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Log(String),
    Progress(ProgressUpdate),
    /// Absolute fraction update with no label change
    Fraction(f32),
    CleanupFinished { deleted: usize },
}

pub type EventSender = mpsc::UnboundedSender<WorkerEvent>;

fn emit(events: &EventSender, event: WorkerEvent) {
    // The UI side may already be gone during shutdown; that's fine.
    let _ = events.send(event);
}

fn log(events: &EventSender, message: impl Into<String>) {
    emit(events, WorkerEvent::Log(message.into()));
}

/// Run one download to completion.
///
/// Every exit path, including errors, leaves the session tracking cleared;
/// the caller is responsible for restoring UI controls on return.
pub async fn run_download(
    request: DownloadRequest,
    targets: ActiveTargets,
    flags: Arc<SessionFlags>,
    mut stop_rx: mpsc::Receiver<()>,
    events: EventSender,
) -> Result<DownloadOutcome, Mp3LoaderError> {
    request.validate()?;

    let ytdlp = tools::find_ytdlp()
        .ok_or_else(|| Mp3LoaderError::MissingDependency("yt-dlp".to_string()))?;

    let playlist_titles = if request.wants_playlist_info() {
        log(&events, "Getting playlist information...");
        match playlist::fetch_titles(&ytdlp, &request.url, request.use_auth).await {
            Ok(titles) => {
                log(
                    &events,
                    format!("✓ Playlist information obtained: {} videos", titles.len()),
                );
                log(&events, "");
                titles
            }
            Err(e) => {
                warn!("Playlist info fetch failed: {}", e);
                log(&events, format!("⚠ Could not get playlist info: {}", e));
                log(&events, "");
                HashMap::new()
            }
        }
    } else {
        HashMap::new()
    };

    if flags.cancel_requested() {
        log(&events, "");
        log(&events, "✓ Download cancelled before starting");
        return Ok(DownloadOutcome::CancelledBeforeStart);
    }

    if request.use_auth {
        log(&events, "🔐 Authentication enabled: using Firefox cookies");
        log(
            &events,
            "   (Make sure you are logged into YouTube in Firefox)",
        );
        log(&events, "");
    }

    let args = command::download_args(&request);
    log(&events, format!("Running: {}", command::display(&ytdlp, &args)));
    log(&events, "");

    let mut cmd = command::build(&ytdlp, &args);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = spawn_checked(cmd)?;
    info!("Spawned yt-dlp (pid {:?}) for {}", child.id(), request.url);

    // Merge stdout and stderr into one ordered-enough line stream.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, line_tx.clone());
    }
    drop(line_tx);

    let mut session = DownloadSession::new(Arc::clone(&targets), playlist_titles);
    let mut exit_status = None;
    let mut stopping = false;

    loop {
        tokio::select! {
            maybe_line = line_rx.recv() => match maybe_line {
                Some(line) => {
                    let outcome = session.observe_line(&line);
                    if outcome.log {
                        log(&events, line.trim().to_string());
                    }
                    if let Some(progress) = outcome.progress {
                        emit(&events, WorkerEvent::Progress(progress));
                    }
                }
                // Both pipes closed; the process is done or dying
                None => break,
            },
            _ = stop_rx.recv(), if !stopping => {
                stopping = true;
                exit_status = terminate_with_grace(&mut child, &events).await;
            }
        }
    }

    let status = match exit_status {
        Some(status) => status,
        None => child.wait().await.map_err(Mp3LoaderError::Io)?,
    };
    debug!("yt-dlp exited with {:?}", status.code());

    session.finish();

    if flags.stopped() {
        let report = cleanup_partial_files(&targets);
        for note in &report.notes {
            log(&events, note.clone());
        }
        emit(
            &events,
            WorkerEvent::CleanupFinished {
                deleted: report.deleted,
            },
        );

        log(&events, "");
        log(&events, "=".repeat(60));
        if session.successful > 0 {
            log(
                &events,
                format!(
                    "ℹ Download stopped. Files completed before stopping: {}",
                    session.successful
                ),
            );
        } else {
            log(&events, "ℹ Download stopped. No files were completed.");
        }
        return Ok(DownloadOutcome::Stopped {
            completed: session.successful,
        });
    }

    let failed = std::mem::take(&mut session.failed);

    if session.successful > 0 {
        emit(&events, WorkerEvent::Fraction(1.0));
        log(&events, "");
        log(&events, "=".repeat(60));

        if failed.is_empty() {
            log(
                &events,
                format!(
                    "✓ Download completed successfully: {} file(s)",
                    session.successful
                ),
            );
        } else {
            log(
                &events,
                format!(
                    "✓ Download completed: {} file(s) downloaded",
                    session.successful
                ),
            );
            log(
                &events,
                format!("⚠ Warning: {} video(s) unavailable or failed", failed.len()),
            );
            log(&events, "");
            log(&events, "Failed videos:");
            log(&events, "-".repeat(60));
            for (i, item) in failed.iter().enumerate() {
                log(&events, format!("{}. {}", i + 1, item.context));
                log(&events, format!("   Error: {}", item.line));
            }
            log(&events, "-".repeat(60));
        }

        return Ok(DownloadOutcome::Completed {
            downloaded: session.successful,
            failed,
        });
    }

    if status.success() {
        emit(&events, WorkerEvent::Fraction(1.0));
        log(&events, "");
        log(&events, "=".repeat(60));
        log(&events, "✓ Process completed");
        return Ok(DownloadOutcome::NothingDownloaded);
    }

    log(&events, "");
    log(
        &events,
        format!(
            "✗ Error: Could not download any files (code {})",
            status.code().unwrap_or(-1)
        ),
    );
    Ok(DownloadOutcome::Failed {
        exit_code: status.code(),
    })
}

fn spawn_checked(mut cmd: Command) -> Result<Child, Mp3LoaderError> {
    cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Mp3LoaderError::Spawn("yt-dlp executable not found".to_string())
        } else {
            Mp3LoaderError::Spawn(e.to_string())
        }
    })
}

fn spawn_line_reader(stream: impl AsyncRead + Unpin + Send + 'static, tx: mpsc::UnboundedSender<String>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

/// Graceful termination first, hard kill after the grace period.
async fn terminate_with_grace(
    child: &mut Child,
    events: &EventSender,
) -> Option<std::process::ExitStatus> {
    let graceful_sent = send_graceful_signal(child);
    if graceful_sent {
        debug!("Sent graceful termination signal to yt-dlp");
        if let Ok(Ok(status)) = tokio::time::timeout(GRACE_PERIOD, child.wait()).await {
            debug!("yt-dlp terminated gracefully");
            return Some(status);
        }
    }

    log(events, "⚠ Forcing process termination...");
    warn!("yt-dlp did not terminate within {:?}; killing", GRACE_PERIOD);
    if let Err(e) = child.kill().await {
        error!("Failed to kill yt-dlp: {}", e);
    }
    child.wait().await.ok()
}

/// Platform-specific "please exit" request. Returns false when no such
/// request could be delivered, in which case the caller goes straight to the
/// hard kill.
fn send_graceful_signal(child: &Child) -> bool {
    let Some(pid) = child.id() else {
        // Already reaped
        return true;
    };
    let pid = pid.to_string();

    #[cfg(unix)]
    {
        std::process::Command::new("kill")
            .args(["-TERM", &pid])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[cfg(windows)]
    {
        std::process::Command::new("taskkill")
            .args(["/PID", &pid, "/T"])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = pid;
        false
    }
}

/// Headless single-download entrypoint used by `--headless`.
pub async fn run_headless(request: DownloadRequest) -> Result<DownloadOutcome, Mp3LoaderError> {
    let targets = crate::downloader::session::new_active_targets();
    let flags = Arc::new(SessionFlags::new());
    let (_stop_tx, stop_rx) = mpsc::channel(1);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                WorkerEvent::Log(line) => println!("{}", line),
                WorkerEvent::Progress(p) => {
                    if let Some(fraction) = p.fraction {
                        println!("[{:>5.1}%] {}", fraction * 100.0, p.label);
                    }
                }
                WorkerEvent::Fraction(_) | WorkerEvent::CleanupFinished { .. } => {}
            }
        }
    });

    let outcome = run_download(request, targets, flags, stop_rx, event_tx).await;
    let _ = printer.await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::UrlKind;
    use crate::downloader::session::new_active_targets;
    use tempfile::TempDir;

    #[tokio::test]
    async fn cancel_before_start_short_circuits() {
        let temp = TempDir::new().expect("temp dir");
        let request = DownloadRequest {
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            kind: UrlKind::Video,
            dest_dir: temp.path().to_path_buf(),
            use_auth: false,
        };

        let flags = Arc::new(SessionFlags::new());
        flags.request_stop();

        let (_stop_tx, stop_rx) = mpsc::channel(1);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        let outcome = run_download(
            request,
            new_active_targets(),
            flags,
            stop_rx,
            event_tx,
        )
        .await;

        // yt-dlp may be missing in CI; the pre-spawn cancel must win either
        // way when the tool is present, and the missing-tool error is the
        // only other acceptable result.
        match outcome {
            Ok(DownloadOutcome::CancelledBeforeStart) => {
                let mut saw_cancel_line = false;
                while let Ok(event) = event_rx.try_recv() {
                    if let WorkerEvent::Log(line) = event {
                        if line.contains("cancelled before starting") {
                            saw_cancel_line = true;
                        }
                    }
                }
                assert!(saw_cancel_line);
            }
            Err(Mp3LoaderError::MissingDependency(_)) => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn invalid_destination_is_a_validation_error() {
        let temp = TempDir::new().expect("temp dir");
        let file = temp.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();

        let request = DownloadRequest {
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            kind: UrlKind::Video,
            dest_dir: file,
            use_auth: false,
        };

        let (_stop_tx, stop_rx) = mpsc::channel(1);
        let (event_tx, _event_rx) = mpsc::unbounded_channel();

        let outcome = run_download(
            request,
            new_active_targets(),
            Arc::new(SessionFlags::new()),
            stop_rx,
            event_tx,
        )
        .await;

        assert!(matches!(outcome, Err(Mp3LoaderError::Validation(_))));
    }
}
