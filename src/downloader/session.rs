//! Download session state
//!
//! One `DownloadSession` tracks one yt-dlp invocation. It is fed the merged
//! output stream one line at a time and turns the tool's human-readable
//! markers into counters, progress updates and the active-target set used for
//! cleanup. It never touches the process itself, which keeps the whole state
//! machine unit-testable against canned output.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Cancellation flags shared between the UI side and the worker.
///
/// Plain booleans with relaxed ordering: the only requirement is "observed
/// eventually", and the worst case of a missed read is one extra processed
/// output line.
#[derive(Debug, Default)]
pub struct SessionFlags {
    cancel_requested: AtomicBool,
    stopped: AtomicBool,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.cancel_requested.store(true, Ordering::Relaxed);
        self.stopped.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.cancel_requested.store(false, Ordering::Relaxed);
        self.stopped.store(false, Ordering::Relaxed);
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Relaxed)
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

/// Paths the external process has announced as in-progress and not yet
/// confirmed complete or discarded. Every add and remove happens under this
/// one lock; cleanup drains it under the same lock.
pub type ActiveTargets = Arc<Mutex<HashSet<PathBuf>>>;

pub fn new_active_targets() -> ActiveTargets {
    Arc::new(Mutex::new(HashSet::new()))
}

/// One per-item failure, kept for the end-of-run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    /// The raw ERROR line as emitted by the tool
    pub line: String,
    /// Best available human-readable context (title, mapped id, or "Unknown")
    pub context: String,
}

/// Progress derived from a single output line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// 0.0..=1.0, absent when only the label changed
    pub fraction: Option<f32>,
    pub label: String,
}

/// What the caller should do with an observed line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineOutcome {
    /// Append the raw line to the visible log
    pub log: bool,
    pub progress: Option<ProgressUpdate>,
}

impl LineOutcome {
    fn quiet() -> Self {
        Self {
            log: false,
            progress: None,
        }
    }
}

static ITEM_OF_TOTAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Downloading (?:item|video) (\d+) of (\d+)").expect("item pattern"));

static ERROR_VIDEO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[youtube\]\s+([A-Za-z0-9_-]+):").expect("error-id pattern"));

/// Fixed allow-list of "content unavailable" phrasings. Only these count as
/// terminal per-item failures; any other ERROR line is logged but tolerated,
/// because the tool emits transient warnings through the same channel.
const UNAVAILABLE_MARKERS: &[&str] = &[
    "Video unavailable",
    "This video has been",
    "Private video",
    "This video is no longer available",
    "removed by the uploader",
    "account associated with this video has been terminated",
    "Video is not available",
    "Members-only",
    "Join this channel to get access",
    "This live stream recording is not available",
];

/// State for one in-flight yt-dlp invocation.
#[derive(Debug)]
pub struct DownloadSession {
    targets: ActiveTargets,
    playlist_titles: HashMap<String, String>,

    current_title: String,
    current_target: Option<PathBuf>,

    pub item_index: u32,
    pub total_items: u32,
    pub successful: u32,
    pub failed: Vec<FailedItem>,
}

impl DownloadSession {
    pub fn new(targets: ActiveTargets, playlist_titles: HashMap<String, String>) -> Self {
        Self {
            targets,
            playlist_titles,
            current_title: String::new(),
            current_target: None,
            item_index: 0,
            total_items: 0,
            successful: 0,
            failed: Vec::new(),
        }
    }

    /// Feed one raw output line through the state machine.
    pub fn observe_line(&mut self, raw: &str) -> LineOutcome {
        let line = raw.trim();
        if line.is_empty() {
            return LineOutcome::quiet();
        }

        if let Some(title) = line.strip_prefix("[TITLE]") {
            self.current_title = title.to_string();
            return LineOutcome::quiet();
        }

        let mut progress = None;

        if line.contains("[download] Downloading item") || line.contains("[download] Downloading video")
        {
            if let Some(caps) = ITEM_OF_TOTAL.captures(line) {
                self.item_index = caps[1].parse().unwrap_or(self.item_index);
                self.total_items = caps[2].parse().unwrap_or(self.total_items);
                if self.current_title.is_empty() {
                    self.current_title = format!("Video #{}", self.item_index);
                }
            }
            progress = Some(ProgressUpdate {
                fraction: None,
                label: if self.total_items > 0 {
                    format!("Video {}/{}", self.item_index, self.total_items)
                } else {
                    "Downloading playlist...".to_string()
                },
            });
        }

        if let Some((_, rest)) = line.split_once("[download] Destination:") {
            let path = PathBuf::from(rest.trim());
            {
                let mut targets = self.targets.lock().expect("active-targets lock");
                targets.insert(path.clone());
            }
            if self.current_title.is_empty() {
                self.current_title = file_stem_string(&path);
            }
            debug!("Tracking in-progress target: {}", path.display());
            self.current_target = Some(path);
        }

        if line.contains("Deleting original file") {
            self.successful += 1;
            self.clear_current_target();
        }

        if line.contains("ERROR:") {
            self.observe_error_line(line);
        }

        if line.contains('%') && line.contains("ETA") {
            if let Some(percent) = parse_percent(line) {
                let label = if self.total_items > 0 {
                    format!(
                        "Video {}/{} - {:.1}%",
                        self.item_index, self.total_items, percent
                    )
                } else {
                    format!("{:.1}%", percent)
                };
                progress = Some(ProgressUpdate {
                    fraction: Some(percent / 100.0),
                    label,
                });
            }
        }

        LineOutcome {
            log: true,
            progress,
        }
    }

    fn observe_error_line(&mut self, line: &str) {
        let context = self.resolve_error_context(line);

        if !UNAVAILABLE_MARKERS.iter().any(|m| line.contains(m)) {
            // Transient or non-fatal warning from the tool; not a terminal
            // per-item failure.
            debug!("Tolerated ERROR line: {}", line);
            return;
        }

        self.failed.push(FailedItem {
            line: line.to_string(),
            context,
        });
        self.clear_current_target();
    }

    /// Context priority: current title, then the playlist-mapped id from the
    /// line itself, then the literal id, then "Unknown".
    fn resolve_error_context(&self, line: &str) -> String {
        if !self.current_title.is_empty() {
            return self.current_title.clone();
        }

        if let Some(caps) = ERROR_VIDEO_ID.captures(line) {
            let id = &caps[1];
            return self
                .playlist_titles
                .get(id)
                .cloned()
                .unwrap_or_else(|| format!("ID: {}", id));
        }

        "Unknown".to_string()
    }

    fn clear_current_target(&mut self) {
        if let Some(target) = self.current_target.take() {
            let mut targets = self.targets.lock().expect("active-targets lock");
            targets.remove(&target);
        }
        self.current_title.clear();
    }

    pub fn current_title(&self) -> &str {
        &self.current_title
    }

    pub fn current_target(&self) -> Option<&Path> {
        self.current_target.as_deref()
    }

    /// Drop per-item tracking at the end of a run; counters survive.
    pub fn finish(&mut self) {
        self.current_target = None;
        self.current_title.clear();
    }
}

fn file_stem_string(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn parse_percent(line: &str) -> Option<f32> {
    line.split_whitespace()
        .find(|token| token.contains('%'))
        .and_then(|token| token.replace('%', "").parse::<f32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> DownloadSession {
        DownloadSession::new(new_active_targets(), HashMap::new())
    }

    #[test]
    fn destination_then_delete_counts_one_success() {
        let mut s = session();
        s.observe_line("[download] Destination: /music/01 - Song.webm");
        {
            let targets = s.targets.lock().unwrap();
            assert!(targets.contains(&PathBuf::from("/music/01 - Song.webm")));
        }

        s.observe_line("Deleting original file /music/01 - Song.webm (pass -k to keep)");
        assert_eq!(s.successful, 1);
        assert!(s.targets.lock().unwrap().is_empty());
        assert!(s.current_title().is_empty());
    }

    #[test]
    fn title_marker_is_consumed_silently() {
        let mut s = session();
        let outcome = s.observe_line("[TITLE]My Song");
        assert!(!outcome.log);
        assert_eq!(s.current_title(), "My Song");
    }

    #[test]
    fn item_marker_updates_position_and_placeholder_title() {
        let mut s = session();
        let outcome = s.observe_line("[download] Downloading item 3 of 12");
        assert_eq!(s.item_index, 3);
        assert_eq!(s.total_items, 12);
        assert_eq!(s.current_title(), "Video #3");
        assert_eq!(
            outcome.progress.unwrap().label,
            "Video 3/12".to_string()
        );
    }

    #[test]
    fn progress_line_yields_fraction_and_label() {
        let mut s = session();
        s.observe_line("[download] Downloading item 2 of 5");
        let outcome =
            s.observe_line("[download]  45.3% of ~4.20MiB at 1.02MiB/s ETA 00:03");
        let progress = outcome.progress.expect("progress");
        assert!((progress.fraction.unwrap() - 0.453).abs() < 1e-4);
        assert_eq!(progress.label, "Video 2/5 - 45.3%");
    }

    #[test]
    fn progress_without_playlist_position_is_bare_percentage() {
        let mut s = session();
        let outcome = s.observe_line("[download]  99.9% of 3.1MiB at 500KiB/s ETA 00:01");
        assert_eq!(outcome.progress.unwrap().label, "99.9%");
    }

    #[test]
    fn unavailable_error_counts_as_failure_with_unknown_context() {
        let mut s = session();
        s.observe_line("ERROR: Private video. Sign in if you've been granted access");
        assert_eq!(s.failed.len(), 1);
        assert_eq!(s.successful, 0);
        assert_eq!(s.failed[0].context, "Unknown");
    }

    #[test]
    fn error_context_prefers_current_title() {
        let mut s = session();
        s.observe_line("[TITLE]A Known Song");
        s.observe_line("ERROR: Video unavailable");
        assert_eq!(s.failed[0].context, "A Known Song");
    }

    #[test]
    fn error_context_falls_back_to_playlist_mapping() {
        let mut titles = HashMap::new();
        titles.insert("dQw4w9WgXcQ".to_string(), "3 - Mapped Title".to_string());
        let mut s = DownloadSession::new(new_active_targets(), titles);

        s.observe_line("ERROR: [youtube] dQw4w9WgXcQ: Video unavailable");
        assert_eq!(s.failed[0].context, "3 - Mapped Title");
    }

    #[test]
    fn error_context_uses_literal_id_when_unmapped() {
        let mut s = session();
        s.observe_line("ERROR: [youtube] oHg5SJYRHA0: Private video");
        assert_eq!(s.failed[0].context, "ID: oHg5SJYRHA0");
    }

    #[test]
    fn unlisted_error_lines_are_tolerated() {
        let mut s = session();
        let outcome = s.observe_line("ERROR: unable to download video data: HTTP Error 403");
        assert!(outcome.log);
        assert!(s.failed.is_empty());
    }

    #[test]
    fn terminal_error_clears_the_active_target() {
        let mut s = session();
        s.observe_line("[download] Destination: /music/gone.webm");
        s.observe_line("ERROR: Video unavailable");
        assert!(s.targets.lock().unwrap().is_empty());
        assert_eq!(s.failed.len(), 1);
        assert_eq!(s.successful, 0);
    }

    #[test]
    fn empty_lines_are_skipped() {
        let mut s = session();
        let outcome = s.observe_line("   ");
        assert!(!outcome.log);
        assert!(outcome.progress.is_none());
    }

    #[test]
    fn flags_default_unset_and_stop_sets_both() {
        let flags = SessionFlags::new();
        assert!(!flags.cancel_requested());
        assert!(!flags.stopped());

        flags.request_stop();
        assert!(flags.cancel_requested());
        assert!(flags.stopped());

        flags.reset();
        assert!(!flags.cancel_requested());
    }
}
