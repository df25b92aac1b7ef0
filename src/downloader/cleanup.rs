//! Partial-file cleanup after a stopped download
//!
//! yt-dlp leaves `.part`/`.ytdl` files, fragment chunks and downloaded
//! thumbnails behind when it is killed mid-item. Every deletion here is
//! independent and best-effort: one stubborn file must not keep the rest from
//! being removed.

use crate::downloader::session::ActiveTargets;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An MP3 smaller than this is a truncated transcode, not a song.
const MIN_PLAUSIBLE_MP3_BYTES: u64 = 1024;

const SIDECAR_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];
const FRAGMENT_PREFIXES: &[&str] = &[".f", ".fragment", ".frag"];
const THUMBNAIL_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// What cleanup did, for the log view.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub deleted: usize,
    pub notes: Vec<String>,
}

/// Delete partial artifacts for every tracked in-progress target.
///
/// The target set is snapshotted under the lock, processed without it, and
/// cleared under the same lock afterwards.
pub fn cleanup_partial_files(targets: &ActiveTargets) -> CleanupReport {
    let snapshot: Vec<PathBuf> = {
        let guard = targets.lock().expect("active-targets lock");
        guard.iter().cloned().collect()
    };

    let mut report = CleanupReport::default();

    for target in &snapshot {
        if let Err(e) = cleanup_one_target(target, &mut report) {
            let name = file_name(target);
            warn!("Could not clean {}: {}", name, e);
            report.notes.push(format!("⚠ Could not clean {}: {}", name, e));
        }
    }

    {
        let mut guard = targets.lock().expect("active-targets lock");
        for target in &snapshot {
            guard.remove(target);
        }
    }

    if report.deleted > 0 {
        report
            .notes
            .push(format!("✓ {} partial file(s) deleted", report.deleted));
    } else {
        report
            .notes
            .push("ℹ No partial files found to delete".to_string());
    }

    report
}

fn cleanup_one_target(target: &Path, report: &mut CleanupReport) -> std::io::Result<()> {
    let base = target.with_extension("");

    // The target itself plus the sidecar files yt-dlp writes next to it
    let mut candidates: BTreeSet<PathBuf> = BTreeSet::new();
    candidates.insert(target.to_path_buf());
    for suffix in SIDECAR_SUFFIXES {
        candidates.insert(with_appended_suffix(target, suffix));
    }

    for candidate in &candidates {
        delete_if_file(candidate, "partial file", report);
    }

    // Fragment chunks share the target's stem with an .f* style infix
    for chunk in fragment_chunks(&base)? {
        delete_if_file(&chunk, "residual chunk", report);
    }

    for ext in THUMBNAIL_EXTENSIONS {
        delete_if_file(&base.with_extension(ext), "residual thumbnail", report);
    }

    // A same-named tiny MP3 is a truncated transcode
    let mp3 = base.with_extension("mp3");
    if let Ok(metadata) = std::fs::metadata(&mp3) {
        if metadata.is_file() && metadata.len() < MIN_PLAUSIBLE_MP3_BYTES {
            delete_if_file(&mp3, "incomplete MP3", report);
        }
    }

    Ok(())
}

/// Files in the target's directory whose name starts with `<stem>.f`,
/// `<stem>.fragment` or `<stem>.frag`.
fn fragment_chunks(base: &Path) -> std::io::Result<Vec<PathBuf>> {
    let dir = match base.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return Ok(Vec::new()),
    };
    let stem = match base.file_name() {
        Some(name) => name.to_string_lossy().to_string(),
        None => return Ok(Vec::new()),
    };

    let mut chunks = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        let matches = FRAGMENT_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(&format!("{}{}", stem, prefix)));
        if matches {
            chunks.push(entry.path());
        }
    }
    Ok(chunks)
}

fn delete_if_file(candidate: &Path, what: &str, report: &mut CleanupReport) {
    if !candidate.is_file() {
        return;
    }
    match std::fs::remove_file(candidate) {
        Ok(()) => {
            debug!("Deleted {}: {}", what, candidate.display());
            report
                .notes
                .push(format!("🗑 Deleted {}: {}", what, file_name(candidate)));
            report.deleted += 1;
        }
        Err(e) => {
            warn!("Failed to delete {} {}: {}", what, candidate.display(), e);
            report
                .notes
                .push(format!("⚠ Could not delete {}: {}", file_name(candidate), e));
        }
    }
}

fn with_appended_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::session::new_active_targets;
    use tempfile::TempDir;

    fn track(targets: &ActiveTargets, path: &Path) {
        targets.lock().unwrap().insert(path.to_path_buf());
    }

    #[test]
    fn deletes_target_and_sidecars() {
        let temp = TempDir::new().expect("temp dir");
        let target = temp.path().join("song.webm");
        std::fs::write(&target, b"data").unwrap();
        std::fs::write(temp.path().join("song.webm.part"), b"data").unwrap();
        std::fs::write(temp.path().join("song.webm.ytdl"), b"data").unwrap();

        let targets = new_active_targets();
        track(&targets, &target);

        let report = cleanup_partial_files(&targets);
        assert_eq!(report.deleted, 3);
        assert!(!target.exists());
        assert!(targets.lock().unwrap().is_empty());
    }

    #[test]
    fn deletes_fragment_chunks_and_thumbnails() {
        let temp = TempDir::new().expect("temp dir");
        let target = temp.path().join("song.webm");
        std::fs::write(temp.path().join("song.f137.mp4"), b"x").unwrap();
        std::fs::write(temp.path().join("song.fragment1"), b"x").unwrap();
        std::fs::write(temp.path().join("song.jpg"), b"x").unwrap();
        std::fs::write(temp.path().join("unrelated.jpg"), b"x").unwrap();

        let targets = new_active_targets();
        track(&targets, &target);

        let report = cleanup_partial_files(&targets);
        assert_eq!(report.deleted, 3);
        assert!(temp.path().join("unrelated.jpg").exists());
    }

    #[test]
    fn tiny_mp3_is_deleted_plausible_mp3_is_kept() {
        let temp = TempDir::new().expect("temp dir");

        let small_target = temp.path().join("small.webm");
        std::fs::write(temp.path().join("small.mp3"), vec![0u8; 500]).unwrap();

        let big_target = temp.path().join("big.webm");
        std::fs::write(temp.path().join("big.mp3"), vec![0u8; 5000]).unwrap();

        let targets = new_active_targets();
        track(&targets, &small_target);
        track(&targets, &big_target);

        let report = cleanup_partial_files(&targets);
        assert_eq!(report.deleted, 1);
        assert!(!temp.path().join("small.mp3").exists());
        assert!(temp.path().join("big.mp3").exists());
    }

    #[test]
    fn nothing_to_clean_is_reported_explicitly() {
        let targets = new_active_targets();
        let report = cleanup_partial_files(&targets);
        assert_eq!(report.deleted, 0);
        assert!(report
            .notes
            .iter()
            .any(|n| n.contains("No partial files")));
    }

    #[test]
    fn missing_directory_does_not_abort_other_targets() {
        let temp = TempDir::new().expect("temp dir");
        let ghost = temp.path().join("no-such-dir/ghost.webm");
        let real = temp.path().join("real.webm");
        std::fs::write(&real, b"data").unwrap();

        let targets = new_active_targets();
        track(&targets, &ghost);
        track(&targets, &real);

        let report = cleanup_partial_files(&targets);
        assert_eq!(report.deleted, 1);
        assert!(!real.exists());
        assert!(targets.lock().unwrap().is_empty());
    }
}
