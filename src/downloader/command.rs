//! yt-dlp command construction
//!
//! All format knowledge lives in the external tool; this module only decides
//! which flags to pass. The flag set is part of the output-scraping contract:
//! `--newline` keeps progress lines parseable, `--ignore-errors` keeps a
//! playlist going past unavailable entries.

use crate::downloader::request::DownloadRequest;
use std::path::Path;
use tokio::process::Command;

/// Output template: optional playlist index prefix, then the title.
const OUTPUT_TEMPLATE: &str = "%(playlist_index|)s%(playlist_index& - |)s%(title)s.%(ext)s";

/// Browser whose cookie jar backs `--cookies-from-browser`.
const COOKIE_BROWSER: &str = "firefox";

/// Build the argv (minus the program itself) for the main download run.
pub fn download_args(request: &DownloadRequest) -> Vec<String> {
    let output_template = request
        .dest_dir
        .join(OUTPUT_TEMPLATE)
        .to_string_lossy()
        .to_string();

    let mut args: Vec<String> = [
        "-x",
        "--audio-format",
        "mp3",
        "--audio-quality",
        "320k",
        "--postprocessor-args",
        "ffmpeg:-b:a 320k",
        "--embed-thumbnail",
        "--add-metadata",
        "--yes-playlist",
        "--ignore-errors",
        "--newline",
        "-o",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(output_template);

    if request.use_auth {
        args.push("--cookies-from-browser".to_string());
        args.push(COOKIE_BROWSER.to_string());
    }

    args.push(request.url.clone());
    args
}

/// Build the argv for the flat-playlist metadata pre-fetch.
pub fn playlist_info_args(url: &str, use_auth: bool) -> Vec<String> {
    let mut args = vec![
        "--flat-playlist".to_string(),
        "--print".to_string(),
        "%(id)s:::%(playlist_index|)s%(playlist_index& - |)s%(title)s".to_string(),
    ];

    if use_auth {
        args.push("--cookies-from-browser".to_string());
        args.push(COOKIE_BROWSER.to_string());
    }

    args.push(url.to_string());
    args
}

/// Turn an argv into a runnable command.
pub fn build(ytdlp: &Path, args: &[String]) -> Command {
    let mut cmd = Command::new(ytdlp);
    cmd.args(args);
    cmd
}

/// Human-readable rendition of the command for the log view.
pub fn display(ytdlp: &Path, args: &[String]) -> String {
    let mut parts = vec![ytdlp.to_string_lossy().to_string()];
    parts.extend(args.iter().cloned());
    parts.join(" ")
}
