//! Playlist metadata pre-fetch
//!
//! A short flat-playlist listing run before the main download, used only to
//! turn bare video ids into readable titles in error summaries. Failure or
//! timeout here is non-fatal; it just degrades error context later.

use crate::downloader::command;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, warn};

/// The listing run gets a hard deadline; the main download does not.
const INFO_TIMEOUT: Duration = Duration::from_secs(60);

/// Fetch an id -> title mapping for a playlist URL.
pub async fn fetch_titles(
    ytdlp: &Path,
    url: &str,
    use_auth: bool,
) -> Result<HashMap<String, String>, String> {
    fetch_titles_with_timeout(ytdlp, url, use_auth, INFO_TIMEOUT).await
}

async fn fetch_titles_with_timeout(
    ytdlp: &Path,
    url: &str,
    use_auth: bool,
    deadline: Duration,
) -> Result<HashMap<String, String>, String> {
    let args = command::playlist_info_args(url, use_auth);
    let mut cmd = command::build(ytdlp, &args);
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::null());
    // On timeout the output future is dropped; the child must die with it
    cmd.kill_on_drop(true);

    debug!("Fetching playlist info for {}", url);

    let output = match tokio::time::timeout(deadline, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(format!("could not run yt-dlp: {}", e)),
        Err(_) => {
            warn!("Playlist info fetch timed out after {:?}", deadline);
            return Err("playlist listing timed out".to_string());
        }
    };

    if !output.status.success() {
        return Err(format!(
            "playlist listing exited with {:?}",
            output.status.code()
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_listing(&stdout))
}

/// Parse `id:::index - title` lines printed by the flat-playlist run.
pub fn parse_listing(stdout: &str) -> HashMap<String, String> {
    let mut titles = HashMap::new();
    for line in stdout.lines() {
        if let Some((id, title)) = line.split_once(":::") {
            let id = id.trim();
            let title = title.trim();
            if !id.is_empty() {
                titles.insert(id.to_string(), title.to_string());
            }
        }
    }
    titles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_indexed_titles() {
        let stdout = "dQw4w9WgXcQ:::1 - Never Gonna Give You Up\n\
                      oHg5SJYRHA0:::2 - Some Other Song\n";
        let titles = parse_listing(stdout);
        assert_eq!(titles.len(), 2);
        assert_eq!(
            titles.get("dQw4w9WgXcQ").map(String::as_str),
            Some("1 - Never Gonna Give You Up")
        );
    }

    #[test]
    fn skips_lines_without_separator() {
        let stdout = "WARNING: something\nabc123def45:::Title Only\n";
        let titles = parse_listing(stdout);
        assert_eq!(titles.len(), 1);
        assert_eq!(titles.get("abc123def45").map(String::as_str), Some("Title Only"));
    }

    #[test]
    fn title_containing_separator_is_kept_whole() {
        let stdout = "abc123def45:::Weird ::: Title\n";
        let titles = parse_listing(stdout);
        assert_eq!(
            titles.get("abc123def45").map(String::as_str),
            Some("Weird ::: Title")
        );
    }

    #[test]
    fn empty_output_yields_empty_map() {
        assert!(parse_listing("").is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timed_out_listing_kills_the_child() {
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        let temp = TempDir::new().expect("temp dir");
        let fake = temp.path().join("fake-yt-dlp");
        let marker = temp.path().join("survived");
        std::fs::write(
            &fake,
            format!("#!/bin/sh\nsleep 2\ntouch '{}'\n", marker.display()),
        )
        .expect("write script");
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");

        let result = fetch_titles_with_timeout(
            &fake,
            "https://www.youtube.com/playlist?list=PLBCF2DAC6FFB574DE",
            false,
            Duration::from_millis(200),
        )
        .await;
        assert_eq!(result.unwrap_err(), "playlist listing timed out");

        // A surviving child would create the marker at the 2 s mark
        tokio::time::sleep(Duration::from_millis(2300)).await;
        assert!(!marker.exists());
    }
}
