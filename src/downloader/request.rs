//! Download request, immutable for the duration of one download

use crate::classify::{classify, UrlKind};
use crate::utils::error::Mp3LoaderError;
use std::path::PathBuf;

/// Everything needed to run one yt-dlp invocation.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub kind: UrlKind,
    pub dest_dir: PathBuf,
    pub use_auth: bool,
}

impl DownloadRequest {
    /// Classify a raw URL into a request, rejecting anything that matches no
    /// known YouTube shape.
    pub fn from_url(
        url: &str,
        dest_dir: PathBuf,
        use_auth: bool,
    ) -> Result<Self, Mp3LoaderError> {
        let url = url.trim();
        let kind = classify(url).ok_or_else(|| Mp3LoaderError::InvalidUrl(url.to_string()))?;
        Ok(Self {
            url: url.to_string(),
            kind,
            dest_dir,
            use_auth,
        })
    }

    /// Validate the destination before anything is spawned: create it if
    /// absent, then probe that it is actually writable.
    pub fn validate(&self) -> Result<(), Mp3LoaderError> {
        std::fs::create_dir_all(&self.dest_dir).map_err(|e| {
            Mp3LoaderError::Validation(format!(
                "could not prepare destination folder {}: {}",
                self.dest_dir.display(),
                e
            ))
        })?;

        if !self.dest_dir.is_dir() {
            return Err(Mp3LoaderError::Validation(format!(
                "destination is not a directory: {}",
                self.dest_dir.display()
            )));
        }

        let probe = self.dest_dir.join(".mp3loader-write-probe");
        std::fs::write(&probe, b"").map_err(|e| {
            Mp3LoaderError::Validation(format!(
                "destination folder is not writable: {}: {}",
                self.dest_dir.display(),
                e
            ))
        })?;
        let _ = std::fs::remove_file(&probe);

        Ok(())
    }

    /// Playlist metadata is only worth pre-fetching for playlists, or when
    /// authenticated access may reveal private playlist entries.
    pub fn wants_playlist_info(&self) -> bool {
        self.kind == UrlKind::Playlist || self.use_auth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn from_url_classifies_and_rejects() {
        let request =
            DownloadRequest::from_url("https://youtu.be/dQw4w9WgXcQ", PathBuf::from("."), false)
                .expect("valid URL");
        assert_eq!(request.kind, UrlKind::Video);

        let rejected =
            DownloadRequest::from_url("https://vimeo.com/12345", PathBuf::from("."), false);
        assert!(matches!(rejected, Err(Mp3LoaderError::InvalidUrl(_))));
    }

    #[test]
    fn validate_creates_missing_destination() {
        let temp = TempDir::new().expect("temp dir");
        let request = DownloadRequest {
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            kind: UrlKind::Video,
            dest_dir: temp.path().join("music/new"),
            use_auth: false,
        };

        request.validate().expect("validate");
        assert!(request.dest_dir.is_dir());
    }

    #[test]
    fn validate_rejects_file_as_destination() {
        let temp = TempDir::new().expect("temp dir");
        let file = temp.path().join("occupied");
        std::fs::write(&file, b"x").expect("write");

        let request = DownloadRequest {
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            kind: UrlKind::Video,
            dest_dir: file,
            use_auth: false,
        };

        assert!(matches!(
            request.validate(),
            Err(Mp3LoaderError::Validation(_))
        ));
    }

    #[test]
    fn playlist_info_wanted_for_playlists_and_auth() {
        let base = DownloadRequest {
            url: String::new(),
            kind: UrlKind::Video,
            dest_dir: PathBuf::from("."),
            use_auth: false,
        };

        assert!(!base.wants_playlist_info());

        let playlist = DownloadRequest {
            kind: UrlKind::Playlist,
            ..base.clone()
        };
        assert!(playlist.wants_playlist_info());

        let authed = DownloadRequest {
            use_auth: true,
            ..base
        };
        assert!(authed.wants_playlist_info());
    }
}
