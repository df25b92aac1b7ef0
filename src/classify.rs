//! YouTube URL classification
//!
//! Pure pattern matching over human-typed URLs. No network access: a URL is
//! classified by shape alone, and anything that does not match a known shape
//! is rejected before a download is ever attempted.

use once_cell::sync::Lazy;
use regex::Regex;

/// What kind of YouTube resource a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    Video,
    Playlist,
    Short,
}

impl UrlKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlKind::Video => "Video",
            UrlKind::Playlist => "Playlist",
            UrlKind::Short => "Short",
        }
    }
}

/// Ordered patterns to validate and classify YouTube URLs.
///
/// Video ids must be exactly 11 characters; the trailing `(?:[^\w-]|$)` group
/// rejects ids that merely start with 11 valid characters. Playlist ids are 13
/// characters or longer.
static YOUTUBE_PATTERNS: Lazy<Vec<(Regex, UrlKind)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/watch\?v=([\w-]{11})(?:[^\w-]|$)")
                .expect("watch pattern"),
            UrlKind::Video,
        ),
        (
            Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/playlist\?list=([\w-]{13,})")
                .expect("playlist pattern"),
            UrlKind::Playlist,
        ),
        (
            Regex::new(r"^(?:https?://)?youtu\.be/([\w-]{11})(?:[^\w-]|$)").expect("short-link pattern"),
            UrlKind::Video,
        ),
        (
            Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/shorts/([\w-]{11})(?:[^\w-]|$)")
                .expect("shorts pattern"),
            UrlKind::Short,
        ),
    ]
});

/// Loose capture of whatever follows `v=`, used only for error diagnostics.
static WATCH_ID_LOOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"v=([\w-]+)").expect("loose watch-id pattern"));

/// Classify a YouTube URL, or return `None` if it matches no known shape.
///
/// Empty and whitespace-only input is not an error; it simply does not
/// classify.
pub fn classify(url: &str) -> Option<UrlKind> {
    let cleaned = url.trim();
    if cleaned.is_empty() {
        return None;
    }
    YOUTUBE_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(cleaned))
        .map(|(_, kind)| *kind)
}

/// Extract the raw `v=` parameter from a watch URL without validating its
/// length. Lets the UI say "wrong id length" instead of a generic rejection.
pub fn loose_watch_id(url: &str) -> Option<String> {
    WATCH_ID_LOOSE
        .captures(url)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_watch_urls() {
        assert_eq!(
            classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some(UrlKind::Video)
        );
        assert_eq!(
            classify("youtube.com/watch?v=dQw4w9WgXcQ"),
            Some(UrlKind::Video)
        );
        assert_eq!(
            classify("http://youtube.com/watch?v=abc-def_123"),
            Some(UrlKind::Video)
        );
    }

    #[test]
    fn watch_url_with_extra_params_still_classifies() {
        assert_eq!(
            classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s"),
            Some(UrlKind::Video)
        );
    }

    #[test]
    fn rejects_wrong_id_length() {
        // 10 characters
        assert_eq!(classify("https://www.youtube.com/watch?v=dQw4w9WgXc"), None);
        // 14 characters
        assert_eq!(
            classify("https://www.youtube.com/watch?v=dQw4w9WgXcQabc"),
            None
        );
    }

    #[test]
    fn classifies_playlists() {
        assert_eq!(
            classify("https://www.youtube.com/playlist?list=PLBCF2DAC6FFB574DE"),
            Some(UrlKind::Playlist)
        );
        // 12-character list id is too short
        assert_eq!(classify("https://www.youtube.com/playlist?list=PL0123456789"), None);
    }

    #[test]
    fn classifies_short_links_and_shorts() {
        assert_eq!(classify("https://youtu.be/dQw4w9WgXcQ"), Some(UrlKind::Video));
        assert_eq!(
            classify("https://www.youtube.com/shorts/dQw4w9WgXcQ"),
            Some(UrlKind::Short)
        );
        assert_eq!(classify("https://youtu.be/dQw4w9WgXcQextra"), None);
    }

    #[test]
    fn empty_and_whitespace_do_not_classify() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("   "), None);
    }

    #[test]
    fn non_youtube_urls_do_not_classify() {
        assert_eq!(classify("https://vimeo.com/12345"), None);
        assert_eq!(classify("not a url at all"), None);
    }

    #[test]
    fn loose_watch_id_captures_any_length() {
        assert_eq!(
            loose_watch_id("youtube.com/watch?v=shortid"),
            Some("shortid".to_string())
        );
        assert_eq!(loose_watch_id("youtube.com/playlist?list=x"), None);
    }
}
