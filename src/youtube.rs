//! YouTube video identifier extraction

use regex::Regex;
use std::sync::OnceLock;

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?|shorts)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#,
        )
        .expect("video id pattern is valid")
    })
}

/// Pull the 11-character video id out of a YouTube URL.
///
/// Handles `watch?v=`, `youtu.be/`, `embed/`, `v/` and `shorts/` forms.
pub fn extract_video_id(url: &str) -> Option<String> {
    video_id_regex()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_short_forms() {
        for url in [
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
        ] {
            assert_eq!(extract_video_id(url), Some("dQw4w9WgXcQ".to_string()), "{}", url);
        }
    }

    #[test]
    fn test_not_youtube() {
        assert_eq!(extract_video_id("https://example.com/watch?v=dQw4w9WgXcQ"), None);
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
        assert_eq!(extract_video_id(""), None);
    }
}
