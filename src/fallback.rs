//! Placeholder data served when real subtitles cannot be fetched

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::subtitle::SubtitleEntry;

/// Source tag for real subtitles
pub const SOURCE_REAL: &str = "youtube-transcript-api";

/// Source tag for placeholder subtitles
pub const SOURCE_SAMPLE: &str = "enhanced-sample-data";

const SAMPLE_LINES: [&str; 5] = [
    "Welcome to PolyCore",
    "Your language learning platform",
    "Practice with real YouTube videos",
    "Improve your English skills",
    "Learn new vocabulary every day",
];

/// Seconds each sample line stays on screen
const SAMPLE_LINE_SECS: f64 = 3.0;

/// Placeholder video metadata
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub published_at: String,
    pub view_count: String,
    pub like_count: String,
    pub duration: String,
    pub thumbnail: String,
}

/// Sample transcript plus metadata for one video
#[derive(Debug, Clone)]
pub struct SampleData {
    pub transcript: Vec<SubtitleEntry>,
    pub video_info: VideoInfo,
}

/// The fixed five-line sample transcript
pub fn sample_transcript() -> Vec<SubtitleEntry> {
    SAMPLE_LINES
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let start = i as f64 * SAMPLE_LINE_SECS;
            SubtitleEntry::new(start, start + SAMPLE_LINE_SECS, *text)
        })
        .collect()
}

pub fn sample_video_info(video_id: &str) -> VideoInfo {
    VideoInfo {
        title: "Sample Video Title".to_string(),
        description: "This is a sample video for testing purposes".to_string(),
        channel_title: "Sample Channel".to_string(),
        published_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        view_count: "1000".to_string(),
        like_count: "100".to_string(),
        duration: "PT15S".to_string(),
        thumbnail: format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id),
    }
}

pub fn sample_data(video_id: &str) -> SampleData {
    SampleData {
        transcript: sample_transcript(),
        video_info: sample_video_info(video_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_transcript_is_contiguous() {
        let transcript = sample_transcript();
        assert_eq!(transcript.len(), 5);
        assert_eq!(transcript[0], SubtitleEntry::new(0.0, 3.0, "Welcome to PolyCore"));
        for pair in transcript.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(transcript[4].end, 15.0);
        assert!(transcript.iter().all(|e| e.validate().is_ok()));
    }

    #[test]
    fn test_sample_video_info() {
        let info = sample_video_info("dQw4w9WgXcQ");
        assert_eq!(
            info.thumbnail,
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
        );
        assert!(chrono::DateTime::parse_from_rfc3339(&info.published_at).is_ok());

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["channelTitle"], "Sample Channel");
        assert_eq!(json["duration"], "PT15S");
    }
}
