//! Subtitle entries and transcripts
//!
//! A transcript is the ordered list of timed lines for one video, together
//! with the language the fetcher detected. Entries are validated as a whole:
//! one malformed line rejects the payload.

use serde::{Deserialize, Serialize};

/// One timed subtitle line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleEntry {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Displayed text
    pub text: String,
    /// Position reported by the fetcher, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl SubtitleEntry {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            index: None,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `position` falls inside `[start, end]`
    pub fn contains(&self, position: f64) -> bool {
        position >= self.start && position <= self.end
    }

    /// Index of the word being spoken at `position`, assuming words are
    /// spread evenly over the entry's duration.
    pub fn word_at(&self, position: f64) -> Option<usize> {
        if !self.contains(position) {
            return None;
        }
        let words = self.text.split_whitespace().count();
        if words == 0 {
            return None;
        }

        let duration = self.duration();
        let progress = if duration > 0.0 {
            (position - self.start) / duration
        } else {
            0.0
        };
        let idx = (progress * words as f64).floor() as usize;
        Some(idx.min(words - 1))
    }

    /// Check the entry's shape
    pub fn validate(&self) -> Result<(), String> {
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(format!("start {} must be a non-negative number", self.start));
        }
        if !self.end.is_finite() || self.end <= self.start {
            return Err(format!(
                "end {} must be greater than start {}",
                self.end, self.start
            ));
        }
        if self.text.trim().is_empty() {
            return Err("text must not be empty".to_string());
        }
        Ok(())
    }
}

/// A complete, validated set of subtitles for one video
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    pub subtitles: Vec<SubtitleEntry>,
    pub language: Option<String>,
    pub count: usize,
}

impl Transcript {
    /// Build a transcript, checking every entry and the reported count
    pub fn new(
        subtitles: Vec<SubtitleEntry>,
        language: Option<String>,
        count: Option<usize>,
    ) -> Result<Self, String> {
        for (i, entry) in subtitles.iter().enumerate() {
            entry
                .validate()
                .map_err(|e| format!("subtitle {}: {}", i, e))?;
        }

        let len = subtitles.len();
        if let Some(count) = count {
            if count != len {
                return Err(format!(
                    "count {} does not match {} subtitles",
                    count, len
                ));
            }
        }

        Ok(Self {
            subtitles,
            language,
            count: len,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.subtitles.is_empty()
    }

    /// Latest end time across all entries
    pub fn max_end(&self) -> Option<f64> {
        max_end(&self.subtitles)
    }
}

/// Latest end time across `entries`, `None` when empty
pub fn max_end(entries: &[SubtitleEntry]) -> Option<f64> {
    entries.iter().map(|e| e.end).reduce(f64::max)
}
