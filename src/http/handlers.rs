use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Result, ServerError};
use crate::fallback::{self, VideoInfo, SOURCE_REAL, SOURCE_SAMPLE};
use crate::state::AppState;
use crate::subtitle::SubtitleEntry;
use crate::youtube::extract_video_id;

/// Query string for `/api/subtitles`
#[derive(Debug, Default, Deserialize)]
pub struct SubtitleQuery {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
    /// Full YouTube URL, used when `videoId` is absent
    pub url: Option<String>,
}

impl SubtitleQuery {
    /// Resolve the video id from `videoId`, or failing that from `url`
    pub fn resolve(&self) -> Result<String> {
        if let Some(id) = self.video_id.as_deref().map(str::trim) {
            if !id.is_empty() {
                return Ok(id.to_string());
            }
        }

        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => {
                extract_video_id(url).ok_or_else(|| ServerError::InvalidVideoUrl(url.to_string()))
            }
            _ => Err(ServerError::MissingVideoId),
        }
    }
}

/// Successful `/api/subtitles` body, real or sample
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleResponse {
    pub success: bool,
    pub transcript: Vec<SubtitleEntry>,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_info: Option<VideoInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    state.metrics.record_request("/api/health");
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "OK",
            "message": "PolyCore YouTube API is running",
        })),
    )
}

/// Subtitles endpoint.
///
/// Real subtitles when the fetcher succeeds, otherwise the sample
/// transcript with a note carrying the failure reason.
pub async fn subtitles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SubtitleQuery>,
) -> Result<Json<SubtitleResponse>> {
    state.metrics.record_request("/api/subtitles");

    let video_id = query.resolve()?;
    tracing::info!("Subtitles requested for {}", video_id);

    let response = match state.acquire(&video_id).await {
        Ok(transcript) => {
            state.metrics.record_real();
            SubtitleResponse {
                success: true,
                count: Some(transcript.count),
                transcript: transcript.subtitles,
                source: SOURCE_REAL,
                language: transcript.language,
                video_info: None,
                note: None,
            }
        }
        Err(e) => {
            tracing::warn!("Subtitle fetch for {} failed, using sample data: {}", video_id, e);
            state.metrics.record_fallback(e.kind());
            let sample = fallback::sample_data(&video_id);
            SubtitleResponse {
                success: true,
                transcript: sample.transcript,
                source: SOURCE_SAMPLE,
                language: None,
                count: None,
                video_info: Some(sample.video_info),
                note: Some(format!(
                    "Using sample data because the subtitle fetcher failed: {}",
                    e
                )),
            }
        }
    };

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_video_id() {
        let q = SubtitleQuery {
            video_id: Some(" abc ".into()),
            url: Some("https://youtu.be/dQw4w9WgXcQ".into()),
        };
        assert_eq!(q.resolve().unwrap(), "abc");
    }

    #[test]
    fn test_resolve_from_url() {
        let q = SubtitleQuery {
            video_id: Some(String::new()),
            url: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".into()),
        };
        assert_eq!(q.resolve().unwrap(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_resolve_missing() {
        assert!(matches!(
            SubtitleQuery::default().resolve(),
            Err(ServerError::MissingVideoId)
        ));
        let q = SubtitleQuery {
            video_id: None,
            url: Some("https://example.com".into()),
        };
        assert!(matches!(q.resolve(), Err(ServerError::InvalidVideoUrl(_))));
    }
}
