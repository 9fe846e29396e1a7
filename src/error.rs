use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;
use thiserror::Error;

/// Main error type for the API server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Video ID is required")]
    MissingVideoId,

    #[error("Could not find a YouTube video ID in {0:?}")]
    InvalidVideoUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single subtitle acquisition attempt failed.
///
/// These never reach the end user as an error; the subtitles handler
/// substitutes sample data and reports the message as a diagnostic note.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("missing video identifier")]
    MissingVideoId,

    #[error("failed to start subtitle fetcher: {0}")]
    Spawn(String),

    #[error("subtitle fetcher timeout after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("subtitle fetcher failed ({status}): {stderr}")]
    ProcessFailed { status: String, stderr: String },

    #[error("no JSON output from subtitle fetcher")]
    NoJson,

    #[error("error parsing subtitle fetcher output: {0}")]
    Parse(String),

    #[error("invalid subtitle payload: {0}")]
    Invalid(String),

    #[error("subtitle fetcher reported failure: {0}")]
    Reported(String),

    #[error("IO error while reading subtitle fetcher output: {0}")]
    Io(String),
}

impl FetchError {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::MissingVideoId => "missing_video_id",
            FetchError::Spawn(_) => "spawn",
            FetchError::Timeout(_) => "timeout",
            FetchError::ProcessFailed { .. } => "process_failed",
            FetchError::NoJson => "no_json",
            FetchError::Parse(_) => "parse",
            FetchError::Invalid(_) => "invalid",
            FetchError::Reported(_) => "reported",
            FetchError::Io(_) => "io",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match self {
            ServerError::MissingVideoId | ServerError::InvalidVideoUrl(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_mentions_timeout() {
        let err = FetchError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "subtitle fetcher timeout after 30s");
        assert_eq!(err.kind(), "timeout");
    }

    #[test]
    fn test_process_failed_message() {
        let err = FetchError::ProcessFailed {
            status: "exit code 1".to_string(),
            stderr: "boom".to_string(),
        };
        assert!(err.to_string().contains("exit code 1"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServerError::MissingVideoId.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::InvalidVideoUrl("nope".into())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::Internal("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
