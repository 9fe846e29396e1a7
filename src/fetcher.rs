//! Subtitle acquisition through an external extraction program
//!
//! The program is started with the video identifier as its last argument
//! and is expected to print a JSON object somewhere on stdout:
//!
//! ```text
//! [INFO] fetching subtitles...
//! {"success": true, "subtitles": [...], "language": "en", "count": 12}
//! ```
//!
//! Anything around the object is ignored. Every failure is returned as a
//! [`FetchError`] so the caller can decide on a fallback.

use serde::Deserialize;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::config::FetcherConfig;
use crate::error::FetchError;
use crate::subtitle::{SubtitleEntry, Transcript};

/// Outcome of one acquisition attempt
pub type AcquisitionResult = std::result::Result<Transcript, FetchError>;

/// Runs the external subtitle extraction program
#[derive(Debug, Clone)]
pub struct SubtitleFetcher {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    timeout: Duration,
}

/// Raw payload printed by the extraction program
#[derive(Debug, Deserialize)]
struct FetcherOutput {
    success: bool,
    #[serde(default)]
    subtitles: Option<Vec<SubtitleEntry>>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    error: Option<String>,
}

impl SubtitleFetcher {
    pub fn new(config: &FetcherConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            working_dir: config.working_dir.clone(),
            timeout: config.timeout(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch subtitles for `video_id`.
    ///
    /// The process is killed if it runs longer than the configured timeout.
    pub async fn fetch(&self, video_id: &str) -> AcquisitionResult {
        if video_id.trim().is_empty() {
            return Err(FetchError::MissingVideoId);
        }

        tracing::info!(
            "Running subtitle fetcher: {} {:?} {} (cwd {})",
            self.program,
            self.args,
            video_id,
            self.working_dir.display()
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(video_id)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::warn!("Failed to start subtitle fetcher {}: {}", self.program, e);
                FetchError::Spawn(e.to_string())
            })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::Io("stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| FetchError::Io("stderr not captured".to_string()))?;

        let collect = async {
            let mut out = Vec::new();
            let mut err = Vec::new();
            let (read_out, read_err, status) = tokio::join!(
                stdout.read_to_end(&mut out),
                stderr.read_to_end(&mut err),
                child.wait(),
            );
            read_out?;
            read_err?;
            Ok::<_, std::io::Error>((status?, out, err))
        };
        let outcome = tokio::time::timeout(self.timeout, collect).await;

        let (status, out, err) = match outcome {
            Ok(Ok(collected)) => collected,
            Ok(Err(e)) => return Err(FetchError::Io(e.to_string())),
            Err(_) => {
                tracing::warn!(
                    "Subtitle fetcher for {} timed out after {:?}, killing it",
                    video_id,
                    self.timeout
                );
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill subtitle fetcher: {}", e);
                }
                return Err(FetchError::Timeout(self.timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&out);
        let stderr = String::from_utf8_lossy(&err);
        tracing::debug!("Subtitle fetcher exited with {}", status);
        tracing::debug!("Subtitle fetcher stdout: {}", stdout);
        if !stderr.is_empty() {
            tracing::debug!("Subtitle fetcher stderr: {}", stderr);
        }

        if !status.success() || stdout.trim().is_empty() {
            let stderr = stderr.trim();
            return Err(FetchError::ProcessFailed {
                status: describe_status(status),
                stderr: if stderr.is_empty() {
                    "no error output".to_string()
                } else {
                    stderr.to_string()
                },
            });
        }

        let transcript = parse_output(&stdout)?;
        tracing::info!(
            "Fetched {} subtitles for {} (language {:?})",
            transcript.count,
            video_id,
            transcript.language
        );
        Ok(transcript)
    }
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Locate the JSON object in the program's output: everything from the
/// first `{` to the last `}`.
pub fn extract_json_span(output: &str) -> Option<&str> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    (end > start).then(|| &output[start..=end])
}

/// Parse and validate the program's stdout
pub fn parse_output(output: &str) -> AcquisitionResult {
    let json = extract_json_span(output).ok_or(FetchError::NoJson)?;
    let payload: FetcherOutput =
        serde_json::from_str(json).map_err(|e| FetchError::Parse(e.to_string()))?;

    if !payload.success {
        return Err(FetchError::Reported(
            payload
                .error
                .unwrap_or_else(|| "unknown error".to_string()),
        ));
    }

    let subtitles = payload
        .subtitles
        .ok_or_else(|| FetchError::Invalid("missing subtitles list".to_string()))?;

    Transcript::new(subtitles, payload.language, payload.count).map_err(FetchError::Invalid)
}
