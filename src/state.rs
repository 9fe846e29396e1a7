//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - Server configuration
//! - The subtitle fetcher and its bounded process slots
//! - In-flight acquisitions, so concurrent requests for one video share a process
//! - Metrics

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, Semaphore};

use crate::config::ServerConfig;
use crate::error::FetchError;
use crate::fetcher::{AcquisitionResult, SubtitleFetcher};
use crate::metrics::Metrics;

/// Application state shared across all handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,

    /// External subtitle fetcher
    pub fetcher: SubtitleFetcher,

    /// Limits how many extraction processes run at once
    fetch_slots: Semaphore,

    /// In-flight acquisitions: video_id -> shared cell resolving to the result
    in_flight: InFlightMap,

    /// Metrics collector
    pub metrics: Metrics,
}

/// Keeps the active-fetch gauge correct even if the request is dropped
struct ActiveFetch<'a>(&'a Metrics);

impl<'a> ActiveFetch<'a> {
    fn new(metrics: &'a Metrics) -> Self {
        metrics.fetch_started();
        Self(metrics)
    }
}

impl Drop for ActiveFetch<'_> {
    fn drop(&mut self) {
        self.0.fetch_finished();
    }
}

type InFlightMap = DashMap<String, Arc<OnceCell<AcquisitionResult>>>;

/// One request's share of an in-flight acquisition.
///
/// Dropping it removes the map entry once the result is in, or once the last
/// request waiting on an unfinished acquisition goes away (e.g. the client
/// disconnected).
struct InFlightEntry<'a> {
    map: &'a InFlightMap,
    video_id: &'a str,
    cell: Option<Arc<OnceCell<AcquisitionResult>>>,
}

impl<'a> InFlightEntry<'a> {
    fn join(map: &'a InFlightMap, video_id: &'a str) -> Self {
        let cell = map
            .entry(video_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        Self {
            map,
            video_id,
            cell: Some(cell),
        }
    }

    fn cell(&self) -> &OnceCell<AcquisitionResult> {
        match &self.cell {
            Some(cell) => cell,
            None => unreachable!("cell is only taken on drop"),
        }
    }
}

impl Drop for InFlightEntry<'_> {
    fn drop(&mut self) {
        let Some(cell) = self.cell.take() else {
            return;
        };
        if cell.initialized() {
            self.map
                .remove_if(self.video_id, |_, existing| Arc::ptr_eq(existing, &cell));
            return;
        }

        // Unfinished: only the last waiter removes it. Clones are taken under
        // the shard lock, so a count of one means nobody else holds the cell.
        let ptr = Arc::as_ptr(&cell);
        drop(cell);
        self.map.remove_if(self.video_id, |_, existing| {
            Arc::as_ptr(existing) == ptr && Arc::strong_count(existing) == 1
        });
    }
}

impl AppState {
    /// Create a new AppState with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self {
            fetcher: SubtitleFetcher::new(&config.fetcher),
            fetch_slots: Semaphore::new(config.fetcher.max_concurrent.max(1)),
            in_flight: DashMap::new(),
            metrics: Metrics::new(),
            config,
        }
    }

    /// Create AppState with default configuration
    pub fn with_defaults() -> Self {
        Self::new(ServerConfig::default())
    }

    /// Fetch subtitles for `video_id`, running the extraction program at
    /// most once for concurrent requests of the same id.
    ///
    /// Results are not kept once every waiting request has them, and a
    /// cancelled request leaves nothing behind.
    pub async fn acquire(&self, video_id: &str) -> AcquisitionResult {
        let entry = InFlightEntry::join(&self.in_flight, video_id);
        let result = entry
            .cell()
            .get_or_init(|| self.run_fetch(video_id))
            .await
            .clone();
        drop(entry);
        result
    }

    async fn run_fetch(&self, video_id: &str) -> AcquisitionResult {
        let _permit = self
            .fetch_slots
            .acquire()
            .await
            .map_err(|e| FetchError::Spawn(e.to_string()))?;
        let _active = ActiveFetch::new(&self.metrics);

        self.fetcher.fetch(video_id).await
    }

    /// Number of acquisitions currently in flight
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Free process slots
    pub fn available_fetch_slots(&self) -> usize {
        self.fetch_slots.available_permits()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::FetcherConfig;
    use std::path::PathBuf;

    /// State whose fetcher runs `script` through `sh -c`; the video id is `$1`.
    pub fn sh_state(script: &str, timeout_secs: u64, max_concurrent: usize) -> AppState {
        AppState::new(ServerConfig {
            fetcher: FetcherConfig {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), script.to_string(), "fetcher".to_string()],
                working_dir: PathBuf::from("."),
                timeout_secs,
                max_concurrent,
            },
            ..Default::default()
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::test_support::sh_state;
    use super::*;
    use std::time::Duration;

    const OK_SCRIPT: &str = r#"echo "{\"success\":true,\"subtitles\":[{\"start\":0,\"end\":1,\"text\":\"$1\"}]}""#;

    #[tokio::test]
    async fn test_acquire_success() {
        let state = sh_state(OK_SCRIPT, 10, 2);
        let transcript = state.acquire("abc").await.unwrap();

        assert_eq!(transcript.subtitles[0].text, "abc");
        assert_eq!(state.in_flight_count(), 0);
        assert_eq!(state.available_fetch_slots(), 2);
        assert_eq!(state.metrics.active_fetches(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_process() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("runs");
        let script = format!(
            "echo run >> '{}'; sleep 1; {}",
            counter.display(),
            OK_SCRIPT
        );
        let state = sh_state(&script, 10, 4);

        let (a, b) = tokio::join!(state.acquire("same"), state.acquire("same"));
        assert_eq!(a, b);
        assert!(a.is_ok());

        let runs = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(runs.lines().count(), 1);
        assert_eq!(state.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_sequential_requests_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("runs");
        let script = format!("echo run >> '{}'; {}", counter.display(), OK_SCRIPT);
        let state = sh_state(&script, 10, 4);

        state.acquire("abc").await.unwrap();
        state.acquire("abc").await.unwrap();

        let runs = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(runs.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_requests_leave_no_entries() {
        let state = sh_state("sleep 5", 10, 4);

        for i in 0..3 {
            let id = format!("vid{}", i);
            let res = tokio::time::timeout(Duration::from_millis(100), state.acquire(&id)).await;
            assert!(res.is_err());
        }
        assert_eq!(state.in_flight_count(), 0);
        assert_eq!(state.available_fetch_slots(), 4);
        assert_eq!(state.metrics.active_fetches(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_keeps_shared_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("runs");
        let script = format!(
            "echo run >> '{}'; sleep 1; {}",
            counter.display(),
            OK_SCRIPT
        );
        let state = Arc::new(sh_state(&script, 10, 4));

        let first = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { state.acquire("same").await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let res = tokio::time::timeout(Duration::from_millis(100), state.acquire("same")).await;
        assert!(res.is_err());
        assert_eq!(state.in_flight_count(), 1);

        let result = first.await.unwrap();
        assert_eq!(result.unwrap().subtitles[0].text, "same");
        assert_eq!(state.in_flight_count(), 0);

        let runs = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(runs.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_shared_too() {
        let state = sh_state("exit 1", 10, 1);
        let (a, b) = tokio::join!(state.acquire("x"), state.acquire("x"));
        assert!(matches!(a, Err(FetchError::ProcessFailed { .. })));
        assert_eq!(a, b);
    }
}
