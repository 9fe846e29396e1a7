//! Prometheus-compatible metrics endpoint

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::state::AppState;

/// Metrics collector
#[derive(Debug)]
pub struct Metrics {
    /// Server start time
    start_time: Instant,
    /// Requests by endpoint
    requests_by_endpoint: RwLock<HashMap<String, u64>>,
    /// Responses served with real subtitles
    real_transcripts: RwLock<u64>,
    /// Responses served with sample data
    fallbacks: RwLock<u64>,
    /// Extraction processes currently running
    active_fetches: RwLock<u64>,
    /// Fetch failures by kind
    fetch_errors: RwLock<HashMap<&'static str, u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            requests_by_endpoint: RwLock::new(HashMap::new()),
            real_transcripts: RwLock::new(0),
            fallbacks: RwLock::new(0),
            active_fetches: RwLock::new(0),
            fetch_errors: RwLock::new(HashMap::new()),
        }
    }

    pub fn record_request(&self, endpoint: &str) {
        *self
            .requests_by_endpoint
            .write()
            .entry(endpoint.to_string())
            .or_insert(0) += 1;
    }

    pub fn record_real(&self) {
        *self.real_transcripts.write() += 1;
    }

    /// Record a fallback caused by a fetch failure of the given kind
    pub fn record_fallback(&self, kind: &'static str) {
        *self.fallbacks.write() += 1;
        *self.fetch_errors.write().entry(kind).or_insert(0) += 1;
    }

    pub fn fetch_started(&self) {
        *self.active_fetches.write() += 1;
    }

    pub fn fetch_finished(&self) {
        let mut active = self.active_fetches.write();
        *active = active.saturating_sub(1);
    }

    pub fn active_fetches(&self) -> u64 {
        *self.active_fetches.read()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export metrics in Prometheus format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP polycore_uptime_seconds Server uptime in seconds\n");
        output.push_str("# TYPE polycore_uptime_seconds counter\n");
        output.push_str(&format!("polycore_uptime_seconds {}\n", self.uptime_secs()));

        output.push_str("\n# HELP polycore_requests_total Requests by endpoint\n");
        output.push_str("# TYPE polycore_requests_total counter\n");
        let mut endpoints: Vec<_> = self
            .requests_by_endpoint
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        endpoints.sort();
        for (endpoint, count) in endpoints {
            output.push_str(&format!(
                "polycore_requests_total{{endpoint=\"{}\"}} {}\n",
                endpoint, count
            ));
        }

        output.push_str("\n# HELP polycore_transcripts_total Subtitle responses by source\n");
        output.push_str("# TYPE polycore_transcripts_total counter\n");
        output.push_str(&format!(
            "polycore_transcripts_total{{source=\"real\"}} {}\n",
            *self.real_transcripts.read()
        ));
        output.push_str(&format!(
            "polycore_transcripts_total{{source=\"sample\"}} {}\n",
            *self.fallbacks.read()
        ));

        output.push_str("\n# HELP polycore_active_fetches Extraction processes running\n");
        output.push_str("# TYPE polycore_active_fetches gauge\n");
        output.push_str(&format!("polycore_active_fetches {}\n", self.active_fetches()));

        output.push_str("\n# HELP polycore_fetch_errors_total Fetch failures by kind\n");
        output.push_str("# TYPE polycore_fetch_errors_total counter\n");
        let mut errors: Vec<_> = self
            .fetch_errors
            .read()
            .iter()
            .map(|(k, v)| (*k, *v))
            .collect();
        errors.sort();
        for (kind, count) in errors {
            output.push_str(&format!(
                "polycore_fetch_errors_total{{kind=\"{}\"}} {}\n",
                kind, count
            ));
        }

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics endpoint handler
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    state.metrics.record_request("/api/metrics");
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        state.metrics.export_prometheus(),
    )
        .into_response()
}
