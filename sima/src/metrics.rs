//! In-memory request metrics.
//!
//! A bounded ring buffer of recent request timings, used purely for
//! observability (the `/api/metrics` endpoint); nothing here affects
//! request correctness. Samples are dropped from the tail once the buffer
//! is full.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use utoipa::ToSchema;

use crate::AppState;

/// Maximum retained samples.
const CAPACITY: usize = 1000;

/// Requests slower than this are logged as warnings.
const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RequestSample {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Metrics {
    samples: Mutex<VecDeque<RequestSample>>,
}

impl Metrics {
    pub fn record(&self, sample: RequestSample) {
        let mut samples = self.samples.lock().expect("metrics lock");
        samples.push_front(sample);
        if samples.len() > CAPACITY {
            samples.pop_back();
        }
    }

    /// Aggregate the samples recorded within the given window.
    pub fn summary(&self, window: chrono::Duration) -> MetricsSummary {
        let cutoff = Utc::now() - window;
        let samples = self.samples.lock().expect("metrics lock");
        let recent: Vec<&RequestSample> = samples.iter().take_while(|s| s.timestamp > cutoff).collect();

        let total = recent.len() as u64;
        let average_response_ms = if total > 0 {
            recent.iter().map(|s| s.duration_ms).sum::<u64>() / total
        } else {
            0
        };
        let slow_requests = recent
            .iter()
            .filter(|s| s.duration_ms > SLOW_REQUEST_THRESHOLD.as_millis() as u64)
            .count() as u64;
        let errors = recent.iter().filter(|s| s.status >= 400).count() as u64;
        let error_rate_percent = if total > 0 { errors * 100 / total } else { 0 };

        let mut by_status: BTreeMap<String, u64> = BTreeMap::new();
        for sample in &recent {
            *by_status.entry(sample.status.to_string()).or_default() += 1;
        }

        MetricsSummary {
            total,
            average_response_ms,
            slow_requests,
            error_rate_percent,
            by_status,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MetricsSummary {
    pub total: u64,
    pub average_response_ms: u64,
    pub slow_requests: u64,
    pub error_rate_percent: u64,
    pub by_status: BTreeMap<String, u64>,
}

/// Middleware recording one sample per request.
pub async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    if elapsed > SLOW_REQUEST_THRESHOLD {
        tracing::warn!(%method, %path, duration_ms = elapsed.as_millis() as u64, "slow request");
    }

    state.metrics.record(RequestSample {
        method,
        path,
        status: response.status().as_u16(),
        duration_ms: elapsed.as_millis() as u64,
        timestamp: Utc::now(),
    });

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: u16, duration_ms: u64) -> RequestSample {
        RequestSample {
            method: "GET".to_string(),
            path: "/api/personas".to_string(),
            status,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn summary_aggregates_recent_samples() {
        let metrics = Metrics::default();
        metrics.record(sample(200, 10));
        metrics.record(sample(200, 30));
        metrics.record(sample(404, 2000));

        let summary = metrics.summary(chrono::Duration::minutes(30));
        assert_eq!(summary.total, 3);
        assert_eq!(summary.average_response_ms, 680);
        assert_eq!(summary.slow_requests, 1);
        assert_eq!(summary.error_rate_percent, 33);
        assert_eq!(summary.by_status.get("200"), Some(&2));
        assert_eq!(summary.by_status.get("404"), Some(&1));
    }

    #[test]
    fn buffer_is_bounded() {
        let metrics = Metrics::default();
        for _ in 0..(CAPACITY + 100) {
            metrics.record(sample(200, 1));
        }
        let summary = metrics.summary(chrono::Duration::minutes(30));
        assert_eq!(summary.total, CAPACITY as u64);
    }
}
