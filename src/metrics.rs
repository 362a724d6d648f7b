/// Per-stage counters for the export pipeline
///
/// Tracks successes, failures and timings for each stage (`locate`, `fetch`,
/// `ocr`, `translate`, `chapter`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMetrics {
    pub stage: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub average_duration_ms: f64,
    pub total_duration_ms: u64,
    pub timeout_count: u64,
}

impl StageMetrics {
    pub fn new(stage: String) -> Self {
        Self {
            stage,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            last_success: None,
            last_failure: None,
            last_error: None,
            average_duration_ms: 0.0,
            total_duration_ms: 0,
            timeout_count: 0,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.successful_requests as f64 / self.total_requests as f64) * 100.0
        }
    }

    pub fn record_success(&mut self, duration: Duration) {
        self.total_requests += 1;
        self.successful_requests += 1;
        self.last_success = Some(Utc::now());

        self.total_duration_ms += duration.as_millis() as u64;
        self.average_duration_ms =
            self.total_duration_ms as f64 / self.successful_requests as f64;
    }

    pub fn record_failure(&mut self, error: String) {
        self.total_requests += 1;
        self.failed_requests += 1;
        self.last_failure = Some(Utc::now());
        if error.to_lowercase().contains("timeout") || error.to_lowercase().contains("timed out") {
            self.timeout_count += 1;
        }
        self.last_error = Some(error);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub stages: Vec<StageMetrics>,
    pub total_failures: u64,
}

/// Thread-safe metrics shared by every request
#[derive(Clone, Default)]
pub struct MetricsTracker {
    metrics: Arc<Mutex<HashMap<String, StageMetrics>>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_stage<F: FnOnce(&mut StageMetrics)>(&self, stage: &str, f: F) {
        // A poisoned lock only means a panic mid-update; the counters are still usable
        let mut metrics = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        let entry = metrics
            .entry(stage.to_string())
            .or_insert_with(|| StageMetrics::new(stage.to_string()));
        f(entry);
    }

    pub fn record_success(&self, stage: &str, duration: Duration) {
        self.with_stage(stage, |m| {
            m.record_success(duration);
            log::debug!(
                "[{}] ok in {}ms - success rate {:.2}%",
                stage,
                duration.as_millis(),
                m.success_rate()
            );
        });
    }

    pub fn record_failure(&self, stage: &str, error: String) {
        self.with_stage(stage, |m| {
            m.record_failure(error);
            log::debug!("[{}] failure - success rate {:.2}%", stage, m.success_rate());
        });
    }

    pub fn get_metrics(&self, stage: &str) -> Option<StageMetrics> {
        let metrics = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        metrics.get(stage).cloned()
    }

    pub fn summary(&self) -> MetricsSummary {
        let metrics = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        let mut stages: Vec<StageMetrics> = metrics.values().cloned().collect();
        stages.sort_by(|a, b| a.stage.cmp(&b.stage));
        let total_failures = stages.iter().map(|s| s.failed_requests).sum();
        MetricsSummary {
            stages,
            total_failures,
        }
    }
}
