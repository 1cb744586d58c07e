//! Pipeline health monitoring.
//!
//! Keeps the latest [`WINDOW_SIZE`] run records and derives a
//! healthy / degraded / rollback-recommended status from them. The status is
//! advisory: nothing here disables the pipeline.

use crate::service::CapabilityGate;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use chunkwise_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const WINDOW_SIZE: usize = 100;

pub const ROLLBACK_DIRECTIVE: &str = "IMMEDIATE ROLLBACK RECOMMENDED";
pub const OPTIMIZE_RECOMMENDATION: &str = "Consider optimizing chunking algorithm or increasing resources";
pub const EXTRACTION_RECOMMENDATION: &str = "Check document parsing and chunking logic";
pub const HEALTHY_MESSAGE: &str = "Chunking pipeline is operating normally";

/// Outcome of one chunking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub document_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub timed_out: bool,
    pub timestamp: DateTime<Utc>,
}

impl RunRecord {
    pub fn success(document_id: impl Into<String>, chunk_count: usize, duration_ms: u64) -> Self {
        Self {
            document_id: document_id.into(),
            success: true,
            chunk_count: Some(chunk_count),
            duration_ms: Some(duration_ms),
            error: None,
            timed_out: false,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(document_id: impl Into<String>, error: impl Into<String>, timed_out: bool) -> Self {
        Self {
            document_id: document_id.into(),
            success: false,
            chunk_count: None,
            duration_ms: None,
            error: Some(error.into()),
            timed_out,
            timestamp: Utc::now(),
        }
    }

    pub fn from_error(document_id: impl Into<String>, error: &AppError) -> Self {
        Self::failure(document_id, error.to_string(), error.is_timeout())
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Timeout-tagged failure: flagged, or an error message mentioning a timeout.
    pub fn is_timeout(&self) -> bool {
        !self.success
            && (self.timed_out
                || self
                    .error
                    .as_deref()
                    .is_some_and(|e| e.to_lowercase().contains("timeout")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthThresholds {
    /// Percent; above this the pipeline should be rolled back
    pub max_failure_rate: f64,
    pub max_consecutive_timeouts: usize,
    pub max_timeouts_per_hour: usize,
    /// Average successful run duration ceiling
    pub max_processing_time_ms: u64,
    pub min_chunks_per_document: usize,
    /// Percent; at or above this the pipeline is degraded
    pub degraded_failure_rate: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            max_failure_rate: 5.0,
            max_consecutive_timeouts: 3,
            max_timeouts_per_hour: 5,
            max_processing_time_ms: 300_000,
            min_chunks_per_document: 1,
            degraded_failure_rate: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HealthState {
    Healthy,
    Degraded,
    RollbackRecommended,
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::RollbackRecommended => "rollback-recommended",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub state: HealthState,
    pub healthy: bool,
    pub should_rollback: bool,
    /// Percent of failed runs in the window
    pub failure_rate: f64,
    pub total_runs: usize,
    pub recent_failures: usize,
    pub recent_timeouts: usize,
    pub consecutive_timeouts: usize,
    pub timeouts_last_hour: usize,
    pub average_processing_ms: f64,
    pub empty_runs: usize,
    pub recommendations: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

pub type HealthCallback = Arc<dyn Fn(&HealthStatus) + Send + Sync>;

type Subscribers = Mutex<Vec<(u64, HealthCallback)>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle for one registered callback. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the callback"]
pub struct Subscription {
    id: u64,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            lock(&subscribers).retain(|(id, _)| *id != self.id);
        }
    }
}

/// Rolling window of run records plus the observer registry.
pub struct HealthMonitor {
    thresholds: HealthThresholds,
    window: Mutex<VecDeque<RunRecord>>,
    subscribers: Arc<Subscribers>,
    next_id: AtomicU64,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(HealthThresholds::default())
    }
}

impl HealthMonitor {
    pub fn new(thresholds: HealthThresholds) -> Self {
        Self {
            thresholds,
            window: Mutex::new(VecDeque::with_capacity(WINDOW_SIZE)),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Monitor pre-filled with the newest records, e.g. from the metrics log.
    pub fn from_records(thresholds: HealthThresholds, records: impl IntoIterator<Item = RunRecord>) -> Self {
        let monitor = Self::new(thresholds);
        for record in records {
            monitor.record_run(record);
        }
        monitor
    }

    pub fn thresholds(&self) -> &HealthThresholds {
        &self.thresholds
    }

    /// Append a record, evicting the oldest once the window is full.
    pub fn record_run(&self, record: RunRecord) {
        tracing::debug!(
            document_id = %record.document_id,
            success = record.success,
            chunk_count = ?record.chunk_count,
            duration_ms = ?record.duration_ms,
            "Recorded chunking run"
        );
        let mut window = lock(&self.window);
        window.push_back(record);
        while window.len() > WINDOW_SIZE {
            window.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.window).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Percent of failed runs in the window; 0 when empty.
    pub fn failure_rate(&self) -> f64 {
        failure_rate(&lock(&self.window))
    }

    /// The newest `count` records, oldest first.
    pub fn recent_metrics(&self, count: usize) -> Vec<RunRecord> {
        let window = lock(&self.window);
        window
            .iter()
            .skip(window.len().saturating_sub(count))
            .cloned()
            .collect()
    }

    pub fn health_status(&self) -> HealthStatus {
        self.health_status_at(Utc::now())
    }

    /// Status as of `now`; the trailing-hour timeout count is relative to it.
    pub fn health_status_at(&self, now: DateTime<Utc>) -> HealthStatus {
        let records: Vec<RunRecord> = lock(&self.window).iter().cloned().collect();
        evaluate(&records, &self.thresholds, now)
    }

    pub fn subscribe(&self, callback: HealthCallback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.subscribers).push((id, callback));
        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Compute the status and hand it to every subscriber.
    pub fn notify(&self) -> HealthStatus {
        let status = self.health_status();

        if status.should_rollback {
            tracing::error!(
                failure_rate = status.failure_rate,
                recommendations = ?status.recommendations,
                "Chunking rollback recommended"
            );
        } else if !status.healthy {
            tracing::warn!(
                state = %status.state,
                failure_rate = status.failure_rate,
                recommendations = ?status.recommendations,
                "Chunking pipeline degraded"
            );
        }

        let callbacks: Vec<HealthCallback> = lock(&self.subscribers)
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(&status);
        }

        status
    }

    /// Poll on `interval` until `shutdown` turns true. Ticks are skipped
    /// while the gate is off.
    pub fn spawn_polling(
        self: &Arc<Self>,
        interval: Duration,
        gate: Arc<dyn CapabilityGate>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!(interval_ms = interval.as_millis() as u64, "Started health monitoring");
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if gate.is_enabled() {
                            monitor.notify();
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Stopped health monitoring");
        })
    }
}

fn failure_rate(records: &VecDeque<RunRecord>) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let failures = records.iter().filter(|r| !r.success).count();
    failures as f64 / records.len() as f64 * 100.0
}

fn evaluate(records: &[RunRecord], thresholds: &HealthThresholds, now: DateTime<Utc>) -> HealthStatus {
    let total_runs = records.len();
    let recent_failures = records.iter().filter(|r| !r.success).count();
    let failure_rate = if total_runs == 0 {
        0.0
    } else {
        recent_failures as f64 / total_runs as f64 * 100.0
    };
    let recent_timeouts = records.iter().filter(|r| r.is_timeout()).count();

    // Newest first; other failures neither count nor break the streak.
    let mut consecutive_timeouts = 0;
    for record in records.iter().rev() {
        if record.success {
            break;
        }
        if record.is_timeout() {
            consecutive_timeouts += 1;
        }
    }

    let hour_ago = now - ChronoDuration::hours(1);
    let timeouts_last_hour = records
        .iter()
        .filter(|r| r.is_timeout() && r.timestamp > hour_ago)
        .count();

    let durations: Vec<u64> = records
        .iter()
        .filter(|r| r.success)
        .filter_map(|r| r.duration_ms)
        .filter(|d| *d > 0)
        .collect();
    let average_processing_ms = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<u64>() as f64 / durations.len() as f64
    };

    let empty_runs = records
        .iter()
        .filter(|r| r.success && r.chunk_count.unwrap_or(0) < thresholds.min_chunks_per_document)
        .count();

    let mut recommendations = Vec::new();
    let mut should_rollback = false;

    if failure_rate > thresholds.max_failure_rate {
        recommendations.push(format!(
            "Failure rate ({:.1}%) exceeds threshold ({}%)",
            failure_rate, thresholds.max_failure_rate
        ));
        should_rollback = true;
    }
    if consecutive_timeouts >= thresholds.max_consecutive_timeouts {
        recommendations.push(format!(
            "Consecutive timeouts ({}) exceed threshold ({})",
            consecutive_timeouts, thresholds.max_consecutive_timeouts
        ));
        should_rollback = true;
    }
    if timeouts_last_hour >= thresholds.max_timeouts_per_hour {
        recommendations.push(format!(
            "Timeouts in last hour ({}) exceed threshold ({})",
            timeouts_last_hour, thresholds.max_timeouts_per_hour
        ));
        should_rollback = true;
    }
    if average_processing_ms > thresholds.max_processing_time_ms as f64 {
        recommendations.push(format!(
            "Average processing time ({:.1}s) exceeds threshold ({:.1}s)",
            average_processing_ms / 1000.0,
            thresholds.max_processing_time_ms as f64 / 1000.0
        ));
        recommendations.push(OPTIMIZE_RECOMMENDATION.to_string());
    }
    if empty_runs > 0 {
        recommendations.push(format!("{} documents produced no chunks", empty_runs));
        recommendations.push(EXTRACTION_RECOMMENDATION.to_string());
    }
    if !should_rollback && failure_rate >= thresholds.degraded_failure_rate {
        recommendations.push(format!(
            "Failure rate ({:.1}%) is above the healthy level ({}%)",
            failure_rate, thresholds.degraded_failure_rate
        ));
    }

    let state = if should_rollback {
        recommendations.insert(0, ROLLBACK_DIRECTIVE.to_string());
        HealthState::RollbackRecommended
    } else if recommendations.is_empty() {
        recommendations.push(HEALTHY_MESSAGE.to_string());
        HealthState::Healthy
    } else {
        HealthState::Degraded
    };

    HealthStatus {
        state,
        healthy: state == HealthState::Healthy,
        should_rollback,
        failure_rate,
        total_runs,
        recent_failures,
        recent_timeouts,
        consecutive_timeouts,
        timeouts_last_hour,
        average_processing_ms,
        empty_runs,
        recommendations,
        checked_at: now,
    }
}

/// Append one record as a JSON line, creating parent directories.
pub fn append_record(path: &Path, record: &RunRecord) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", serde_json::to_string(record)?)?;
    Ok(())
}

/// Read the newest [`WINDOW_SIZE`] records. Missing file means no history;
/// malformed lines are skipped.
pub fn read_records(path: &Path) -> AppResult<Vec<RunRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path)?;
    let mut records: Vec<RunRecord> = Vec::new();
    for (line_number, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(
                path = %path.display(),
                line = line_number + 1,
                error = %e,
                "Skipping malformed metrics line"
            ),
        }
    }
    let skip = records.len().saturating_sub(WINDOW_SIZE);
    Ok(records.split_off(skip))
}
