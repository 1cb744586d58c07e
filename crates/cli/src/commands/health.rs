//! Health command handler.
//!
//! Evaluates the recorded run metrics and optionally keeps watching them.

use chunkwise_core::{config::AppConfig, AppResult};
use chunkwise_pipeline::monitor::{self, HealthMonitor, HealthStatus, HealthThresholds};
use chunkwise_pipeline::{CapabilityGate, FeatureFlag, CHUNKING_FLAG};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Show pipeline health from recorded runs
#[derive(Args, Debug)]
pub struct HealthCommand {
    /// Keep polling and print every status
    #[arg(long)]
    pub watch: bool,

    /// Polling interval in seconds (default: monitor.intervalSecs)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Number of recent runs to list
    #[arg(long, default_value = "0")]
    pub recent: usize,

    /// Failure rate (percent) above which rollback is recommended
    #[arg(long)]
    pub max_failure_rate: Option<f64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit with an error when rollback is recommended
    #[arg(long)]
    pub strict: bool,
}

impl HealthCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing health command");

        let mut thresholds = HealthThresholds::default();
        if let Some(rate) = self.max_failure_rate {
            thresholds.max_failure_rate = rate;
        }

        let metrics_path = config.metrics_path();
        let records = monitor::read_records(&metrics_path)?;
        tracing::debug!("Loaded {} run records from {:?}", records.len(), metrics_path);
        let monitor = Arc::new(HealthMonitor::from_records(thresholds, records));

        if self.watch {
            let interval = Duration::from_secs(self.interval.unwrap_or(config.monitor_interval_secs).max(1));
            let gate = Arc::new(FeatureFlag::new(CHUNKING_FLAG, config.chunking_enabled));
            return self.watch(monitor, gate, &metrics_path, interval).await;
        }

        let status = monitor.health_status();
        self.print_status(&status)?;

        if self.recent > 0 {
            for record in monitor.recent_metrics(self.recent) {
                let outcome = match (&record.error, record.success) {
                    (_, true) => format!("ok, {} chunks", record.chunk_count.unwrap_or(0)),
                    (Some(error), false) => format!("failed: {}", error),
                    (None, false) => "failed".to_string(),
                };
                println!("  {} {} ({})", record.timestamp.to_rfc3339(), record.document_id, outcome);
            }
        }

        if self.strict && status.should_rollback {
            return Err(chunkwise_core::AppError::Other(
                monitor::ROLLBACK_DIRECTIVE.to_string(),
            ));
        }
        Ok(())
    }

    fn print_status(&self, status: &HealthStatus) -> AppResult<()> {
        if self.json {
            println!("{}", serde_json::to_string(status)?);
            return Ok(());
        }

        println!("Status: {}", status.state);
        println!(
            "  Runs: {} ({} failed, {:.1}% failure rate)",
            status.total_runs, status.recent_failures, status.failure_rate
        );
        println!(
            "  Timeouts: {} total, {} consecutive, {} in the last hour",
            status.recent_timeouts, status.consecutive_timeouts, status.timeouts_last_hour
        );
        println!("  Average processing: {:.0}ms", status.average_processing_ms);
        for recommendation in &status.recommendations {
            println!("  - {}", recommendation);
        }
        Ok(())
    }

    /// Poll until Ctrl-C. New lines in the metrics log are fed to the monitor
    /// before each check.
    async fn watch(
        &self,
        monitor: Arc<HealthMonitor>,
        gate: Arc<dyn CapabilityGate>,
        metrics_path: &Path,
        interval: Duration,
    ) -> AppResult<()> {
        let json = self.json;
        let _subscription = monitor.subscribe(Arc::new(move |status: &HealthStatus| {
            if json {
                match serde_json::to_string(status) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Failed to serialize health status: {}", e),
                }
            } else {
                println!(
                    "[{}] {} ({:.1}% failures over {} runs)",
                    status.checked_at.format("%H:%M:%S"),
                    status.state,
                    status.failure_rate,
                    status.total_runs
                );
            }
        }));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller = monitor.spawn_polling(interval, gate, shutdown_rx.clone());

        let refresher = {
            let monitor = Arc::clone(&monitor);
            let path = metrics_path.to_path_buf();
            let mut shutdown = shutdown_rx;
            let mut seen = monitor
                .recent_metrics(1)
                .first()
                .map(|r| r.timestamp);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            match monitor::read_records(&path) {
                                Ok(records) => {
                                    for record in records {
                                        if seen.is_some_and(|last| record.timestamp <= last) {
                                            continue;
                                        }
                                        seen = Some(record.timestamp);
                                        monitor.record_run(record);
                                    }
                                }
                                Err(e) => tracing::warn!("Failed to read metrics log: {}", e),
                            }
                        }
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                break;
                            }
                        }
                    }
                }
            })
        };

        tokio::signal::ctrl_c().await?;
        tracing::info!("Stopping health watch");
        // Receivers may already be gone if both tasks exited
        let _ = shutdown_tx.send(true);
        let _ = tokio::join!(poller, refresher);
        Ok(())
    }
}
