//! The chunking service: capability gate, run recording, timeouts and
//! concurrent multi-document runs around the synchronous engine.

use crate::analysis::SpecialContentCounts;
use crate::chunk::{Chunk, DocumentChunker, TokenEstimator};
use crate::config::ChunkConfig;
use crate::enhance::MetadataEnhancer;
use crate::monitor::{HealthMonitor, RunRecord};
use crate::outline::{self, DocumentOutline};
use crate::progress::ProgressReporter;
use crate::relationships::{self, RelationshipStats};
use crate::types::DocumentInput;
use chunkwise_core::config::parse_flag;
use chunkwise_core::{AppError, AppResult};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const CHUNKING_FLAG: &str = "CHUNKING_ENABLED";

/// Projected time for a 500-page document above which a run is logged as slow.
const SLOW_PROJECTION_MS: f64 = 300_000.0;
const PROJECTION_PAGES: f64 = 500.0;

/// A single on/off capability check.
pub trait CapabilityGate: Send + Sync {
    fn is_enabled(&self) -> bool;

    fn name(&self) -> &str {
        CHUNKING_FLAG
    }
}

/// Atomic boolean gate.
#[derive(Debug)]
pub struct FeatureFlag {
    name: String,
    enabled: AtomicBool,
}

impl FeatureFlag {
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Read the flag from the environment variable of the same name.
    pub fn from_env(name: &str, default: bool) -> AppResult<Self> {
        let enabled = match std::env::var(name) {
            Ok(value) => parse_flag(&value)
                .ok_or_else(|| AppError::Config(format!("{} is not a boolean: {}", name, value)))?,
            Err(_) => default,
        };
        Ok(Self::new(name, enabled))
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl CapabilityGate for FeatureFlag {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkingStatistics {
    pub total_pages: usize,
    pub total_chunks: usize,
    /// Mean chunk length in characters
    pub average_chunk_size: f64,
    pub processing_time_ms: u64,
    pub special_content_counts: SpecialContentCounts,
    pub relationships: RelationshipStats,
}

impl ChunkingStatistics {
    fn collect(input: &DocumentInput, chunks: &[Chunk], processing_time_ms: u64) -> Self {
        let mut special_content_counts = SpecialContentCounts::default();
        for chunk in chunks {
            special_content_counts.add(&chunk.metadata.special_content);
        }
        let average_chunk_size = if chunks.is_empty() {
            0.0
        } else {
            chunks.iter().map(Chunk::char_count).sum::<usize>() as f64 / chunks.len() as f64
        };

        Self {
            total_pages: input.pages.len(),
            total_chunks: chunks.len(),
            average_chunk_size,
            processing_time_ms,
            special_content_counts,
            relationships: relationships::statistics(chunks),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkingResult {
    /// UUID v4 identifying this run
    pub job_id: String,
    pub document_id: String,
    pub chunks: Vec<Chunk>,
    pub statistics: ChunkingStatistics,
    pub outline: DocumentOutline,
}

/// Runs documents through chunking and enhancement behind a capability gate.
#[derive(Clone)]
pub struct ChunkingService {
    chunker: DocumentChunker,
    gate: Arc<dyn CapabilityGate>,
    monitor: Option<Arc<HealthMonitor>>,
    progress: ProgressReporter,
    timeout: Option<Duration>,
    enhance: bool,
}

impl ChunkingService {
    /// Fails with every violated rule when `config` is invalid.
    pub fn new(config: ChunkConfig, gate: Arc<dyn CapabilityGate>) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            chunker: DocumentChunker::new(config),
            gate,
            monitor: None,
            progress: ProgressReporter::noop(),
            timeout: None,
            enhance: true,
        })
    }

    pub fn with_monitor(mut self, monitor: Arc<HealthMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.chunker = self.chunker.with_progress(progress.clone());
        self.progress = progress;
        self
    }

    /// Upper bound for one document in [`process_async`](Self::process_async).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.chunker = self.chunker.with_estimator(estimator);
        self
    }

    /// Skip the metadata enhancement pass.
    pub fn without_enhancement(mut self) -> Self {
        self.enhance = false;
        self
    }

    pub fn config(&self) -> &ChunkConfig {
        self.chunker.config()
    }

    pub fn is_enabled(&self) -> bool {
        self.gate.is_enabled()
    }

    pub fn monitor(&self) -> Option<&Arc<HealthMonitor>> {
        self.monitor.as_ref()
    }

    fn ensure_enabled(&self) -> AppResult<()> {
        if self.gate.is_enabled() {
            return Ok(());
        }
        Err(AppError::Disabled(format!(
            "Document chunking is currently disabled. Enable the {} flag to use this functionality.",
            self.gate.name()
        )))
    }

    fn record(&self, record: RunRecord) {
        if let Some(monitor) = &self.monitor {
            monitor.record_run(record);
        }
    }

    /// Chunk one document on the calling thread.
    pub fn process(&self, input: &DocumentInput) -> AppResult<ChunkingResult> {
        self.ensure_enabled()?;
        let result = self.run(input);
        self.record(RunRecord::success(
            &input.document_id,
            result.chunks.len(),
            result.statistics.processing_time_ms,
        ));
        Ok(result)
    }

    /// Chunk one document on the blocking pool, bounded by the configured
    /// timeout. A timed-out run keeps going in the background; its result is
    /// dropped.
    pub async fn process_async(&self, input: DocumentInput) -> AppResult<ChunkingResult> {
        self.ensure_enabled()?;
        let document_id = input.document_id.clone();
        let service = self.clone();
        let task = tokio::task::spawn_blocking(move || service.run(&input));

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    let error = AppError::Timeout(format!(
                        "Chunking document {} exceeded {}ms",
                        document_id,
                        limit.as_millis()
                    ));
                    tracing::error!(document_id = %document_id, error = %error, "Chunking timed out");
                    self.record(RunRecord::from_error(&document_id, &error));
                    return Err(error);
                }
            },
            None => task.await,
        };

        match joined {
            Ok(result) => {
                self.record(RunRecord::success(
                    &document_id,
                    result.chunks.len(),
                    result.statistics.processing_time_ms,
                ));
                Ok(result)
            }
            Err(e) => {
                let error = AppError::Chunking(format!("Chunking task for {} failed: {}", document_id, e));
                tracing::error!(document_id = %document_id, error = %error, "Chunking task failed");
                self.record(RunRecord::from_error(&document_id, &error));
                Err(error)
            }
        }
    }

    /// Chunk several documents concurrently. Results keep the input order.
    pub async fn process_many(&self, inputs: Vec<DocumentInput>) -> Vec<AppResult<ChunkingResult>> {
        futures::future::join_all(inputs.into_iter().map(|input| self.process_async(input))).await
    }

    fn run(&self, input: &DocumentInput) -> ChunkingResult {
        let started = Instant::now();
        tracing::info!(document_id = %input.document_id, pages = input.pages.len(), "Starting chunking");

        let outline = outline::outline(&input.pages, input.title.as_deref());
        let titled;
        let input = match (&input.title, &outline.title) {
            (None, Some(title)) => {
                titled = input.clone().with_title(title.clone());
                &titled
            }
            _ => input,
        };

        let (mut chunks, timings) = self.chunker.chunk_timed(input);
        if self.enhance {
            chunks = MetadataEnhancer::new()
                .with_timings(timings)
                .with_progress(self.progress.clone())
                .enhance(chunks, &input.pages, input.info.as_ref());
        }

        let report = relationships::validate(&chunks);
        if !report.is_valid() {
            tracing::warn!(
                document_id = %input.document_id,
                errors = ?report.messages(),
                "Repairing chunk relationships"
            );
            relationships::repair(&mut chunks);
        }

        let processing_time_ms = started.elapsed().as_millis() as u64;
        if !input.pages.is_empty() {
            let projected = processing_time_ms as f64 / input.pages.len() as f64 * PROJECTION_PAGES;
            if projected > SLOW_PROJECTION_MS {
                tracing::warn!(
                    document_id = %input.document_id,
                    projected_ms = projected as u64,
                    "Chunking is slower than the 500-page budget"
                );
            }
        }

        tracing::info!(
            document_id = %input.document_id,
            chunks = chunks.len(),
            duration_ms = processing_time_ms,
            "Completed chunking"
        );

        ChunkingResult {
            job_id: Uuid::new_v4().to_string(),
            document_id: input.document_id.clone(),
            statistics: ChunkingStatistics::collect(input, &chunks, processing_time_ms),
            chunks,
            outline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{HeuristicEstimator, TokenBreakdown};
    use crate::types::PageText;

    fn enabled() -> Arc<dyn CapabilityGate> {
        Arc::new(FeatureFlag::new(CHUNKING_FLAG, true))
    }

    fn document(id: &str) -> DocumentInput {
        DocumentInput::new(
            id,
            "tenant",
            vec![
                PageText::new(1, "Pump Maintenance Guide\n\n# Filters\nReplace the filter every 500 hours."),
                PageText::new(2, "# Belts\nCheck belt tension monthly. Adjust to 12 mm deflection."),
            ],
        )
    }

    struct SlowEstimator;

    impl TokenEstimator for SlowEstimator {
        fn estimate(&self, text: &str) -> TokenBreakdown {
            std::thread::sleep(Duration::from_millis(200));
            HeuristicEstimator.estimate(text)
        }
    }

    #[test]
    fn test_disabled_gate_fails_fast() {
        let flag = Arc::new(FeatureFlag::new(CHUNKING_FLAG, false));
        let monitor = Arc::new(HealthMonitor::default());
        let service = ChunkingService::new(ChunkConfig::default(), flag.clone())
            .unwrap()
            .with_monitor(monitor.clone());

        let err = service.process(&document("d")).unwrap_err();
        assert!(matches!(err, AppError::Disabled(_)));
        assert!(monitor.is_empty());

        flag.set(true);
        assert!(service.process(&document("d")).is_ok());
        assert_eq!(monitor.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ChunkConfig {
            chunk_size: 50,
            overlap: 60,
            ..ChunkConfig::default()
        };
        match ChunkingService::new(config, enabled()) {
            Err(AppError::InvalidChunkConfig(rules)) => assert!(rules.len() >= 2),
            other => panic!("expected invalid config, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_result_statistics() {
        let service = ChunkingService::new(ChunkConfig::default(), enabled()).unwrap();
        let result = service.process(&document("manual")).unwrap();

        assert_eq!(result.document_id, "manual");
        assert!(Uuid::parse_str(&result.job_id).is_ok());
        assert_eq!(result.statistics.total_pages, 2);
        assert_eq!(result.statistics.total_chunks, result.chunks.len());
        assert!(result.statistics.average_chunk_size > 0.0);
        assert!(result.statistics.special_content_counts.technical_formats >= 1);
        assert_eq!(result.outline.title.as_deref(), Some("Pump Maintenance Guide"));
        assert_eq!(
            result.chunks[0].metadata.document_title.as_deref(),
            Some("Pump Maintenance Guide")
        );
        assert!(result.chunks.iter().all(|c| c.metadata.is_enhanced()));
    }

    #[test]
    fn test_without_enhancement() {
        let service = ChunkingService::new(ChunkConfig::default(), enabled())
            .unwrap()
            .without_enhancement();
        let result = service.process(&document("plain")).unwrap();
        assert!(result.chunks.iter().all(|c| !c.metadata.is_enhanced()));
    }

    #[tokio::test]
    async fn test_timeout_is_recorded() {
        let monitor = Arc::new(HealthMonitor::default());
        let service = ChunkingService::new(ChunkConfig::default(), enabled())
            .unwrap()
            .with_estimator(Arc::new(SlowEstimator))
            .with_timeout(Duration::from_millis(20))
            .with_monitor(monitor.clone());

        let err = service.process_async(document("slow")).await.unwrap_err();
        assert!(err.is_timeout());

        let records = monitor.recent_metrics(1);
        assert!(records[0].timed_out);
        assert!(records[0].is_timeout());
    }

    #[tokio::test]
    async fn test_process_many_keeps_order() {
        let monitor = Arc::new(HealthMonitor::default());
        let service = ChunkingService::new(ChunkConfig::default(), enabled())
            .unwrap()
            .with_monitor(monitor.clone());

        let inputs = vec![document("a"), document("b"), document("c")];
        let results = service.process_many(inputs).await;

        let ids: Vec<String> = results
            .into_iter()
            .map(|r| r.unwrap().document_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(monitor.len(), 3);
        assert_eq!(monitor.failure_rate(), 0.0);
    }
}
