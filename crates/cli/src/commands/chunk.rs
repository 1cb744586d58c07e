//! Chunk command handler.
//!
//! Reads page files, runs them through the chunking service and writes the
//! results as JSON or a short summary.

use super::config::resolve_chunk_config;
use chunkwise_core::{config::AppConfig, AppError, AppResult};
use chunkwise_pipeline::config::ChunkConfigUpdate;
use chunkwise_pipeline::monitor::{self, HealthMonitor};
use chunkwise_pipeline::{
    ChunkingResult, ChunkingService, DocumentInput, FeatureFlag, PageText, ProgressEvent,
    ProgressReporter, CHUNKING_FLAG,
};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;

/// Page separator inside plain-text inputs
const FORM_FEED: char = '\u{000C}';

const SUPPORTED_EXTENSIONS: [&str; 3] = ["json", "txt", "md"];

/// Chunk documents from page files
#[derive(Args, Debug)]
pub struct ChunkCommand {
    /// Files or directories to chunk. JSON files hold `[{"text", "pageNumber"}]`;
    /// text files are split into pages on form feeds.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Tenant the chunks belong to
    #[arg(long, default_value = "default")]
    pub tenant: String,

    /// Document title (single input only)
    #[arg(long)]
    pub title: Option<String>,

    /// Target chunk size in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Overlap between chunks in characters
    #[arg(long)]
    pub overlap: Option<usize>,

    /// Minimum chunk size in estimated tokens
    #[arg(long)]
    pub min_chunk_size: Option<usize>,

    /// Per-document time limit in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Skip metadata enhancement
    #[arg(long)]
    pub no_enhance: bool,

    /// Do not append run records to the metrics log
    #[arg(long)]
    pub no_record: bool,

    /// Write the JSON results to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ChunkCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chunk command");
        tracing::debug!("Chunk command options: {:?}", self);

        let files = collect_files(&self.inputs)?;
        if files.is_empty() {
            return Err(AppError::Config("No supported input files found".to_string()));
        }
        if self.title.is_some() && files.len() > 1 {
            return Err(AppError::Config("--title applies to a single input file".to_string()));
        }

        let documents = files
            .iter()
            .map(|path| {
                let mut document = load_document(path, &self.tenant)?;
                if let Some(title) = &self.title {
                    document = document.with_title(title.clone());
                }
                Ok(document)
            })
            .collect::<AppResult<Vec<_>>>()?;

        let chunk_config = resolve_chunk_config(config)?.merged(&ChunkConfigUpdate {
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            min_chunk_size: self.min_chunk_size,
            ..ChunkConfigUpdate::default()
        });

        let metrics_path = config.metrics_path();
        let monitor = Arc::new(HealthMonitor::default());
        let gate = Arc::new(FeatureFlag::new(CHUNKING_FLAG, config.chunking_enabled));

        let mut service = ChunkingService::new(chunk_config, gate)?.with_monitor(monitor.clone());
        if let Some(secs) = self.timeout.or(config.timeout_secs) {
            service = service.with_timeout(Duration::from_secs(secs));
        }
        if self.no_enhance {
            service = service.without_enhancement();
        }
        if config.verbose {
            service = service.with_progress(ProgressReporter::new(Arc::new(|event: ProgressEvent| {
                eprintln!("{}", event.format_simple());
            })));
        }

        let count = documents.len();
        let outcomes = service.process_many(documents).await;

        if !self.no_record {
            for record in monitor.recent_metrics(count) {
                monitor::append_record(&metrics_path, &record)?;
            }
            tracing::debug!("Recorded {} runs to {:?}", count, metrics_path);
        }

        let mut results: Vec<ChunkingResult> = Vec::with_capacity(count);
        let mut failures: Vec<(PathBuf, AppError)> = Vec::new();
        for (path, outcome) in files.into_iter().zip(outcomes) {
            match outcome {
                Ok(result) => results.push(result),
                // A closed gate fails every document the same way
                Err(e @ AppError::Disabled(_)) => return Err(e),
                Err(e) => failures.push((path, e)),
            }
        }

        if let Some(output) = &self.output {
            std::fs::write(output, serde_json::to_string_pretty(&results)?)?;
            tracing::info!("Wrote {} results to {:?}", results.len(), output);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&results)?);
        } else {
            print_summary(&results);
        }

        for (path, error) in &failures {
            eprintln!("Failed: {} ({})", path.display(), error);
        }

        match failures.len() {
            0 => Ok(()),
            n => Err(AppError::Chunking(format!("{} of {} documents failed", n, count))),
        }
    }
}

fn print_summary(results: &[ChunkingResult]) {
    for result in results {
        let stats = &result.statistics;
        let counts = &stats.special_content_counts;
        println!("{}", result.document_id);
        if let Some(title) = &result.outline.title {
            println!("  Title: {}", title);
        }
        println!("  Pages: {}", stats.total_pages);
        println!(
            "  Chunks: {} (avg {:.0} chars)",
            stats.total_chunks, stats.average_chunk_size
        );
        println!(
            "  Special content: {} tables, {} lists, {} diagrams, {} code blocks, {} technical",
            counts.tables, counts.lists, counts.diagrams, counts.code_blocks, counts.technical_formats
        );
        println!("  Hierarchy depth: {}", stats.relationships.max_depth);
        println!("  Time: {}ms", stats.processing_time_ms);
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Expand directories into their supported files, sorted by path.
fn collect_files(inputs: &[PathBuf]) -> AppResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.is_file() && is_supported(p))
                .collect();
            found.sort();
            files.extend(found);
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            return Err(AppError::Config(format!("Input not found: {:?}", input)));
        }
    }
    Ok(files)
}

/// Read one document. The document id is the file stem.
fn load_document(path: &Path, tenant: &str) -> AppResult<DocumentInput> {
    let content = std::fs::read_to_string(path)?;
    let document_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    let pages = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => serde_json::from_str::<Vec<PageText>>(&content)
            .map_err(|e| AppError::Chunking(format!("Invalid page file {:?}: {}", path, e)))?,
        _ => split_pages(&content),
    };

    tracing::debug!("Loaded {:?}: {} pages", path, pages.len());
    Ok(DocumentInput::new(document_id, tenant, pages))
}

fn split_pages(content: &str) -> Vec<PageText> {
    content
        .split(FORM_FEED)
        .enumerate()
        .map(|(i, text)| PageText::new(i as u32 + 1, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_pages_on_form_feed() {
        let pages = split_pages("first\u{000C}second\u{000C}");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1], PageText::new(2, "second"));
        assert_eq!(pages[2].text, "");
    }

    #[test]
    fn test_load_json_and_text_documents() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("pump.json");
        std::fs::write(&json, r#"[{"text": "Page one.", "pageNumber": 1}, {"text": "Page two.", "pageNumber": 2}]"#).unwrap();
        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "Only page.").unwrap();

        let document = load_document(&json, "acme").unwrap();
        assert_eq!(document.document_id, "pump");
        assert_eq!(document.tenant_id, "acme");
        assert_eq!(document.pages.len(), 2);

        let document = load_document(&text, "acme").unwrap();
        assert_eq!(document.pages, vec![PageText::new(1, "Only page.")]);
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_document(&path, "t"), Err(AppError::Chunking(_))));
    }

    #[test]
    fn test_collect_files_walks_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(nested.join("a.json"), "[]").unwrap();
        std::fs::write(dir.path().join("skip.pdf"), "x").unwrap();

        let files = collect_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.txt", "a.json"]);

        assert!(collect_files(&[dir.path().join("missing")]).is_err());
    }
}
