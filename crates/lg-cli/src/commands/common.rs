//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use lg_core::{Config, CoreError};
use lg_lineage::{IngestReport, Ingestor, LineageEngine, SourceFile};
use lg_sql::Analyzer;
use lg_store::{GraphStore, InMemoryGraphStore, RetryPolicy, RetryingStore};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::cli::GlobalArgs;

/// Install the stderr log subscriber. `RUST_LOG` overrides `--verbose`.
pub(crate) fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Ignore a second initialization (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Load the config named by `--config`, else `lineage.yml` in the project
/// directory, else defaults.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    if let Some(path) = &global.config {
        return Config::load(Path::new(path)).with_context(|| format!("Failed to load config {}", path));
    }
    match Config::load_from_dir(Path::new(&global.project_dir)) {
        Ok(config) => Ok(config),
        Err(CoreError::ConfigNotFound { path }) => {
            log::debug!("No config at {}, using defaults", path);
            Ok(Config::default())
        }
        Err(e) => Err(e).context("Failed to load project config"),
    }
}

/// Expand files and directories into a sorted, deduplicated list of SQL files.
pub(crate) fn collect_sql_files(paths: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();
    for raw in paths {
        let path = Path::new(raw);
        if path.is_dir() {
            let pattern = path.join("**").join("*.sql");
            let pattern = pattern.to_string_lossy();
            for entry in glob::glob(&pattern).with_context(|| format!("Invalid path pattern {}", pattern))? {
                let file = entry.with_context(|| format!("Failed to read {}", raw))?;
                if file.is_file() {
                    files.insert(file);
                }
            }
        } else if path.is_file() {
            files.insert(path.to_path_buf());
        } else {
            anyhow::bail!("Path not found: {}", raw);
        }
    }
    Ok(files.into_iter().collect())
}

/// Read SQL files into ingestible sources
pub(crate) fn read_sources(files: &[PathBuf]) -> Result<Vec<SourceFile>> {
    files
        .iter()
        .map(|file| {
            let sql = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            Ok(SourceFile::new(file.display().to_string(), sql))
        })
        .collect()
}

/// Analyzer for the configured dialect, or `dialect` when given
pub(crate) fn build_analyzer(config: &Config, dialect: Option<&str>) -> Result<Analyzer> {
    let name = dialect.unwrap_or(&config.dialect);
    let analyzer = Analyzer::from_dialect_name(name).context("Invalid SQL dialect")?;
    log::debug!("Parsing with the {} dialect", analyzer.parser().dialect_name());
    Ok(analyzer.with_builtin_functions(&config.analyzer.builtin_functions))
}

/// Ingest SQL files into a fresh in-memory graph and return an engine over it
pub(crate) async fn ingest_paths(
    global: &GlobalArgs,
    paths: &[String],
    dialect: Option<&str>,
) -> Result<(LineageEngine, IngestReport)> {
    let config = load_config(global)?;
    let analyzer = build_analyzer(&config, dialect)?;
    let files = collect_sql_files(paths)?;
    if files.is_empty() {
        anyhow::bail!("No SQL files found in {}", paths.join(", "));
    }
    let sources = read_sources(&files)?;

    let store: Arc<dyn GraphStore> = Arc::new(RetryingStore::new(
        InMemoryGraphStore::new(),
        RetryPolicy::from_config(&config.store),
    ));
    let report = Ingestor::from_config(&config, analyzer, store.clone())
        .ingest(sources)
        .await;
    for file in &report.files {
        for failure in &file.failures {
            if failure.error.is_skip() {
                log::debug!("{}: statement {} skipped: {}", file.path, failure.index + 1, failure.error);
            } else {
                log::warn!("{}: statement {} rejected: {}", file.path, failure.index + 1, failure.error);
            }
        }
    }

    let engine = LineageEngine::new(store)
        .with_default_depth(config.traversal.max_depth)
        .context("Invalid traversal.max_depth")?
        .with_name_defaults(config.default_database(), config.default_schema());
    Ok((engine, report))
}

/// Ingestion totals included in command output
#[derive(Debug, Serialize)]
pub(crate) struct IngestSummary {
    pub run_id: String,
    pub files: usize,
    pub statements: usize,
    pub failures: usize,
    pub warnings: usize,
}

impl From<&IngestReport> for IngestSummary {
    fn from(report: &IngestReport) -> Self {
        Self {
            run_id: report.run_id.to_string(),
            files: report.files.len(),
            statements: report.statement_count(),
            failures: report.failure_count(),
            warnings: report.warning_count(),
        }
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
