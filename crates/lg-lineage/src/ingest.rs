//! Batch ingestion: analyze scripts and write their lineage concurrently

use crate::builder::{BuildContext, BuildReport, LineageBuilder};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use lg_core::{compute_checksum, Config};
use lg_sql::{AnalyzedStatement, Analyzer, StatementFailure};
use lg_store::GraphStore;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// A script to ingest
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Path or logical name, used for the script entity
    pub path: String,
    pub sql: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sql: sql.into(),
        }
    }
}

/// Outcome for one script
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub checksum: String,
    pub records: Vec<AnalyzedStatement>,
    pub failures: Vec<StatementFailure>,
    pub build: BuildReport,
}

/// Outcome of one ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub files: Vec<FileReport>,
    /// Scripts whose task did not complete
    pub aborted: Vec<String>,
}

impl IngestReport {
    pub fn statement_count(&self) -> usize {
        self.files.iter().map(|f| f.records.len()).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.files
            .iter()
            .map(|f| f.failures.len() + f.build.failures.len())
            .sum::<usize>()
            + self.aborted.len()
    }

    pub fn warning_count(&self) -> usize {
        self.files.iter().map(|f| f.build.warnings.len()).sum()
    }
}

/// Analyzes scripts and writes their lineage with bounded concurrency
pub struct Ingestor {
    analyzer: Arc<Analyzer>,
    builder: Arc<LineageBuilder>,
    concurrency: usize,
    database: Option<String>,
    schema: Option<String>,
    pipeline: Option<String>,
}

impl Ingestor {
    pub fn new(analyzer: Analyzer, store: Arc<dyn GraphStore>) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            builder: Arc::new(LineageBuilder::new(store)),
            concurrency: 4,
            database: None,
            schema: None,
            pipeline: None,
        }
    }

    /// Ingestor configured from a project config; the project name becomes the pipeline
    pub fn from_config(config: &Config, analyzer: Analyzer, store: Arc<dyn GraphStore>) -> Self {
        let mut ingestor = Self::new(analyzer, store).with_concurrency(config.ingest.concurrency);
        ingestor.database = config.default_database().map(str::to_string);
        ingestor.schema = config.default_schema().map(str::to_string);
        ingestor.pipeline = config.name.clone();
        ingestor
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_defaults(mut self, database: Option<&str>, schema: Option<&str>) -> Self {
        self.database = database.map(str::to_string);
        self.schema = schema.map(str::to_string);
        self
    }

    /// Ingest scripts in parallel. Per-statement and per-write failures are
    /// collected in the report; one bad script never stops the others.
    pub async fn ingest(&self, sources: Vec<SourceFile>) -> IngestReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        log::info!(
            "Ingest run {} started: {} scripts, concurrency {}",
            run_id,
            sources.len(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut paths = Vec::with_capacity(sources.len());
        let mut handles = Vec::with_capacity(sources.len());
        for source in sources {
            paths.push(source.path.clone());
            let semaphore = semaphore.clone();
            let analyzer = self.analyzer.clone();
            let builder = self.builder.clone();
            let ctx = self.context(&source);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                ingest_file(&analyzer, &builder, source, ctx).await
            }));
        }

        let mut files = Vec::new();
        let mut aborted = Vec::new();
        for (path, result) in paths.into_iter().zip(join_all(handles).await) {
            match result {
                Ok(report) => files.push(report),
                Err(e) => {
                    log::warn!("Ingest of {} aborted: {}", path, e);
                    aborted.push(path);
                }
            }
        }

        let report = IngestReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            files,
            aborted,
        };
        log::info!(
            "Ingest run {} finished: {} statements, {} failures, {} warnings",
            run_id,
            report.statement_count(),
            report.failure_count(),
            report.warning_count()
        );
        report
    }

    fn context(&self, source: &SourceFile) -> BuildContext {
        let mut ctx = BuildContext::new(source.path.clone())
            .with_defaults(self.database.as_deref(), self.schema.as_deref())
            .with_checksum(compute_checksum(&source.sql));
        if let Some(pipeline) = &self.pipeline {
            ctx = ctx.with_pipeline(pipeline.clone());
        }
        ctx
    }
}

async fn ingest_file(
    analyzer: &Analyzer,
    builder: &LineageBuilder,
    source: SourceFile,
    ctx: BuildContext,
) -> FileReport {
    let analysis = analyzer.analyze_script(&source.sql);
    log::debug!(
        "{}: {} statements analyzed, {} skipped",
        source.path,
        analysis.records.len(),
        analysis.failures.len()
    );

    let mut build = BuildReport::default();
    for statement in &analysis.records {
        build.merge(builder.build(&statement.record, &ctx).await);
    }
    if !build.is_clean() {
        log::warn!("{}: {} graph writes failed", source.path, build.failures.len());
    }

    FileReport {
        checksum: ctx.checksum.clone().unwrap_or_default(),
        path: source.path,
        records: analysis.records,
        failures: analysis.failures,
        build,
    }
}

#[cfg(test)]
#[path = "ingest_test.rs"]
mod tests;
