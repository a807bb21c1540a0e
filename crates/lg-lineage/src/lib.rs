//! lg-lineage - Lineage graph construction and queries
//!
//! This crate turns extraction records into graph entities and relationships
//! (`builder`), answers bounded upstream/downstream queries over them
//! (`traversal`), and ingests whole scripts concurrently (`ingest`).

pub mod builder;
pub mod error;
pub mod ingest;
pub mod traversal;

pub use builder::{plan, BuildContext, BuildReport, GraphFragment, LineageBuilder};
pub use error::{LineageError, LineageResult, LineageWarning, WriteFailure};
pub use ingest::{FileReport, IngestReport, Ingestor, SourceFile};
pub use traversal::{
    check_depth, ColumnTrace, LineageEngine, LineagePath, TableDependencies,
    TransformationSummary, ValidationRecord, ValidationStatus,
};
