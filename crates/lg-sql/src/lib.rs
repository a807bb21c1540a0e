//! lg-sql - SQL layer for lineagegraph
//!
//! This crate provides SQL parsing using sqlparser-rs with dialect support,
//! script splitting with an opaque-command fallback, and the statement
//! analyzer that turns each statement into an `ExtractionRecord`.

pub mod analyzer;
pub mod calls;
pub mod dialect;
pub mod error;
pub mod extractor;
pub mod fallback;
pub mod header;
pub mod lineage;
pub mod parser;

pub use analyzer::{AnalyzedStatement, Analyzer, ScriptAnalysis};
pub use calls::{CallDetector, BUILTIN_FUNCTIONS};
pub use dialect::{NamedDialect, SqlDialect};
pub use error::{SqlError, SqlResult};
pub use extractor::extract_relations;
pub use lineage::derive_columns;
pub use parser::{OpaqueCommand, ParsedScript, SqlParser, SqlStatement, StatementFailure};
