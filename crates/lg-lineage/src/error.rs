//! Error types for lg-lineage

use lg_core::CoreError;
use lg_store::StoreError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Lineage operation errors
#[derive(Error, Debug)]
pub enum LineageError {
    /// Caller supplied an out-of-range or malformed argument (L001)
    #[error("[L001] Invalid argument: {0}")]
    InvalidArgument(String),

    /// Graph store call failed (L002)
    #[error("[L002] Graph store error: {0}")]
    Store(#[from] StoreError),

    /// Stored vertex or edge could not be decoded (L003)
    #[error("[L003] Corrupt graph data: {0}")]
    Decode(#[from] CoreError),
}

/// Result type alias for LineageError
pub type LineageResult<T> = Result<T, LineageError>;

/// Non-fatal findings collected while building the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineageWarning {
    /// Output column with no resolvable source columns
    UnresolvedColumn { column: String, transformation: String },
    /// Unqualified source column in a statement that reads no tables
    UnattachedSource { column: String, source: String },
    /// Object name that could not be turned into an entity id
    UnnamedObject { context: String, name: String },
}

impl fmt::Display for LineageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineageWarning::UnresolvedColumn {
                column,
                transformation,
            } => write!(
                f,
                "column '{}' has no resolvable source (from '{}')",
                column, transformation
            ),
            LineageWarning::UnattachedSource { column, source } => write!(
                f,
                "source '{}' of column '{}' cannot be attached to a table",
                source, column
            ),
            LineageWarning::UnnamedObject { context, name } => {
                write!(f, "{} name '{}' is empty", context, name)
            }
        }
    }
}

/// A store write that did not happen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteFailure {
    /// Entity id, or `source -[TYPE]-> target` for relationships
    pub item: String,
    pub message: String,
}
