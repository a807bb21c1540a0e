//! Error types for lg-sql

use serde::{Serialize, Serializer};
use thiserror::Error;

/// SQL parsing and analysis errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SqlError {
    /// SQL parse error (S001)
    #[error("[S001] SQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    /// Empty SQL (S002)
    #[error("[S002] SQL is empty")]
    EmptySql,

    /// Statement kind cannot be classified (S003)
    #[error("[S003] Unsupported SQL statement type: {0}")]
    UnsupportedStatement(String),

    /// Statement tree is structurally invalid (S004)
    #[error("[S004] Malformed statement: {0}")]
    MalformedInput(String),

    /// Unknown dialect name (S005)
    #[error("[S005] Unknown SQL dialect '{0}'")]
    UnknownDialect(String),
}

impl SqlError {
    /// Whether the statement was skipped rather than rejected by the parser
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            SqlError::UnsupportedStatement(_) | SqlError::MalformedInput(_)
        )
    }
}

// Reports carry errors as their coded message
impl Serialize for SqlError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
