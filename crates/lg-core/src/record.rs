//! Normalized per-statement extraction output.
//!
//! An [`ExtractionRecord`] says what one SQL statement reads, what it writes,
//! and how each output column derives from its inputs. Names are kept as
//! written in the SQL (unquoted); qualification happens when the record is
//! turned into graph entities.

use crate::naming::normalize_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Synthetic write target of statements whose result is not persisted
pub const CONSOLE_TARGET: &str = "console";

/// Classified kind of an analyzed statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    CreateTable,
    CreateTableAs,
    CreateView,
    CreateMaterializedView,
    CreateFunction,
    CreateProcedure,
    CreateTrigger,
    CreateSynonym,
    Call,
    /// Opaque or unstructured command
    #[default]
    Command,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Merge => "merge",
            StatementKind::CreateTable => "create_table",
            StatementKind::CreateTableAs => "create_table_as",
            StatementKind::CreateView => "create_view",
            StatementKind::CreateMaterializedView => "create_materialized_view",
            StatementKind::CreateFunction => "create_function",
            StatementKind::CreateProcedure => "create_procedure",
            StatementKind::CreateTrigger => "create_trigger",
            StatementKind::CreateSynonym => "create_synonym",
            StatementKind::Call => "call",
            StatementKind::Command => "command",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expression type for a derived column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExprType {
    #[default]
    Unknown,
    /// Direct column reference (pass-through)
    Column,
    Function,
    Literal,
    /// Computed expression (binary op, unary op, etc.)
    Expression,
    /// SELECT * or table.*
    Wildcard,
    Cast,
    Case,
    /// Scalar subquery
    Subquery,
}

impl ExprType {
    /// Whether an empty source set is expected for this expression
    pub fn is_sourceless(&self) -> bool {
        matches!(self, ExprType::Literal | ExprType::Wildcard)
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExprType::Unknown => "unknown",
            ExprType::Column => "column",
            ExprType::Function => "function",
            ExprType::Literal => "literal",
            ExprType::Expression => "expression",
            ExprType::Wildcard => "wildcard",
            ExprType::Cast => "cast",
            ExprType::Case => "case",
            ExprType::Subquery => "subquery",
        };
        f.write_str(s)
    }
}

/// How one output column derives from source columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDerivation {
    /// Output column name
    pub target: String,
    /// Source columns, `qualifier.column` when resolved to a table
    pub sources: BTreeSet<String>,
    /// Expression text as it appears in the statement
    pub transformation: String,
    #[serde(default)]
    pub expr_type: ExprType,
    /// Target type of a top-level CAST
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast_type: Option<String>,
}

impl ColumnDerivation {
    pub fn new(target: impl Into<String>, transformation: impl Into<String>, expr_type: ExprType) -> Self {
        Self {
            target: target.into(),
            sources: BTreeSet::new(),
            transformation: transformation.into(),
            expr_type,
            cast_type: None,
        }
    }

    /// A non-literal derivation whose sources could not be resolved
    pub fn is_unresolved(&self) -> bool {
        self.sources.is_empty() && !self.expr_type.is_sourceless()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerDef {
    pub name: String,
    pub target_table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SynonymDef {
    pub name: String,
    pub target_object: String,
}

/// Kind of routine invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    StoredProcedure,
    FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcedureCall {
    pub name: String,
    #[serde(rename = "type")]
    pub call_type: CallType,
    /// Tables the invocation's statement touches
    #[serde(default)]
    pub target_tables: BTreeSet<String>,
}

/// Declared column of a plain CREATE TABLE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: String,
}

/// Normalized result of analyzing one statement
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractionRecord {
    #[serde(default)]
    pub kind: StatementKind,
    #[serde(default)]
    pub read: BTreeSet<String>,
    #[serde(default)]
    pub write: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnDerivation>,
    #[serde(default)]
    pub functions_and_procedures: BTreeSet<String>,
    #[serde(default)]
    pub views: BTreeSet<String>,
    #[serde(default)]
    pub materialized_views: BTreeSet<String>,
    #[serde(default)]
    pub triggers: Vec<TriggerDef>,
    #[serde(default)]
    pub synonyms: Vec<SynonymDef>,
    #[serde(default)]
    pub procedure_calls: Vec<ProcedureCall>,
    #[serde(default)]
    pub column_definitions: Vec<ColumnDefinition>,
}

impl ExtractionRecord {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Whether the write target is the synthetic console target
    pub fn writes_to_console(&self) -> bool {
        self.write.as_deref() == Some(CONSOLE_TARGET)
    }

    /// Add a read unless it names the write target.
    ///
    /// Comparison ignores case and identifier quoting.
    pub fn add_read(&mut self, table: &str) {
        if self.is_write_target(table) {
            return;
        }
        let already = self
            .read
            .iter()
            .any(|r| normalize_name(r) == normalize_name(table));
        if !already {
            self.read.insert(table.to_string());
        }
    }

    /// Drop any read that names the write target
    pub fn exclude_write_from_reads(&mut self) {
        let Some(write) = self.write.as_deref().map(normalize_name) else {
            return;
        };
        self.read.retain(|r| normalize_name(r) != write);
    }

    pub fn is_write_target(&self, table: &str) -> bool {
        self.write
            .as_deref()
            .is_some_and(|w| normalize_name(w) == normalize_name(table))
    }

    /// Whether the record carries no lineage facts at all
    pub fn is_empty(&self) -> bool {
        self.read.is_empty()
            && self.write.is_none()
            && self.columns.is_empty()
            && self.functions_and_procedures.is_empty()
            && self.views.is_empty()
            && self.materialized_views.is_empty()
            && self.triggers.is_empty()
            && self.synonyms.is_empty()
            && self.procedure_calls.is_empty()
            && self.column_definitions.is_empty()
    }
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;
