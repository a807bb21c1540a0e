//! Qualified object names and deterministic entity id derivation.
//!
//! Table/view ids are `lower(database.schema.table)` with `.` replaced by `_`;
//! column ids are `{table_id}_{lower(column)}`.

use crate::entity_id::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strip one level of identifier quoting (`"x"`, `[x]`, `` `x` ``).
pub fn unquote_identifier(part: &str) -> &str {
    let bytes = part.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"')
            || (first == b'[' && last == b']')
            || (first == b'`' && last == b'`')
        {
            return &part[1..part.len() - 1];
        }
    }
    part
}

/// Split a dotted name into its unquoted parts, ignoring empty segments.
pub fn split_name(name: &str) -> Vec<&str> {
    name.split('.')
        .map(|p| unquote_identifier(p.trim()))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Normalize a possibly-quoted dotted name for comparisons.
///
/// `"Sales"."Orders"` and `sales.orders` normalize to the same string.
pub fn normalize_name(name: &str) -> String {
    split_name(name).join(".").to_lowercase()
}

/// Split a column reference into `(qualifier, column)` at the last dot.
///
/// # Examples
/// ```
/// use lg_core::naming::split_column_ref;
/// assert_eq!(split_column_ref("a"), (None, "a".to_string()));
/// assert_eq!(split_column_ref("s.t.a"), (Some("s.t".to_string()), "a".to_string()));
/// ```
pub fn split_column_ref(reference: &str) -> (Option<String>, String) {
    let parts = split_name(reference);
    match parts.split_last() {
        Some((column, [])) => (None, column.to_string()),
        Some((column, qualifier)) => (Some(qualifier.join(".")), column.to_string()),
        None => (None, reference.to_string()),
    }
}

/// A `database.schema.object` name with optional leading qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub name: String,
}

impl QualifiedName {
    /// Build a fully qualified name.
    pub fn new(database: &str, schema: &str, name: &str) -> Self {
        Self {
            database: Some(database.to_string()),
            schema: Some(schema.to_string()),
            name: name.to_string(),
        }
    }

    /// Parse a dotted name as written in SQL.
    ///
    /// Names with more than three parts keep the last three (server-qualified
    /// T-SQL names drop the linked server). Returns `None` for an empty name.
    pub fn parse(raw: &str) -> Option<Self> {
        let parts = split_name(raw);
        let (name, rest) = parts.split_last()?;
        let mut qualifiers = rest.iter().rev();
        let schema = qualifiers.next().map(|s| s.to_string());
        let database = qualifiers.next().map(|s| s.to_string());
        Some(Self {
            database,
            schema,
            name: name.to_string(),
        })
    }

    /// Fill missing qualifiers from defaults.
    ///
    /// A default database is only applied when a schema is present (either
    /// written or defaulted), so `t` never becomes `db..t`.
    pub fn with_defaults(mut self, database: Option<&str>, schema: Option<&str>) -> Self {
        if self.schema.is_none() {
            self.schema = schema.map(str::to_string);
        }
        if self.database.is_none() && self.schema.is_some() {
            self.database = database.map(str::to_string);
        }
        self
    }

    /// Deterministic entity id for this name.
    pub fn entity_id(&self) -> EntityId {
        EntityId::new(self.to_string().to_lowercase().replace('.', "_"))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(db) = &self.database {
            write!(f, "{}.", db)?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        f.write_str(&self.name)
    }
}

/// Entity id of a column owned by `table_id`.
pub fn column_id(table_id: &EntityId, column: &str) -> EntityId {
    EntityId::new(format!(
        "{}_{}",
        table_id,
        unquote_identifier(column).to_lowercase()
    ))
}

/// Entity id of a script, derived from its path or logical name.
pub fn script_id(script: &str) -> EntityId {
    EntityId::new(format!("script_{}", slug(script)))
}

/// Entity id of a pipeline (a named group of scripts).
pub fn pipeline_id(pipeline: &str) -> EntityId {
    EntityId::new(format!("pipeline_{}", slug(pipeline)))
}

/// Entity id of a routine (function, procedure or trigger).
///
/// Prefixed so a routine never shares an id with a table of the same name.
pub fn transformation_id(name: &QualifiedName) -> EntityId {
    EntityId::new(format!("transformation_{}", name.entity_id()))
}

/// Entity id of a data type node (e.g. `DECIMAL(10,2)` → `datatype_decimal_10_2_`).
pub fn data_type_id(data_type: &str) -> EntityId {
    EntityId::new(format!("datatype_{}", slug(data_type)))
}

fn slug(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
#[path = "naming_test.rs"]
mod tests;
