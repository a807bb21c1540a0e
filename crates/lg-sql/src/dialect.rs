//! SQL dialect abstraction

use sqlparser::ast::Statement;
use sqlparser::dialect::{
    BigQueryDialect, DatabricksDialect, Dialect, DuckDbDialect, GenericDialect, HiveDialect,
    MsSqlDialect, PostgreSqlDialect, SnowflakeDialect,
};
use sqlparser::parser::Parser;

use crate::error::{SqlError, SqlResult};

/// Trait for SQL dialect implementations
pub trait SqlDialect: Send + Sync {
    /// Get the underlying sqlparser dialect
    fn parser_dialect(&self) -> &dyn Dialect;

    /// Parse SQL into AST statements
    fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        Parser::parse_sql(self.parser_dialect(), sql).map_err(|e| {
            let msg = e.to_string();
            let (line, column) = parse_location_from_error(&msg);
            SqlError::ParseError {
                message: msg,
                line,
                column,
            }
        })
    }

    /// Get the dialect name
    fn name(&self) -> &'static str;
}

/// Parse line and column from a sqlparser error message.
///
/// `ParserError` carries no structured location, so "Line: N, Column: M" is
/// read back out of the message text. Returns `(0, 0)` when absent.
pub(crate) fn parse_location_from_error(msg: &str) -> (usize, usize) {
    match (number_after(msg, "Line: "), number_after(msg, "Column: ")) {
        (Some(line), Some(column)) => (line, column),
        _ => (0, 0),
    }
}

fn number_after(msg: &str, label: &str) -> Option<usize> {
    let start = msg.find(label)? + label.len();
    let rest = &msg[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// A sqlparser dialect paired with its canonical name
pub struct NamedDialect {
    dialect: Box<dyn Dialect + Send + Sync>,
    name: &'static str,
}

impl NamedDialect {
    pub fn duckdb() -> Self {
        Self::build(DuckDbDialect {}, "duckdb")
    }

    pub fn snowflake() -> Self {
        Self::build(SnowflakeDialect {}, "snowflake")
    }

    pub fn tsql() -> Self {
        Self::build(MsSqlDialect {}, "tsql")
    }

    pub fn postgres() -> Self {
        Self::build(PostgreSqlDialect {}, "postgres")
    }

    pub fn bigquery() -> Self {
        Self::build(BigQueryDialect {}, "bigquery")
    }

    pub fn databricks() -> Self {
        Self::build(DatabricksDialect {}, "databricks")
    }

    pub fn hive() -> Self {
        Self::build(HiveDialect {}, "hive")
    }

    pub fn generic() -> Self {
        Self::build(GenericDialect {}, "generic")
    }

    /// Resolve a dialect by name or alias (case-insensitive)
    pub fn from_name(name: &str) -> SqlResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "duckdb" => Ok(Self::duckdb()),
            "snowflake" => Ok(Self::snowflake()),
            "tsql" | "mssql" | "sqlserver" => Ok(Self::tsql()),
            "postgres" | "postgresql" => Ok(Self::postgres()),
            "bigquery" => Ok(Self::bigquery()),
            "spark" | "databricks" => Ok(Self::databricks()),
            "hive" => Ok(Self::hive()),
            "auto" | "generic" | "ansi" => Ok(Self::generic()),
            _ => Err(SqlError::UnknownDialect(name.to_string())),
        }
    }

    fn build(dialect: impl Dialect + Send + Sync, name: &'static str) -> Self {
        Self {
            dialect: Box::new(dialect),
            name,
        }
    }
}

impl Default for NamedDialect {
    fn default() -> Self {
        Self::generic()
    }
}

impl SqlDialect for NamedDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
