//! Routine invocation detection

use crate::extractor::object_name;
use sqlparser::ast::{visit_expressions, Expr, Statement};
use std::collections::HashSet;
use std::ops::ControlFlow;

/// Functions never reported as routine calls.
///
/// Aggregates plus the common scalar built-ins of the supported dialects.
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    // aggregates
    "COUNT", "SUM", "AVG", "MIN", "MAX", "STDDEV", "VARIANCE", "ARRAY_AGG", "STRING_AGG",
    "LISTAGG", "GROUP_CONCAT", "ANY_VALUE",
    // conversion
    "CAST", "CONVERT", "TRY_CAST", "TRY_CONVERT", "PARSE", "FORMAT",
    // null handling
    "COALESCE", "NULLIF", "ISNULL", "IFNULL", "NVL", "NVL2", "IIF", "IF",
    // strings
    "UPPER", "LOWER", "TRIM", "LTRIM", "RTRIM", "SUBSTRING", "SUBSTR", "LEFT", "RIGHT", "LEN",
    "LENGTH", "CONCAT", "CONCAT_WS", "REPLACE", "CHARINDEX", "POSITION", "REVERSE", "LPAD",
    "RPAD", "SPLIT_PART", "REGEXP_REPLACE", "REGEXP_SUBSTR",
    // numbers
    "ABS", "ROUND", "FLOOR", "CEIL", "CEILING", "POWER", "SQRT", "MOD", "SIGN",
    // dates
    "GETDATE", "GETUTCDATE", "SYSDATETIME", "CURRENT_DATE", "CURRENT_TIMESTAMP", "NOW",
    "DATEADD", "DATEDIFF", "DATEPART", "DATENAME", "DATE_TRUNC", "DATE_PART", "EXTRACT", "YEAR",
    "MONTH", "DAY", "EOMONTH", "TO_DATE", "TO_CHAR", "TO_TIMESTAMP",
    // window
    "ROW_NUMBER", "RANK", "DENSE_RANK", "NTILE", "LAG", "LEAD", "FIRST_VALUE", "LAST_VALUE",
    // misc
    "NEWID", "HASHBYTES", "MD5", "SHA2", "GREATEST", "LEAST",
];

/// Detects invocations of user-defined routines
#[derive(Debug, Clone)]
pub struct CallDetector {
    builtins: HashSet<String>,
}

impl Default for CallDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CallDetector {
    pub fn new() -> Self {
        Self {
            builtins: BUILTIN_FUNCTIONS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Extend the built-in exclusion set
    pub fn with_builtins<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.builtins
            .extend(extra.into_iter().map(|f| f.as_ref().trim().to_uppercase()));
        self
    }

    /// Whether a (possibly qualified) function name is a built-in
    pub fn is_builtin(&self, name: &str) -> bool {
        let bare = name.rsplit('.').next().unwrap_or(name);
        self.builtins.contains(&bare.to_uppercase())
    }

    /// Names of non-built-in functions called anywhere in the statement,
    /// in first-seen order
    pub fn function_calls(&self, stmt: &Statement) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut calls = Vec::new();
        let _ = visit_expressions(stmt, |expr| {
            if let Expr::Function(func) = expr {
                let name = object_name(&func.name);
                if !self.is_builtin(&name) && seen.insert(name.to_lowercase()) {
                    calls.push(name);
                }
            }
            ControlFlow::<()>::Continue(())
        });
        calls
    }
}

#[cfg(test)]
#[path = "calls_test.rs"]
mod tests;
