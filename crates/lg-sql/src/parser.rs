//! SQL parser wrapper with script splitting and opaque-command fallback

use crate::dialect::{NamedDialect, SqlDialect};
use crate::error::{SqlError, SqlResult};
use crate::header::{is_trivia, tokenize, Header};
use serde::Serialize;
use sqlparser::ast::Statement;
use sqlparser::tokenizer::Token;

/// Leading keywords whose unparseable statements are kept as opaque commands
const OPAQUE_VERBS: &[&str] = &["CREATE", "ALTER", "EXEC", "EXECUTE"];

/// Statement text the parser could not turn into a tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpaqueCommand {
    /// Upper-cased leading keyword
    pub verb: String,
    /// Statement text, trimmed
    pub text: String,
}

/// One statement of a script: a syntax tree or an opaque command
#[derive(Debug, Clone, PartialEq)]
pub enum SqlStatement {
    Parsed(Box<Statement>),
    Command(OpaqueCommand),
}

impl SqlStatement {
    /// Canonical statement text
    pub fn text(&self) -> String {
        match self {
            SqlStatement::Parsed(stmt) => stmt.to_string(),
            SqlStatement::Command(cmd) => cmd.text.clone(),
        }
    }
}

impl From<Statement> for SqlStatement {
    fn from(stmt: Statement) -> Self {
        SqlStatement::Parsed(Box::new(stmt))
    }
}

/// A statement with its position in the script
#[derive(Debug, Clone)]
pub struct ScriptStatement {
    /// Zero-based position among all statements of the script
    pub index: usize,
    /// First line of the statement, when known
    pub line: Option<usize>,
    pub statement: SqlStatement,
}

/// A statement that failed to parse or analyze
#[derive(Debug, Clone, Serialize)]
pub struct StatementFailure {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub sql: String,
    pub error: SqlError,
}

/// Result of parsing a whole script: statements plus per-statement failures
#[derive(Debug, Clone, Default)]
pub struct ParsedScript {
    pub statements: Vec<ScriptStatement>,
    pub failures: Vec<StatementFailure>,
}

/// Statement text cut out of a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementText {
    pub text: String,
    /// One-based line of the first significant token
    pub line: usize,
}

/// SQL parser that wraps sqlparser-rs with dialect support
pub struct SqlParser {
    dialect: Box<dyn SqlDialect>,
}

impl SqlParser {
    pub fn new(dialect: impl SqlDialect + 'static) -> Self {
        Self {
            dialect: Box::new(dialect),
        }
    }

    /// Create a new parser with DuckDB dialect
    pub fn duckdb() -> Self {
        Self::new(NamedDialect::duckdb())
    }

    /// Create a new parser with T-SQL dialect
    pub fn tsql() -> Self {
        Self::new(NamedDialect::tsql())
    }

    /// Create a new parser with the generic dialect
    pub fn generic() -> Self {
        Self::new(NamedDialect::generic())
    }

    /// Create a parser from dialect name
    pub fn from_dialect_name(name: &str) -> SqlResult<Self> {
        NamedDialect::from_name(name).map(Self::new)
    }

    /// Parse SQL into AST statements
    pub fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(SqlError::EmptySql);
        }

        self.dialect.parse(sql)
    }

    /// Parse SQL and return the first statement
    pub fn parse_single(&self, sql: &str) -> SqlResult<Statement> {
        let stmts = self.parse(sql)?;
        stmts.into_iter().next().ok_or(SqlError::EmptySql)
    }

    /// Parse one statement, keeping unparseable DDL and EXEC text as an
    /// opaque command
    pub fn parse_statement(&self, sql: &str) -> SqlResult<Vec<SqlStatement>> {
        match self.parse(sql) {
            Ok(stmts) if stmts.is_empty() => Err(SqlError::EmptySql),
            Ok(stmts) => Ok(stmts.into_iter().map(SqlStatement::from).collect()),
            Err(err @ SqlError::ParseError { .. }) => match self.opaque_command(sql) {
                Some(cmd) => {
                    log::debug!("Keeping unparseable {} statement as opaque command", cmd.verb);
                    Ok(vec![SqlStatement::Command(cmd)])
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    fn opaque_command(&self, sql: &str) -> Option<OpaqueCommand> {
        let verb = Header::read(self.dialect.parser_dialect(), sql).ok()?.verb()?;
        if OPAQUE_VERBS.contains(&verb.as_str()) {
            Some(OpaqueCommand {
                verb,
                text: sql.trim().to_string(),
            })
        } else {
            None
        }
    }

    /// Parse a whole script.
    ///
    /// The script is first parsed in one pass. If that fails it is split on
    /// top-level semicolons and each statement is parsed on its own, so one
    /// bad statement only produces a failure entry.
    pub fn parse_script(&self, sql: &str) -> ParsedScript {
        if sql.trim().is_empty() {
            return ParsedScript::default();
        }

        if let Ok(stmts) = self.parse(sql) {
            let lines: Option<Vec<usize>> = self
                .split_statements(sql)
                .ok()
                .filter(|chunks| chunks.len() == stmts.len())
                .map(|chunks| chunks.iter().map(|c| c.line).collect());
            let statements = stmts
                .into_iter()
                .enumerate()
                .map(|(index, stmt)| ScriptStatement {
                    index,
                    line: lines.as_ref().and_then(|l| l.get(index).copied()),
                    statement: stmt.into(),
                })
                .collect();
            return ParsedScript {
                statements,
                failures: Vec::new(),
            };
        }

        let chunks = match self.split_statements(sql) {
            Ok(chunks) => chunks,
            Err(error) => {
                return ParsedScript {
                    statements: Vec::new(),
                    failures: vec![StatementFailure {
                        index: 0,
                        line: None,
                        sql: sql.to_string(),
                        error,
                    }],
                }
            }
        };

        let mut script = ParsedScript::default();
        let mut index = 0;
        for chunk in chunks {
            match self.parse_statement(&chunk.text) {
                Ok(stmts) => {
                    for statement in stmts {
                        script.statements.push(ScriptStatement {
                            index,
                            line: Some(chunk.line),
                            statement,
                        });
                        index += 1;
                    }
                }
                Err(error) => {
                    log::warn!("Skipping statement at line {}: {}", chunk.line, error);
                    script.failures.push(StatementFailure {
                        index,
                        line: Some(chunk.line),
                        sql: chunk.text.trim().to_string(),
                        error: shift_error_line(error, chunk.line),
                    });
                    index += 1;
                }
            }
        }
        script
    }

    /// Split a script on top-level semicolons.
    ///
    /// Semicolons inside string literals, comments and `BEGIN ... END` /
    /// `CASE ... END` blocks do not split. Statements without significant
    /// tokens are dropped.
    pub fn split_statements(&self, sql: &str) -> SqlResult<Vec<StatementText>> {
        let tokens = tokenize(self.dialect.parser_dialect(), sql)?;
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut line = 1;
        let mut start_line = 1;
        let mut significant = false;
        let mut depth: usize = 0;

        for (i, token) in tokens.iter().enumerate() {
            if matches!(token, Token::SemiColon) && depth == 0 {
                if significant {
                    chunks.push(StatementText {
                        text: std::mem::take(&mut current),
                        line: start_line,
                    });
                } else {
                    current.clear();
                }
                significant = false;
                continue;
            }
            if !is_trivia(token) {
                if !significant {
                    start_line = line;
                    significant = true;
                }
                depth = block_depth(depth, token, &tokens[i + 1..]);
            }
            let text = token.to_string();
            line += text.matches('\n').count();
            current.push_str(&text);
        }
        if significant {
            chunks.push(StatementText {
                text: current,
                line: start_line,
            });
        }
        Ok(chunks)
    }

    /// Get the dialect name
    pub fn dialect_name(&self) -> &'static str {
        self.dialect.name()
    }

    /// Underlying sqlparser dialect
    pub fn parser_dialect(&self) -> &dyn sqlparser::dialect::Dialect {
        self.dialect.parser_dialect()
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::generic()
    }
}

/// Upper-cased text of an unquoted word token
fn upper_word(token: &Token) -> Option<String> {
    match token {
        Token::Word(w) if w.quote_style.is_none() => Some(w.value.to_uppercase()),
        _ => None,
    }
}

/// Track `BEGIN ... END` and `CASE ... END` nesting.
///
/// `END IF;`, `END LOOP;` and `END WHILE;` close procedural blocks that
/// never opened a level and leave the depth unchanged.
fn block_depth(depth: usize, token: &Token, rest: &[Token]) -> usize {
    let Some(word) = upper_word(token) else {
        return depth;
    };
    let mut ahead = rest.iter().filter(|t| !is_trivia(t));
    let next = ahead.next().and_then(upper_word);
    match word.as_str() {
        // BEGIN TRAN[SACTION] opens no block
        "BEGIN" if !matches!(next.as_deref(), Some("TRAN" | "TRANSACTION" | "DISTRIBUTED") | None) => {
            depth + 1
        }
        "CASE" => depth + 1,
        "END"
            if matches!(next.as_deref(), Some("IF" | "LOOP" | "WHILE" | "REPEAT"))
                && matches!(ahead.next(), Some(Token::SemiColon) | None) =>
        {
            depth
        }
        "END" => depth.saturating_sub(1),
        _ => depth,
    }
}

/// Offset a parse error's line by the line its statement starts on
fn shift_error_line(error: SqlError, start_line: usize) -> SqlError {
    match error {
        SqlError::ParseError {
            message,
            line,
            column,
        } if line > 0 => SqlError::ParseError {
            message,
            line: line + start_line - 1,
            column,
        },
        other => other,
    }
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
