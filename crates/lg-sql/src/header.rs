//! Token-level reading of statement headers.
//!
//! Some statement kinds are classified from their leading keywords rather
//! than from the syntax tree: opaque commands never produce a tree, and the
//! tree shape of less common DDL varies between dialects. The header reader
//! tokenizes statement text and reads the verb, the object keyword and the
//! dotted object name that follows.

use sqlparser::dialect::Dialect;
use sqlparser::tokenizer::{Token, Tokenizer};

use crate::dialect::parse_location_from_error;
use crate::error::{SqlError, SqlResult};

/// Significant tokens kept per header
const HEADER_TOKEN_LIMIT: usize = 64;

/// Modifiers allowed between `CREATE`/`ALTER` and the object keyword
const CREATE_MODIFIERS: &[&str] = &[
    "OR",
    "REPLACE",
    "ALTER",
    "TEMP",
    "TEMPORARY",
    "SECURE",
    "GLOBAL",
    "LOCAL",
    "TRANSIENT",
    "VOLATILE",
    "RECURSIVE",
    "UNLOGGED",
    "EXTERNAL",
    "CONSTRAINT",
    "PUBLIC",
];

/// Tokenize SQL text with the given dialect
pub fn tokenize(dialect: &dyn Dialect, sql: &str) -> SqlResult<Vec<Token>> {
    Tokenizer::new(dialect, sql).tokenize().map_err(|e| {
        let message = e.to_string();
        let (line, column) = parse_location_from_error(&message);
        SqlError::ParseError {
            message,
            line,
            column,
        }
    })
}

/// Whether a token carries no meaning (whitespace or comment)
pub fn is_trivia(token: &Token) -> bool {
    matches!(token, Token::Whitespace(_))
}

/// Object kind named by a DDL header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKeyword {
    Table,
    View,
    MaterializedView,
    Function,
    Procedure,
    Trigger,
    Synonym,
}

/// `CREATE`/`ALTER` header: object kind and defined name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlHeader {
    pub object: ObjectKeyword,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum HeaderToken {
    Word { value: String, quoted: bool },
    Period,
    Eq,
    Other,
}

/// Leading significant tokens of one statement
#[derive(Debug, Clone)]
pub struct Header {
    tokens: Vec<HeaderToken>,
}

impl Header {
    /// Read the header of a statement's text
    pub fn read(dialect: &dyn Dialect, sql: &str) -> SqlResult<Self> {
        let tokens = tokenize(dialect, sql)?;
        Ok(Self::from_tokens(&tokens))
    }

    pub fn from_tokens(tokens: &[Token]) -> Self {
        let tokens = tokens
            .iter()
            .filter(|t| !is_trivia(t))
            .take(HEADER_TOKEN_LIMIT)
            .map(|t| match t {
                Token::Word(w) => HeaderToken::Word {
                    value: w.value.clone(),
                    quoted: w.quote_style.is_some(),
                },
                Token::Period => HeaderToken::Period,
                Token::Eq => HeaderToken::Eq,
                _ => HeaderToken::Other,
            })
            .collect();
        Self { tokens }
    }

    /// Upper-cased unquoted word at `index`
    fn keyword_at(&self, index: usize) -> Option<String> {
        match self.tokens.get(index)? {
            HeaderToken::Word {
                value,
                quoted: false,
            } => Some(value.to_uppercase()),
            _ => None,
        }
    }

    fn is_keyword(&self, index: usize, keyword: &str) -> bool {
        self.keyword_at(index).as_deref() == Some(keyword)
    }

    /// Leading keyword of the statement, upper-cased
    pub fn verb(&self) -> Option<String> {
        self.keyword_at(0)
    }

    /// Read a dotted object name starting at `index`.
    ///
    /// Returns the name (parts joined with `.`, quotes removed) and the index
    /// following it.
    fn object_name_at(&self, mut index: usize) -> Option<(String, usize)> {
        let mut parts = Vec::new();
        loop {
            match self.tokens.get(index) {
                Some(HeaderToken::Word { value, .. }) => parts.push(value.clone()),
                _ => break,
            }
            index += 1;
            if self.tokens.get(index) == Some(&HeaderToken::Period) {
                index += 1;
            } else {
                break;
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some((parts.join("."), index))
        }
    }

    /// Classify a `CREATE`/`ALTER` header.
    ///
    /// Returns `None` when the statement is not DDL or names an object kind
    /// outside [`ObjectKeyword`].
    pub fn ddl(&self) -> Option<DdlHeader> {
        let verb = self.verb()?;
        if verb != "CREATE" && verb != "ALTER" {
            return None;
        }
        let mut index = 1;
        while self
            .keyword_at(index)
            .is_some_and(|k| CREATE_MODIFIERS.contains(&k.as_str()))
        {
            index += 1;
        }
        let object = match self.keyword_at(index)?.as_str() {
            "TABLE" => ObjectKeyword::Table,
            "VIEW" => ObjectKeyword::View,
            "MATERIALIZED" if self.is_keyword(index + 1, "VIEW") => {
                index += 1;
                ObjectKeyword::MaterializedView
            }
            "FUNCTION" => ObjectKeyword::Function,
            "PROCEDURE" | "PROC" => ObjectKeyword::Procedure,
            "TRIGGER" => ObjectKeyword::Trigger,
            "SYNONYM" => ObjectKeyword::Synonym,
            _ => return None,
        };
        index += 1;
        index = self.skip_if_exists(index);
        let name = self.object_name_at(index).map(|(name, _)| name);
        Some(DdlHeader { object, name })
    }

    fn skip_if_exists(&self, index: usize) -> usize {
        if !self.is_keyword(index, "IF") {
            return index;
        }
        if self.is_keyword(index + 1, "NOT") && self.is_keyword(index + 2, "EXISTS") {
            index + 3
        } else if self.is_keyword(index + 1, "EXISTS") {
            index + 2
        } else {
            index
        }
    }

    /// Target table of an `UPDATE`, `DELETE`, `MERGE` or `INSERT` header
    pub fn dml_target(&self) -> Option<String> {
        let verb = self.verb()?;
        let mut index = 1;
        match verb.as_str() {
            "UPDATE" => {}
            "DELETE" => {
                if self.is_keyword(index, "FROM") {
                    index += 1;
                }
            }
            "MERGE" | "INSERT" => {
                while self
                    .keyword_at(index)
                    .is_some_and(|k| matches!(k.as_str(), "INTO" | "OVERWRITE" | "TABLE"))
                {
                    index += 1;
                }
            }
            _ => return None,
        }
        self.object_name_at(index).map(|(name, _)| name)
    }

    /// Routine named by an `EXEC`, `EXECUTE` or `CALL` header.
    ///
    /// A T-SQL return-value capture (`EXEC @rc = proc`) is skipped.
    pub fn exec_target(&self) -> Option<String> {
        let verb = self.verb()?;
        if !matches!(verb.as_str(), "EXEC" | "EXECUTE" | "CALL") {
            return None;
        }
        let mut index = 1;
        if self.tokens.get(index + 1) == Some(&HeaderToken::Eq) {
            index += 2;
        }
        self.object_name_at(index).map(|(name, _)| name)
    }
}

#[cfg(test)]
#[path = "header_test.rs"]
mod tests;
