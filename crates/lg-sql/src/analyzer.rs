//! Statement analyzer: turns one statement into an [`ExtractionRecord`].

use crate::calls::CallDetector;
use crate::error::{SqlError, SqlResult};
use crate::extractor::{
    cte_names, extract_relations, first_relation, object_name, outer_query, table_aliases,
};
use crate::fallback::{match_synonym, match_trigger};
use crate::header::{DdlHeader, Header, ObjectKeyword};
use crate::lineage::derive_columns;
use crate::parser::{OpaqueCommand, SqlParser, SqlStatement, StatementFailure};
use lg_core::naming::{normalize_name, unquote_identifier};
use lg_core::record::{
    CallType, ColumnDefinition, ColumnDerivation, ExprType, ExtractionRecord, ProcedureCall,
    StatementKind, CONSOLE_TARGET,
};
use serde::Serialize;
use sqlparser::ast::{CreateTable, Insert, Query, SetExpr, Statement, TableObject};
use std::collections::{BTreeSet, HashSet};

/// A successfully analyzed statement with its script position
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedStatement {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub record: ExtractionRecord,
}

/// Records and per-statement failures of one script
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScriptAnalysis {
    pub records: Vec<AnalyzedStatement>,
    pub failures: Vec<StatementFailure>,
}

/// Converts parsed statements into extraction records
pub struct Analyzer {
    parser: SqlParser,
    calls: CallDetector,
}

impl Analyzer {
    pub fn new(parser: SqlParser) -> Self {
        Self {
            parser,
            calls: CallDetector::new(),
        }
    }

    /// Create an analyzer for a dialect name (see [`SqlParser::from_dialect_name`])
    pub fn from_dialect_name(name: &str) -> SqlResult<Self> {
        SqlParser::from_dialect_name(name).map(Self::new)
    }

    /// Add function names that are never reported as routine calls
    pub fn with_builtin_functions<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.calls = self.calls.with_builtins(extra);
        self
    }

    pub fn parser(&self) -> &SqlParser {
        &self.parser
    }

    /// Analyze every statement of a script.
    ///
    /// Parse and analysis failures are collected per statement; one bad
    /// statement never hides the records of its siblings.
    pub fn analyze_script(&self, sql: &str) -> ScriptAnalysis {
        let script = self.parser.parse_script(sql);
        let mut analysis = ScriptAnalysis {
            records: Vec::with_capacity(script.statements.len()),
            failures: script.failures,
        };

        for item in script.statements {
            match self.analyze(&item.statement) {
                Ok(record) => analysis.records.push(AnalyzedStatement {
                    index: item.index,
                    line: item.line,
                    record,
                }),
                Err(error) => {
                    log::warn!("Skipping statement {}: {}", item.index + 1, error);
                    analysis.failures.push(StatementFailure {
                        index: item.index,
                        line: item.line,
                        sql: item.statement.text(),
                        error,
                    });
                }
            }
        }
        analysis.failures.sort_by_key(|f| f.index);
        analysis
    }

    /// Analyze a single statement
    pub fn analyze(&self, statement: &SqlStatement) -> SqlResult<ExtractionRecord> {
        let record = match statement {
            SqlStatement::Parsed(stmt) => self.analyze_tree(stmt)?,
            SqlStatement::Command(cmd) => self.analyze_command(cmd)?,
        };
        log::debug!(
            "Analyzed {} statement: write={:?}, {} read(s), {} column(s)",
            record.kind,
            record.write,
            record.read.len(),
            record.columns.len()
        );
        Ok(record)
    }

    fn analyze_tree(&self, stmt: &Statement) -> SqlResult<ExtractionRecord> {
        let mut record = match stmt {
            Statement::Query(query) => query_record(query),
            Statement::Insert(insert) => insert_record(insert)?,
            Statement::CreateTable(create) => create_table_record(create)?,
            Statement::CreateFunction(func) => {
                let mut record = ExtractionRecord::new(StatementKind::CreateFunction);
                record
                    .functions_and_procedures
                    .insert(object_name(&func.name));
                record
            }
            Statement::Call(func) => {
                let mut record = ExtractionRecord::new(StatementKind::Call);
                record
                    .procedure_calls
                    .push(stored_procedure(object_name(&func.name)));
                record
            }
            _ => self.header_record(stmt)?,
        };

        resolve_write_alias(stmt, &mut record);
        collect_reads(stmt, &mut record);
        self.collect_calls(stmt, &mut record);
        if record.kind == StatementKind::Select
            && record.write.is_none()
            && (!record.read.is_empty() || !record.columns.is_empty())
        {
            record.write = Some(CONSOLE_TARGET.to_string());
        }
        Ok(record)
    }

    /// Classify statements from their canonical header text
    fn header_record(&self, stmt: &Statement) -> SqlResult<ExtractionRecord> {
        let text = stmt.to_string();
        let header = Header::read(self.parser.parser_dialect(), &text)?;

        if let Some(ddl) = header.ddl() {
            return ddl_record(ddl, &text, Some(stmt));
        }

        let verb = header
            .verb()
            .ok_or_else(|| SqlError::MalformedInput("statement has no leading keyword".to_string()))?;
        let kind = match verb.as_str() {
            "UPDATE" => StatementKind::Update,
            "DELETE" => StatementKind::Delete,
            "MERGE" => StatementKind::Merge,
            "EXEC" | "EXECUTE" | "CALL" => return exec_record(&header),
            _ => return Err(SqlError::UnsupportedStatement(verb)),
        };
        let target = header
            .dml_target()
            .or_else(|| first_relation(stmt))
            .ok_or_else(|| SqlError::MalformedInput(format!("{} without a target table", verb)))?;

        let mut record = ExtractionRecord::new(kind);
        record.write = Some(target);
        Ok(record)
    }

    fn analyze_command(&self, cmd: &OpaqueCommand) -> SqlResult<ExtractionRecord> {
        if cmd.text.trim().is_empty() {
            return Err(SqlError::MalformedInput("empty command".to_string()));
        }
        let header = Header::read(self.parser.parser_dialect(), &cmd.text)?;
        match cmd.verb.as_str() {
            "CREATE" | "ALTER" => match header.ddl() {
                Some(ddl) => ddl_record(ddl, &cmd.text, None),
                None => pattern_record(&cmd.text)
                    .ok_or_else(|| SqlError::UnsupportedStatement(format!("{} command", cmd.verb))),
            },
            "EXEC" | "EXECUTE" => exec_record(&header),
            other => Err(SqlError::UnsupportedStatement(format!("{} command", other))),
        }
    }

    /// Report calls of non-built-in functions
    fn collect_calls(&self, stmt: &Statement, record: &mut ExtractionRecord) {
        let target_tables: BTreeSet<String> = record.write.iter().cloned().collect();
        for name in self.calls.function_calls(stmt) {
            if record.functions_and_procedures.contains(&name) {
                continue;
            }
            record.procedure_calls.push(ProcedureCall {
                name,
                call_type: CallType::FunctionCall,
                target_tables: target_tables.clone(),
            });
        }
    }
}

fn stored_procedure(name: String) -> ProcedureCall {
    ProcedureCall {
        name,
        call_type: CallType::StoredProcedure,
        target_tables: BTreeSet::new(),
    }
}

fn query_record(query: &Query) -> ExtractionRecord {
    // SELECT ... INTO <table> writes a new table
    if let SetExpr::Select(select) = query.body.as_ref() {
        if let Some(into) = &select.into {
            let mut record = ExtractionRecord::new(StatementKind::CreateTableAs);
            record.write = Some(object_name(&into.name));
            record.columns = derive_columns(query);
            return record;
        }
    }
    let mut record = ExtractionRecord::new(StatementKind::Select);
    record.columns = derive_columns(query);
    record
}

fn insert_record(insert: &Insert) -> SqlResult<ExtractionRecord> {
    let target = match &insert.table {
        TableObject::TableName(name) => object_name(name),
        TableObject::TableFunction(func) => {
            return Err(SqlError::MalformedInput(format!(
                "INSERT target is a table function: {}",
                func.name
            )))
        }
    };
    let mut record = ExtractionRecord::new(StatementKind::Insert);
    record.write = Some(target);
    if let Some(source) = &insert.source {
        record.columns = derive_columns(source);
        let names: Vec<String> = insert
            .columns
            .iter()
            .map(|c| unquote_identifier(&c.to_string()).to_string())
            .collect();
        apply_column_list(&mut record.columns, &names);
    }
    Ok(record)
}

fn create_table_record(create: &CreateTable) -> SqlResult<ExtractionRecord> {
    let name = object_name(&create.name);
    if name.is_empty() {
        return Err(SqlError::MalformedInput(
            "CREATE TABLE without a table name".to_string(),
        ));
    }
    let mut record = match &create.query {
        Some(query) => {
            let mut record = ExtractionRecord::new(StatementKind::CreateTableAs);
            record.columns = derive_columns(query);
            let names: Vec<String> = create.columns.iter().map(|c| c.name.value.clone()).collect();
            apply_column_list(&mut record.columns, &names);
            record
        }
        None => {
            let mut record = ExtractionRecord::new(StatementKind::CreateTable);
            record.column_definitions = create
                .columns
                .iter()
                .map(|c| ColumnDefinition {
                    name: c.name.value.clone(),
                    data_type: c.data_type.to_string(),
                })
                .collect();
            record
        }
    };
    record.write = Some(name);
    Ok(record)
}

/// Rename derivations positionally after an explicit target column list.
///
/// Left untouched when the projection contains a wildcard, since positions
/// no longer line up.
fn apply_column_list(columns: &mut [ColumnDerivation], names: &[String]) {
    if names.is_empty() || columns.iter().any(|c| c.expr_type == ExprType::Wildcard) {
        return;
    }
    if names.len() != columns.len() {
        log::debug!(
            "Column list has {} name(s) for {} projection(s)",
            names.len(),
            columns.len()
        );
    }
    for (col, name) in columns.iter_mut().zip(names) {
        col.target = name.clone();
    }
}

fn ddl_record(ddl: DdlHeader, text: &str, stmt: Option<&Statement>) -> SqlResult<ExtractionRecord> {
    let name = ddl.name.ok_or_else(|| {
        SqlError::MalformedInput(format!("{:?} definition without an object name", ddl.object))
    })?;
    let source_columns = || {
        stmt.and_then(outer_query)
            .map(|q| derive_columns(&q))
            .unwrap_or_default()
    };

    let record = match ddl.object {
        ObjectKeyword::View => {
            let mut record = ExtractionRecord::new(StatementKind::CreateView);
            record.views.insert(name.clone());
            record.write = Some(name);
            record.columns = source_columns();
            record
        }
        ObjectKeyword::MaterializedView => {
            let mut record = ExtractionRecord::new(StatementKind::CreateMaterializedView);
            record.materialized_views.insert(name.clone());
            record.write = Some(name);
            record.columns = source_columns();
            record
        }
        ObjectKeyword::Function => {
            let mut record = ExtractionRecord::new(StatementKind::CreateFunction);
            record.functions_and_procedures.insert(name);
            record
        }
        ObjectKeyword::Procedure => {
            let mut record = ExtractionRecord::new(StatementKind::CreateProcedure);
            record.functions_and_procedures.insert(name);
            record
        }
        ObjectKeyword::Trigger => {
            let trigger = match_trigger(text).ok_or_else(|| {
                SqlError::MalformedInput(format!("trigger {} without an ON target", name))
            })?;
            let mut record = ExtractionRecord::new(StatementKind::CreateTrigger);
            record.triggers.push(trigger);
            record
        }
        ObjectKeyword::Synonym => {
            let synonym = match_synonym(text).ok_or_else(|| {
                SqlError::MalformedInput(format!("synonym {} without a FOR target", name))
            })?;
            let mut record = ExtractionRecord::new(StatementKind::CreateSynonym);
            record.synonyms.push(synonym);
            record
        }
        ObjectKeyword::Table => {
            return Err(SqlError::UnsupportedStatement(format!(
                "table definition change on {}",
                name
            )))
        }
    };
    Ok(record)
}

/// Pattern rules for opaque commands whose header is not recognized
fn pattern_record(text: &str) -> Option<ExtractionRecord> {
    if let Some(trigger) = match_trigger(text) {
        let mut record = ExtractionRecord::new(StatementKind::CreateTrigger);
        record.triggers.push(trigger);
        return Some(record);
    }
    let synonym = match_synonym(text)?;
    let mut record = ExtractionRecord::new(StatementKind::CreateSynonym);
    record.synonyms.push(synonym);
    Some(record)
}

fn exec_record(header: &Header) -> SqlResult<ExtractionRecord> {
    let name = header
        .exec_target()
        .ok_or_else(|| SqlError::MalformedInput("EXEC without a procedure name".to_string()))?;
    let mut record = ExtractionRecord::new(StatementKind::Call);
    record.procedure_calls.push(stored_procedure(name));
    Ok(record)
}

/// Replace a write target that is a table alias (`UPDATE o ... FROM orders o`)
fn resolve_write_alias(stmt: &Statement, record: &mut ExtractionRecord) {
    let Some(write) = record.write.as_deref() else {
        return;
    };
    if write.contains('.') {
        return;
    }
    if let Some(table) = table_aliases(stmt).get(&write.to_lowercase()) {
        record.write = Some(table.clone());
    }
}

/// Every table the statement references, minus the write target, names
/// bound by `WITH`, and table aliases.
///
/// A name that is an alias and also the aliased table of another reference
/// (`FROM a AS b JOIN b AS c`) is a real table and stays a read.
fn collect_reads(stmt: &Statement, record: &mut ExtractionRecord) {
    let ctes = cte_names(stmt);
    let aliases = table_aliases(stmt);
    let aliased: HashSet<String> = aliases.values().map(|t| normalize_name(t)).collect();
    for relation in extract_relations(stmt) {
        let key = normalize_name(&relation);
        if ctes.contains(&key) {
            continue;
        }
        let is_alias = !aliased.contains(&key)
            && aliases
                .get(&key)
                .is_some_and(|table| normalize_name(table) != key);
        if is_alias {
            continue;
        }
        record.add_read(&relation);
    }
    record.exclude_write_from_reads();
}

#[cfg(test)]
#[path = "analyzer_test.rs"]
mod tests;
