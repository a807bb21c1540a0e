//! Column-level lineage extraction from SQL AST
//!
//! For each top-level output column of a query, the source column set is
//! computed by walking the projection's expression tree and resolving every
//! column reference through table aliases, derived tables, CTEs and scalar
//! subqueries down to base-table columns.
//!
//! Resolved sources are `table.column` when the reference was qualified, and
//! the bare column name otherwise; bare names are matched against the
//! statement's tables when the record is turned into graph entities.

use crate::extractor::object_name;
use lg_core::naming::normalize_name;
use lg_core::record::{ColumnDerivation, ExprType};
use sqlparser::ast::{
    Expr, Query, Select, SelectItem, SelectItemQualifiedWildcardKind, SetExpr, TableFactor,
    TableWithJoins, Visit, Visitor,
};
use std::collections::{BTreeSet, HashMap};
use std::ops::ControlFlow;

/// Output columns of the CTEs visible at a point of the query
type CteEnv = HashMap<String, Vec<ColumnDerivation>>;

#[derive(Debug, Clone)]
enum Relation {
    /// Base table, name as written
    Table(String),
    /// Derived table or CTE with resolved output columns
    Derived(Vec<ColumnDerivation>),
}

#[derive(Debug, Clone)]
struct Binding {
    alias: Option<String>,
    relation: Relation,
}

impl Binding {
    /// Whether a column qualifier refers to this binding
    fn matches(&self, qualifier: &str) -> bool {
        if let Some(alias) = &self.alias {
            return alias == qualifier;
        }
        match &self.relation {
            Relation::Table(name) => {
                let name = normalize_name(name);
                name == qualifier || name.rsplit('.').next() == Some(qualifier)
            }
            Relation::Derived(_) => false,
        }
    }
}

/// FROM-clause bindings of one SELECT, linked to enclosing SELECTs
struct Scope<'a> {
    bindings: Vec<Binding>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    fn lookup(&self, qualifier: &str) -> Option<&Relation> {
        self.bindings
            .iter()
            .find(|b| b.matches(qualifier))
            .map(|b| &b.relation)
            .or_else(|| self.parent.and_then(|p| p.lookup(qualifier)))
    }

    /// Sources of an unqualified column that a derived relation exposes.
    ///
    /// Stops at the first scope holding a base table, whose columns are unknown.
    fn lookup_unqualified(&self, column: &str) -> Option<BTreeSet<String>> {
        for binding in &self.bindings {
            if let Relation::Derived(cols) = &binding.relation {
                if let Some(col) = find_column(cols, column) {
                    return Some(col.sources.clone());
                }
            }
        }
        let has_tables = self
            .bindings
            .iter()
            .any(|b| matches!(b.relation, Relation::Table(_)));
        if has_tables {
            return None;
        }
        self.parent.and_then(|p| p.lookup_unqualified(column))
    }
}

fn find_column<'c>(cols: &'c [ColumnDerivation], name: &str) -> Option<&'c ColumnDerivation> {
    cols.iter().find(|c| c.target.eq_ignore_ascii_case(name))
}

/// Derive the output columns of a query
pub fn derive_columns(query: &Query) -> Vec<ColumnDerivation> {
    query_columns(query, &CteEnv::new(), None)
}

fn query_columns(query: &Query, ctes: &CteEnv, parent: Option<&Scope<'_>>) -> Vec<ColumnDerivation> {
    let mut env = ctes.clone();
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            let cols = query_columns(&cte.query, &env, parent);
            env.insert(cte.alias.name.value.to_lowercase(), cols);
        }
    }
    set_expr_columns(&query.body, &env, parent)
}

fn set_expr_columns(body: &SetExpr, env: &CteEnv, parent: Option<&Scope<'_>>) -> Vec<ColumnDerivation> {
    match body {
        SetExpr::Select(select) => select_columns(select, env, parent),
        SetExpr::Query(query) => query_columns(query, env, parent),
        SetExpr::SetOperation { left, right, .. } => {
            // Names come from the left operand; sources are unioned by position
            let mut cols = set_expr_columns(left, env, parent);
            let right_cols = set_expr_columns(right, env, parent);
            for (col, other) in cols.iter_mut().zip(right_cols) {
                if col.expr_type == ExprType::Literal && !other.sources.is_empty() {
                    col.expr_type = ExprType::Expression;
                }
                col.sources.extend(other.sources);
            }
            cols
        }
        _ => Vec::new(),
    }
}

fn select_columns(select: &Select, env: &CteEnv, parent: Option<&Scope<'_>>) -> Vec<ColumnDerivation> {
    let mut scope = Scope {
        bindings: Vec::new(),
        parent,
    };
    for table in &select.from {
        add_table_with_joins(table, env, parent, &mut scope.bindings);
    }

    let mut columns = Vec::new();
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) => {
                columns.push(derive_expr(expr, default_name(expr), env, &scope));
            }
            SelectItem::ExprWithAlias { expr, alias } => {
                columns.push(derive_expr(expr, alias.value.clone(), env, &scope));
            }
            SelectItem::Wildcard(_) => {
                let mut table_sources = BTreeSet::new();
                for binding in &scope.bindings {
                    match &binding.relation {
                        Relation::Derived(cols) => columns.extend(cols.iter().cloned()),
                        Relation::Table(name) => {
                            table_sources.insert(format!("{}.*", name));
                        }
                    }
                }
                if !table_sources.is_empty() {
                    let mut col = ColumnDerivation::new("*", "*", ExprType::Wildcard);
                    col.sources = table_sources;
                    columns.push(col);
                }
            }
            SelectItem::QualifiedWildcard(kind, _) => {
                let qualifier = match kind {
                    SelectItemQualifiedWildcardKind::ObjectName(name) => object_name(name),
                    SelectItemQualifiedWildcardKind::Expr(expr) => expr.to_string(),
                };
                match scope.lookup(&normalize_name(&qualifier)) {
                    Some(Relation::Derived(cols)) => columns.extend(cols.iter().cloned()),
                    Some(Relation::Table(name)) => {
                        let target = format!("{}.*", qualifier);
                        let mut col = ColumnDerivation::new(target.clone(), target, ExprType::Wildcard);
                        col.sources.insert(format!("{}.*", name));
                        columns.push(col);
                    }
                    None => {
                        let target = format!("{}.*", qualifier);
                        let mut col = ColumnDerivation::new(target.clone(), target.clone(), ExprType::Wildcard);
                        col.sources.insert(target);
                        columns.push(col);
                    }
                }
            }
        }
    }
    columns
}

fn add_table_with_joins(
    table: &TableWithJoins,
    env: &CteEnv,
    parent: Option<&Scope<'_>>,
    bindings: &mut Vec<Binding>,
) {
    add_table_factor(&table.relation, env, parent, bindings);
    for join in &table.joins {
        add_table_factor(&join.relation, env, parent, bindings);
    }
}

fn add_table_factor(
    factor: &TableFactor,
    env: &CteEnv,
    parent: Option<&Scope<'_>>,
    bindings: &mut Vec<Binding>,
) {
    match factor {
        TableFactor::Table { name, alias, .. } => {
            let table = object_name(name);
            let alias = alias.as_ref().map(|a| a.name.value.to_lowercase());
            let relation = match env.get(&normalize_name(&table)) {
                Some(cols) => Relation::Derived(cols.clone()),
                None => Relation::Table(table.clone()),
            };
            // A CTE without alias is still addressed by its own name
            let alias = match (&relation, alias) {
                (Relation::Derived(_), None) => Some(normalize_name(&table)),
                (_, alias) => alias,
            };
            bindings.push(Binding { alias, relation });
        }
        TableFactor::Derived {
            subquery, alias, ..
        } => {
            let cols = query_columns(subquery, env, parent);
            bindings.push(Binding {
                alias: alias.as_ref().map(|a| a.name.value.to_lowercase()),
                relation: Relation::Derived(cols),
            });
        }
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => add_table_with_joins(table_with_joins, env, parent, bindings),
        _ => {}
    }
}

/// Output name of an unaliased projection
fn default_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.clone(),
        Expr::CompoundIdentifier(idents) => idents
            .last()
            .map(|i| i.value.clone())
            .unwrap_or_else(|| expr.to_string()),
        Expr::Nested(inner) => default_name(inner),
        _ => expr.to_string(),
    }
}

fn classify(expr: &Expr) -> ExprType {
    match expr {
        Expr::Identifier(_) | Expr::CompoundIdentifier(_) => ExprType::Column,
        Expr::Function(_) => ExprType::Function,
        Expr::Value(_) => ExprType::Literal,
        Expr::Cast { .. } => ExprType::Cast,
        Expr::Case { .. } => ExprType::Case,
        Expr::Subquery(_) => ExprType::Subquery,
        Expr::Nested(inner) => classify(inner),
        _ => ExprType::Expression,
    }
}

fn cast_type(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Cast { data_type, .. } => Some(data_type.to_string()),
        Expr::Nested(inner) => cast_type(inner),
        _ => None,
    }
}

fn derive_expr(expr: &Expr, target: String, env: &CteEnv, scope: &Scope<'_>) -> ColumnDerivation {
    let mut collector = SourceCollector {
        env,
        scope,
        sources: BTreeSet::new(),
        depth: 0,
        references: false,
    };
    let _ = expr.visit(&mut collector);

    let mut expr_type = classify(expr);
    // Constants, column-free calls (GETDATE(), COUNT(*)) and string building
    // carry no lineage
    if !collector.references {
        expr_type = ExprType::Literal;
    }
    ColumnDerivation {
        target,
        sources: collector.sources,
        transformation: expr.to_string(),
        expr_type,
        cast_type: cast_type(expr),
    }
}

/// Collects the resolved source columns of one expression
struct SourceCollector<'s, 'a> {
    env: &'s CteEnv,
    scope: &'s Scope<'a>,
    sources: BTreeSet<String>,
    /// Nesting of subqueries below the expression root
    depth: usize,
    /// Whether any column or subquery was seen
    references: bool,
}

impl SourceCollector<'_, '_> {
    fn resolve(&mut self, qualifier: Option<String>, column: &str) {
        // T-SQL variables are not columns
        if column.starts_with('@') {
            return;
        }
        self.references = true;
        match qualifier {
            Some(qualifier) => match self.scope.lookup(&normalize_name(&qualifier)) {
                Some(Relation::Table(table)) => {
                    self.sources.insert(format!("{}.{}", table, column));
                }
                Some(Relation::Derived(cols)) => {
                    if let Some(col) = find_column(cols, column) {
                        self.sources.extend(col.sources.iter().cloned());
                    } else {
                        // Column exposed through a wildcard of the derived relation
                        for col in cols.iter().filter(|c| c.expr_type == ExprType::Wildcard) {
                            for source in &col.sources {
                                if let Some(table) = source.strip_suffix(".*") {
                                    self.sources.insert(format!("{}.{}", table, column));
                                }
                            }
                        }
                    }
                }
                None => {
                    self.sources.insert(format!("{}.{}", qualifier, column));
                }
            },
            None => match self.scope.lookup_unqualified(column) {
                Some(sources) => self.sources.extend(sources),
                None => {
                    self.sources.insert(column.to_string());
                }
            },
        }
    }
}

impl Visitor for SourceCollector<'_, '_> {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if self.depth == 0 {
            self.references = true;
            for col in query_columns(query, self.env, Some(self.scope)) {
                self.sources.extend(col.sources);
            }
        }
        self.depth += 1;
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.depth = self.depth.saturating_sub(1);
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if self.depth > 0 {
            return ControlFlow::Continue(());
        }
        match expr {
            Expr::Identifier(ident) => self.resolve(None, &ident.value),
            Expr::CompoundIdentifier(idents) => {
                if let Some((column, qualifier)) = idents.split_last() {
                    let qualifier = (!qualifier.is_empty()).then(|| {
                        qualifier
                            .iter()
                            .map(|i| i.value.as_str())
                            .collect::<Vec<_>>()
                            .join(".")
                    });
                    self.resolve(qualifier, &column.value);
                }
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
#[path = "lineage_test.rs"]
mod tests;
