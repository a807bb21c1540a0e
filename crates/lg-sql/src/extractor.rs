//! Table reference extraction from SQL AST

use lg_core::naming::{normalize_name, split_name};
use sqlparser::ast::{
    visit_relations, ObjectName, Query, Statement, TableFactor, Visit, Visitor,
};
use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;

/// Render an object name as unquoted dotted text (`[dbo].[t]` → `dbo.t`)
pub fn object_name(name: &ObjectName) -> String {
    split_name(&name.to_string()).join(".")
}

/// Extract all table references of a statement, in visit order, deduplicated.
///
/// Uses `visit_relations` to walk the AST and collect every `ObjectName`
/// reference from FROM clauses, JOINs, subqueries and DML targets. Names
/// bound by `WITH` clauses are not filtered here; see [`cte_names`].
pub fn extract_relations(stmt: &Statement) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut relations = Vec::new();
    let _ = visit_relations(stmt, |relation| {
        let name = object_name(relation);
        if seen.insert(normalize_name(&name)) {
            relations.push(name);
        }
        ControlFlow::<()>::Continue(())
    });
    relations
}

/// First table reference of a statement, usually its DML target
pub fn first_relation(stmt: &Statement) -> Option<String> {
    let mut first = None;
    let _ = visit_relations(stmt, |relation| {
        first = Some(object_name(relation));
        ControlFlow::Break(())
    });
    first
}

#[derive(Default)]
struct CteCollector {
    names: HashSet<String>,
}

impl Visitor for CteCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.names.insert(cte.alias.name.value.to_lowercase());
            }
        }
        ControlFlow::Continue(())
    }
}

/// Lower-cased names bound by any `WITH` clause of the statement
pub fn cte_names(stmt: &Statement) -> HashSet<String> {
    let mut collector = CteCollector::default();
    let _ = stmt.visit(&mut collector);
    collector.names
}

#[derive(Default)]
struct AliasCollector {
    aliases: HashMap<String, String>,
}

impl Visitor for AliasCollector {
    type Break = ();

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Self::Break> {
        if let TableFactor::Table {
            name,
            alias: Some(alias),
            ..
        } = factor
        {
            self.aliases
                .insert(alias.name.value.to_lowercase(), object_name(name));
        }
        ControlFlow::Continue(())
    }
}

/// Table aliases of a statement: lower-cased alias to table name
pub fn table_aliases(stmt: &Statement) -> HashMap<String, String> {
    let mut collector = AliasCollector::default();
    let _ = stmt.visit(&mut collector);
    collector.aliases
}

struct OuterQueryFinder;

impl Visitor for OuterQueryFinder {
    type Break = Query;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        ControlFlow::Break(query.clone())
    }
}

/// Outermost query of a statement (the source of a DML or DDL statement)
pub fn outer_query(stmt: &Statement) -> Option<Query> {
    match stmt.visit(&mut OuterQueryFinder) {
        ControlFlow::Break(query) => Some(query),
        ControlFlow::Continue(()) => None,
    }
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
