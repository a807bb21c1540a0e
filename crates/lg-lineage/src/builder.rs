//! Entity/relationship builder
//!
//! Turns one [`ExtractionRecord`] into graph entities and relationships
//! ([`plan`]) and upserts them into a [`GraphStore`] ([`LineageBuilder::build`]).

use crate::error::{LineageWarning, WriteFailure};
use lg_core::naming::{
    data_type_id, normalize_name, pipeline_id, script_id, split_column_ref, split_name,
    transformation_id,
};
use lg_core::record::CallType;
use lg_core::{
    EntityId, EntityType, ExprType, ExtractionRecord, GraphEntity, GraphRelationship,
    QualifiedName, RelationshipType, StatementKind,
};
use lg_store::GraphStore;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Confidence of a source whose qualifier names no table the statement reads
pub const PARTIAL_CONFIDENCE: f64 = 0.7;

/// `lineage_confidence` recorded on columns with unresolved sources
pub const UNRESOLVED_CONFIDENCE: f64 = 0.5;

/// Where a record came from and how its names are qualified
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildContext {
    /// Script path or logical name owning the statement
    pub script: String,
    pub database: Option<String>,
    pub schema: Option<String>,
    /// Checksum of the script text
    pub checksum: Option<String>,
    /// Pipeline the script belongs to
    pub pipeline: Option<String>,
}

impl BuildContext {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            ..Self::default()
        }
    }

    pub fn with_defaults(mut self, database: Option<&str>, schema: Option<&str>) -> Self {
        self.database = database.map(str::to_string);
        self.schema = schema.map(str::to_string);
        self
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn with_pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.pipeline = Some(pipeline.into());
        self
    }

    /// Qualify a name as written, filling missing parts from the defaults
    pub fn qualify(&self, raw: &str) -> Option<QualifiedName> {
        QualifiedName::parse(raw)
            .map(|q| q.with_defaults(self.database.as_deref(), self.schema.as_deref()))
    }
}

/// Planned graph writes for one record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphFragment {
    pub entities: Vec<GraphEntity>,
    pub relationships: Vec<GraphRelationship>,
    /// Entities the record only refers to. They are written only when absent,
    /// so an existing definition keeps its type.
    pub references: HashSet<EntityId>,
    pub warnings: Vec<LineageWarning>,
}

impl GraphFragment {
    pub fn entity(&self, id: &str) -> Option<&GraphEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn relationship(
        &self,
        source_id: &str,
        target_id: &str,
        relationship_type: RelationshipType,
    ) -> Option<&GraphRelationship> {
        self.relationships.iter().find(|r| {
            r.source_id == source_id
                && r.target_id == target_id
                && r.relationship_type == relationship_type
        })
    }

    pub fn relationships_of(&self, relationship_type: RelationshipType) -> impl Iterator<Item = &GraphRelationship> {
        self.relationships
            .iter()
            .filter(move |r| r.relationship_type == relationship_type)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}

/// Plan the graph writes for a record.
///
/// Deterministic and free of side effects; entities and relationships are
/// deduplicated and self edges are never produced.
pub fn plan(record: &ExtractionRecord, ctx: &BuildContext) -> GraphFragment {
    if record.is_empty() {
        return GraphFragment::default();
    }
    let mut planner = Planner {
        record,
        ctx,
        fragment: GraphFragment::default(),
        entity_index: HashMap::new(),
        edge_keys: HashSet::new(),
        script: script_id(&ctx.script),
        write: None,
        reads: Vec::new(),
    };
    planner.script();
    planner.relations();
    planner.columns();
    planner.column_definitions();
    planner.routines();
    planner.triggers();
    planner.synonyms();
    planner.fragment
}

struct Planner<'a> {
    record: &'a ExtractionRecord,
    ctx: &'a BuildContext,
    fragment: GraphFragment,
    entity_index: HashMap<EntityId, usize>,
    edge_keys: HashSet<(EntityId, EntityId, RelationshipType)>,
    script: EntityId,
    write: Option<(String, QualifiedName)>,
    reads: Vec<(String, QualifiedName)>,
}

impl Planner<'_> {
    fn add_entity(&mut self, entity: GraphEntity, defined: bool) {
        let Some(&index) = self.entity_index.get(&entity.id) else {
            if !defined {
                self.fragment.references.insert(entity.id.clone());
            }
            self.entity_index
                .insert(entity.id.clone(), self.fragment.entities.len());
            self.fragment.entities.push(entity);
            return;
        };

        let existing = &mut self.fragment.entities[index];
        if defined && self.fragment.references.remove(&entity.id) {
            let previous = std::mem::replace(existing, entity);
            for (key, value) in previous.properties {
                existing.properties.entry(key).or_insert(value);
            }
            return;
        }
        existing.database = existing.database.take().or(entity.database);
        existing.schema = existing.schema.take().or(entity.schema);
        existing.data_type = existing.data_type.take().or(entity.data_type);
        existing.file_path = existing.file_path.take().or(entity.file_path);
        for (key, value) in entity.properties {
            existing.properties.entry(key).or_insert(value);
        }
    }

    fn add_edge(&mut self, relationship: GraphRelationship) {
        if relationship.is_self_edge() {
            return;
        }
        if self.edge_keys.insert(relationship.key()) {
            self.fragment.relationships.push(relationship);
        }
    }

    fn warn(&mut self, warning: LineageWarning) {
        if !self.fragment.warnings.contains(&warning) {
            self.fragment.warnings.push(warning);
        }
    }

    fn qualify(&mut self, raw: &str, context: &str) -> Option<QualifiedName> {
        let name = self.ctx.qualify(raw);
        if name.is_none() {
            self.warn(LineageWarning::UnnamedObject {
                context: context.to_string(),
                name: raw.to_string(),
            });
        }
        name
    }

    /// Owned column plus its single CONTAINS edge
    fn add_column(&mut self, column: GraphEntity, table: &QualifiedName, defined: bool) {
        let edge = GraphRelationship::new(table.entity_id(), column.id.clone(), RelationshipType::Contains);
        self.add_entity(column, defined);
        self.add_edge(edge);
    }

    fn script(&mut self) {
        let ctx = self.ctx;
        let mut script = GraphEntity::new(self.script.clone(), EntityType::Script, ctx.script.clone())
            .with_file_path(ctx.script.clone());
        if let Some(checksum) = &ctx.checksum {
            script = script.with_property("checksum", checksum.clone());
        }
        self.add_entity(script, true);

        if let Some(pipeline) = &ctx.pipeline {
            let id = pipeline_id(pipeline);
            self.add_entity(GraphEntity::new(id.clone(), EntityType::Pipeline, pipeline.clone()), true);
            self.add_edge(GraphRelationship::new(id, self.script.clone(), RelationshipType::Contains));
        }
    }

    fn defines_write(&self) -> bool {
        matches!(
            self.record.kind,
            StatementKind::CreateTable
                | StatementKind::CreateTableAs
                | StatementKind::CreateView
                | StatementKind::CreateMaterializedView
        )
    }

    fn write_entity(&self, raw: &str, name: &QualifiedName) -> GraphEntity {
        let in_set = |set: &BTreeSet<String>| {
            set.iter().any(|v| normalize_name(v) == normalize_name(raw))
        };
        if self.record.kind == StatementKind::CreateMaterializedView || in_set(&self.record.materialized_views) {
            GraphEntity::view(name, true)
        } else if self.record.kind == StatementKind::CreateView || in_set(&self.record.views) {
            GraphEntity::view(name, false)
        } else {
            GraphEntity::table(name)
        }
    }

    fn relations(&mut self) {
        let record = self.record;
        if let Some(raw) = record.write.as_deref().filter(|_| !record.writes_to_console()) {
            if let Some(name) = self.qualify(raw, "write target") {
                let entity = self.write_entity(raw, &name);
                let defined = self.defines_write();
                self.add_entity(entity, defined);
                self.add_edge(GraphRelationship::new(
                    self.script.clone(),
                    name.entity_id(),
                    RelationshipType::WritesTo,
                ));
                self.write = Some((raw.to_string(), name));
            }
        }

        let kind = record.kind.as_str();
        let write_id = self.write.as_ref().map(|(_, w)| w.entity_id());
        for raw in &record.read {
            let Some(name) = self.qualify(raw, "read table") else {
                continue;
            };
            self.add_entity(GraphEntity::table(&name), false);
            self.add_edge(GraphRelationship::new(
                self.script.clone(),
                name.entity_id(),
                RelationshipType::ReadsFrom,
            ));
            if let Some(write_id) = &write_id {
                let edge = GraphRelationship::lineage(
                    RelationshipType::TransformsTo,
                    write_id.clone(),
                    name.entity_id(),
                )
                .with_property("statement_kind", kind);
                self.add_edge(edge);
            }
            self.reads.push((raw.clone(), name));
        }
    }

    fn columns(&mut self) {
        let Some((_, table)) = self.write.clone() else {
            return;
        };
        let record = self.record;
        for derivation in &record.columns {
            if derivation.expr_type == ExprType::Wildcard || derivation.target.ends_with('*') {
                continue;
            }
            let mut column = GraphEntity::column(&table, &derivation.target);
            if let Some(cast) = &derivation.cast_type {
                column = column.with_data_type(cast.clone());
            }
            if derivation.is_unresolved() {
                column = column.with_property("lineage_confidence", UNRESOLVED_CONFIDENCE);
                self.warn(LineageWarning::UnresolvedColumn {
                    column: format!("{}.{}", table, derivation.target),
                    transformation: derivation.transformation.clone(),
                });
            }
            let target_id = column.id.clone();
            self.add_column(column, &table, true);

            if let Some(cast) = &derivation.cast_type {
                let data_type = GraphEntity::new(data_type_id(cast), EntityType::DataType, cast.clone());
                let edge = GraphRelationship::new(target_id.clone(), data_type.id.clone(), RelationshipType::CastsTo)
                    .with_transformation(derivation.transformation.clone());
                self.add_entity(data_type, true);
                self.add_edge(edge);
            }

            for source in &derivation.sources {
                if source.ends_with(".*") {
                    continue;
                }
                let (qualifier, column_name) = split_column_ref(source);
                for (source_table, confidence) in self.resolve_source(&derivation.target, source, qualifier) {
                    self.add_entity(GraphEntity::table(&source_table), false);
                    let source_column = GraphEntity::column(&source_table, &column_name);
                    let edge = GraphRelationship::lineage(
                        RelationshipType::DerivesFrom,
                        target_id.clone(),
                        source_column.id.clone(),
                    )
                    .with_transformation(derivation.transformation.clone())
                    .with_confidence(confidence);
                    self.add_column(source_column, &source_table, false);
                    self.add_edge(edge);
                }
            }
        }
    }

    /// Candidate tables for one source column with their confidence
    fn resolve_source(
        &mut self,
        target: &str,
        source: &str,
        qualifier: Option<String>,
    ) -> Vec<(QualifiedName, f64)> {
        if let Some(qualifier) = qualifier {
            if let Some(table) = self.match_table(&qualifier) {
                return vec![(table, 1.0)];
            }
            return self
                .qualify(&qualifier, "column qualifier")
                .map(|table| vec![(table, PARTIAL_CONFIDENCE)])
                .unwrap_or_default();
        }

        // A statement reading nothing refers to its own target (UPDATE t SET a = b)
        let candidates: Vec<QualifiedName> = if self.reads.is_empty() {
            self.write.iter().map(|(_, w)| w.clone()).collect()
        } else {
            self.reads.iter().map(|(_, r)| r.clone()).collect()
        };
        if candidates.is_empty() {
            self.warn(LineageWarning::UnattachedSource {
                column: target.to_string(),
                source: source.to_string(),
            });
            return Vec::new();
        }
        let confidence = 1.0 / candidates.len() as f64;
        candidates.into_iter().map(|t| (t, confidence)).collect()
    }

    /// Read or write table a qualifier refers to, by trailing name parts or by id
    fn match_table(&self, qualifier: &str) -> Option<QualifiedName> {
        let wanted: Vec<String> = split_name(qualifier).iter().map(|p| p.to_lowercase()).collect();
        if wanted.is_empty() {
            return None;
        }
        let wanted_id = self.ctx.qualify(qualifier).map(|q| q.entity_id());
        self.reads
            .iter()
            .chain(self.write.iter())
            .find(|(raw, name)| {
                let parts: Vec<String> = split_name(raw).iter().map(|p| p.to_lowercase()).collect();
                parts.ends_with(&wanted) || wanted_id.as_ref() == Some(&name.entity_id())
            })
            .map(|(_, name)| name.clone())
    }

    fn column_definitions(&mut self) {
        let Some((_, table)) = self.write.clone() else {
            return;
        };
        let record = self.record;
        for definition in &record.column_definitions {
            let column = GraphEntity::column(&table, &definition.name)
                .with_data_type(definition.data_type.clone());
            self.add_column(column, &table, true);
        }
    }

    fn routine(&self, name: &QualifiedName, object_kind: &str) -> GraphEntity {
        let mut entity = GraphEntity::new(transformation_id(name), EntityType::Transformation, name.name.clone())
            .with_property("object_kind", object_kind);
        entity.database = name.database.clone();
        entity.schema = name.schema.clone();
        entity
    }

    fn routines(&mut self) {
        let record = self.record;
        let object_kind = match record.kind {
            StatementKind::CreateFunction => "function",
            StatementKind::CreateProcedure => "procedure",
            _ => "routine",
        };
        for raw in &record.functions_and_procedures {
            let Some(name) = self.qualify(raw, "routine") else {
                continue;
            };
            let entity = self
                .routine(&name, object_kind)
                .with_file_path(self.ctx.script.clone());
            self.add_entity(entity, true);
        }

        for call in &record.procedure_calls {
            let Some(name) = self.qualify(&call.name, "called routine") else {
                continue;
            };
            let (object_kind, call_type) = match call.call_type {
                CallType::StoredProcedure => ("procedure", "stored_procedure"),
                CallType::FunctionCall => ("function", "function_call"),
            };
            let routine = self.routine(&name, object_kind);
            let routine_id = routine.id.clone();
            self.add_entity(routine, false);
            self.add_edge(
                GraphRelationship::new(self.script.clone(), routine_id.clone(), RelationshipType::Executes)
                    .with_property("call_type", call_type),
            );
            for raw in &call.target_tables {
                let Some(table) = self.qualify(raw, "call target") else {
                    continue;
                };
                self.add_entity(GraphEntity::table(&table), false);
                self.add_edge(GraphRelationship::new(
                    table.entity_id(),
                    routine_id.clone(),
                    RelationshipType::DependsOn,
                ));
            }
        }
    }

    fn triggers(&mut self) {
        let record = self.record;
        for trigger in &record.triggers {
            let (Some(name), Some(table)) = (
                self.qualify(&trigger.name, "trigger"),
                self.qualify(&trigger.target_table, "trigger target"),
            ) else {
                continue;
            };
            let entity = self
                .routine(&name, "trigger")
                .with_file_path(self.ctx.script.clone());
            let trigger_id = entity.id.clone();
            self.add_entity(entity, true);
            self.add_entity(GraphEntity::table(&table), false);
            self.add_edge(GraphRelationship::new(
                trigger_id,
                table.entity_id(),
                RelationshipType::DependsOn,
            ));
        }
    }

    fn synonyms(&mut self) {
        let record = self.record;
        for synonym in &record.synonyms {
            let (Some(name), Some(target)) = (
                self.qualify(&synonym.name, "synonym"),
                self.qualify(&synonym.target_object, "synonym target"),
            ) else {
                continue;
            };
            let entity = GraphEntity::view(&name, false).with_property("object_kind", "synonym");
            self.add_entity(entity, true);
            self.add_entity(GraphEntity::table(&target), false);
            self.add_edge(
                GraphRelationship::lineage(
                    RelationshipType::DerivesFrom,
                    name.entity_id(),
                    target.entity_id(),
                )
                .with_transformation(format!("SYNONYM FOR {}", synonym.target_object)),
            );
        }
    }
}

/// Outcome of writing one fragment
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub entities_written: usize,
    pub relationships_written: usize,
    pub warnings: Vec<LineageWarning>,
    pub failures: Vec<WriteFailure>,
}

impl BuildReport {
    pub fn merge(&mut self, other: BuildReport) {
        self.entities_written += other.entities_written;
        self.relationships_written += other.relationships_written;
        self.warnings.extend(other.warnings);
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, item: String, message: impl ToString) {
        let message = message.to_string();
        log::warn!("Graph write failed for {}: {}", item, message);
        self.failures.push(WriteFailure { item, message });
    }
}

/// Writes planned fragments into an injected graph store
pub struct LineageBuilder {
    store: Arc<dyn GraphStore>,
}

impl LineageBuilder {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub fn plan(&self, record: &ExtractionRecord, ctx: &BuildContext) -> GraphFragment {
        plan(record, ctx)
    }

    /// Plan a record and upsert it, stamping the script with the ingestion time.
    pub async fn build(&self, record: &ExtractionRecord, ctx: &BuildContext) -> BuildReport {
        let mut fragment = plan(record, ctx);
        let now = chrono::Utc::now().to_rfc3339();
        for entity in fragment
            .entities
            .iter_mut()
            .filter(|e| e.entity_type == EntityType::Script)
        {
            entity
                .properties
                .insert("last_ingested_at".to_string(), Value::String(now.clone()));
        }
        self.write(fragment).await
    }

    /// Upsert a fragment: entities first, then relationships whose endpoints
    /// are both present. Failures are collected, never raised.
    pub async fn write(&self, fragment: GraphFragment) -> BuildReport {
        let GraphFragment {
            entities,
            relationships,
            references,
            warnings,
        } = fragment;
        for warning in &warnings {
            log::warn!("{}", warning);
        }
        let mut report = BuildReport {
            warnings,
            ..BuildReport::default()
        };

        let mut present: HashSet<EntityId> = HashSet::new();
        for entity in entities {
            if references.contains(&entity.id) {
                match self.store.get_vertex(&entity.id).await {
                    Ok(Some(_)) => {
                        present.insert(entity.id);
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        report.fail(entity.id.to_string(), e);
                        continue;
                    }
                }
            }
            let written = self
                .store
                .upsert_vertex(&entity.id, entity.label(), entity.to_properties())
                .await;
            match written {
                Ok(_) => {
                    report.entities_written += 1;
                    present.insert(entity.id);
                }
                Err(e) => report.fail(entity.id.to_string(), e),
            }
        }

        for relationship in relationships {
            let item = format!(
                "{} -[{}]-> {}",
                relationship.source_id, relationship.relationship_type, relationship.target_id
            );
            if !present.contains(&relationship.source_id) || !present.contains(&relationship.target_id) {
                report.fail(item, "skipped: endpoint was not written");
                continue;
            }
            match self
                .store
                .upsert_edge(
                    &relationship.source_id,
                    &relationship.target_id,
                    relationship.relationship_type.as_str(),
                    relationship.to_properties(),
                )
                .await
            {
                Ok(()) => report.relationships_written += 1,
                Err(e) => report.fail(item, e),
            }
        }

        log::debug!(
            "Wrote {} entities and {} relationships to {} store ({} failures)",
            report.entities_written,
            report.relationships_written,
            self.store.store_type(),
            report.failures.len()
        );
        report
    }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
