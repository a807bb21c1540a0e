//! Lineage traversal engine
//!
//! Bounded, cycle-safe walks over the lineage graph. Which stored direction
//! counts as "upstream" comes from [`RelationshipType::upstream_direction`].

use crate::error::{LineageError, LineageResult};
use lg_core::naming::column_id;
use lg_core::{
    EdgeDirection, EntityId, EntityType, GraphEntity, GraphRelationship, QualifiedName,
    RelationshipType, DEFAULT_TRAVERSAL_DEPTH, MAX_TRAVERSAL_DEPTH, MIN_TRAVERSAL_DEPTH,
};
use lg_store::{EdgeStep, GraphStore, Path, TraversalQuery};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Maximum number of entities returned by [`LineageEngine::find_entities`]
pub const FIND_LIMIT: usize = 100;

/// One walk through the lineage graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineagePath {
    pub entities: Vec<GraphEntity>,
    pub relationships: Vec<GraphRelationship>,
    pub total_hops: usize,
    /// Transformation logic of each edge, in walk order
    pub transformations: Vec<String>,
    /// Product of the edge confidences
    pub confidence: f64,
}

impl LineagePath {
    fn from_store_path(path: Path) -> LineageResult<Self> {
        let entities = path
            .vertices
            .iter()
            .map(|v| GraphEntity::from_properties(&v.id, &v.label, &v.properties))
            .collect::<Result<Vec<_>, _>>()?;
        let relationships = path
            .edges
            .iter()
            .map(|e| GraphRelationship::from_properties(&e.source_id, &e.target_id, &e.label, &e.properties))
            .collect::<Result<Vec<_>, _>>()?;
        let transformations: Vec<String> = relationships
            .iter()
            .filter_map(|r| r.transformation_logic.clone())
            .collect();
        let confidence: f64 = relationships.iter().map(|r| r.confidence_score).product();
        Ok(Self {
            total_hops: relationships.len(),
            entities,
            relationships,
            transformations,
            confidence,
        })
    }

    /// Entity ids in walk order
    pub fn entity_ids(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.id.as_str()).collect()
    }
}

/// Transformations applied on the way to an entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformationSummary {
    pub entity_id: String,
    pub transformations: BTreeSet<String>,
    /// Every edge transformation over all paths, duplicates included
    pub transformation_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Passed,
    /// The derived entity declares a different type than its origin
    TypeChanged,
}

/// Declared type of an upstream origin, compared with the derived entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationRecord {
    /// Origin entity id
    pub source: String,
    /// Derived entity id
    pub target: String,
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_data_type: Option<String>,
    pub status: ValidationStatus,
}

/// Upstream and downstream lineage of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnTrace {
    pub column_id: String,
    pub upstream: Vec<LineagePath>,
    pub downstream: Vec<LineagePath>,
}

/// Scripts touching a table and the columns it owns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDependencies {
    pub table: Option<GraphEntity>,
    pub readers: Vec<GraphEntity>,
    pub writers: Vec<GraphEntity>,
    pub columns: Vec<GraphEntity>,
}

/// Answers lineage queries against an injected graph store
pub struct LineageEngine {
    store: Arc<dyn GraphStore>,
    default_depth: usize,
    database: Option<String>,
    schema: Option<String>,
}

impl LineageEngine {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            default_depth: DEFAULT_TRAVERSAL_DEPTH,
            database: None,
            schema: None,
        }
    }

    /// Depth used by operations that take none
    pub fn with_default_depth(mut self, depth: usize) -> LineageResult<Self> {
        self.default_depth = check_depth(depth)?;
        Ok(self)
    }

    /// Qualifiers applied to table names given to [`Self::trace_column`]
    pub fn with_name_defaults(mut self, database: Option<&str>, schema: Option<&str>) -> Self {
        self.database = database.map(str::to_string);
        self.schema = schema.map(str::to_string);
        self
    }

    pub fn default_depth(&self) -> usize {
        self.default_depth
    }

    /// Paths from `entity_id` towards the entities it was derived from
    pub async fn get_upstream(&self, entity_id: &str, max_depth: usize) -> LineageResult<Vec<LineagePath>> {
        self.lineage(entity_id, max_depth, true).await
    }

    /// Paths from `entity_id` towards the entities derived from it
    pub async fn get_downstream(&self, entity_id: &str, max_depth: usize) -> LineageResult<Vec<LineagePath>> {
        self.lineage(entity_id, max_depth, false).await
    }

    async fn lineage(&self, entity_id: &str, max_depth: usize, upstream: bool) -> LineageResult<Vec<LineagePath>> {
        let max_depth = check_depth(max_depth)?;
        let steps = RelationshipType::LINEAGE
            .iter()
            .filter_map(|t| {
                let direction = if upstream {
                    t.upstream_direction()
                } else {
                    t.downstream_direction()
                };
                direction.map(|d| EdgeStep::new(t.as_str(), d))
            })
            .collect();
        let query = TraversalQuery::new(entity_id, steps, max_depth);
        self.run(&query).await
    }

    /// Paths from `source_id` to `target_id` along any edge type, in stored orientation
    pub async fn find_path(
        &self,
        source_id: &str,
        target_id: &str,
        max_depth: usize,
    ) -> LineageResult<Vec<LineagePath>> {
        let max_depth = check_depth(max_depth)?;
        let steps = RelationshipType::ALL
            .iter()
            .map(|t| EdgeStep::new(t.as_str(), EdgeDirection::Outgoing))
            .collect();
        let query = TraversalQuery::new(source_id, steps, max_depth).until(target_id);
        self.run(&query).await
    }

    /// Transformations over all upstream paths at the default depth
    pub async fn get_transformation_summary(&self, entity_id: &str) -> LineageResult<TransformationSummary> {
        let paths = self.get_upstream(entity_id, self.default_depth).await?;
        Ok(summarize(entity_id, &paths))
    }

    /// Declared types of upstream `DERIVES_FROM` origins.
    ///
    /// Informational only: entities without a declared type are left out and
    /// no compatibility rules are applied.
    pub async fn validate_lineage_types(&self, entity_id: &str) -> LineageResult<Vec<ValidationRecord>> {
        let paths = self.get_upstream(entity_id, self.default_depth).await?;
        Ok(validate(&paths))
    }

    /// Lineage of `table.column` in both directions at the default depth
    pub async fn trace_column(&self, table: &str, column: &str) -> LineageResult<ColumnTrace> {
        if column.trim().is_empty() {
            return Err(LineageError::InvalidArgument("column name is empty".to_string()));
        }
        let table_id = self.resolve_table_id(table).await?;
        let column_id = column_id(&table_id, column);
        let upstream = self.get_upstream(&column_id, self.default_depth).await?;
        let downstream = self.get_downstream(&column_id, self.default_depth).await?;
        Ok(ColumnTrace {
            column_id: column_id.into_inner(),
            upstream,
            downstream,
        })
    }

    /// Scripts reading and writing a table, and its columns
    pub async fn get_table_dependencies(&self, table_id: &str) -> LineageResult<TableDependencies> {
        let table = match self.store.get_vertex(table_id).await? {
            Some(v) => Some(GraphEntity::from_properties(&v.id, &v.label, &v.properties)?),
            None => None,
        };
        // Only tables and views have readers, writers and columns
        if !table.as_ref().is_some_and(|t| t.entity_type.is_relation()) {
            return Ok(TableDependencies {
                table,
                readers: Vec::new(),
                writers: Vec::new(),
                columns: Vec::new(),
            });
        }
        Ok(TableDependencies {
            readers: self
                .neighbors(table_id, RelationshipType::ReadsFrom, EdgeDirection::Incoming)
                .await?,
            writers: self
                .neighbors(table_id, RelationshipType::WritesTo, EdgeDirection::Incoming)
                .await?,
            columns: self
                .neighbors(table_id, RelationshipType::Contains, EdgeDirection::Outgoing)
                .await?,
            table,
        })
    }

    /// Entities whose id or name contains `fragment`, at most [`FIND_LIMIT`]
    pub async fn find_entities(
        &self,
        fragment: &str,
        entity_type: Option<EntityType>,
    ) -> LineageResult<Vec<GraphEntity>> {
        let vertices = self
            .store
            .find_vertices(fragment, entity_type.map(|t| t.as_str()), FIND_LIMIT)
            .await?;
        vertices
            .iter()
            .map(|v| GraphEntity::from_properties(&v.id, &v.label, &v.properties).map_err(LineageError::from))
            .collect()
    }

    async fn run(&self, query: &TraversalQuery) -> LineageResult<Vec<LineagePath>> {
        let paths = self.store.traverse(query).await?;
        log::debug!(
            "Traversal from {} (depth {}) returned {} paths",
            query.start_id,
            query.max_depth,
            paths.len()
        );
        paths.into_iter().map(LineagePath::from_store_path).collect()
    }

    async fn neighbors(
        &self,
        id: &str,
        relationship_type: RelationshipType,
        direction: EdgeDirection,
    ) -> LineageResult<Vec<GraphEntity>> {
        let query = TraversalQuery::new(id, vec![EdgeStep::new(relationship_type.as_str(), direction)], 1);
        let mut entities = Vec::new();
        for path in self.run(&query).await? {
            if let Some(entity) = path.entities.into_iter().last() {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    /// Accept an entity id as is, otherwise qualify it as a table name
    pub async fn resolve_table_id(&self, table: &str) -> LineageResult<EntityId> {
        if let Some(vertex) = self.store.get_vertex(table).await? {
            return Ok(EntityId::new(vertex.id));
        }
        QualifiedName::parse(table)
            .map(|q| {
                q.with_defaults(self.database.as_deref(), self.schema.as_deref())
                    .entity_id()
            })
            .ok_or_else(|| LineageError::InvalidArgument("table name is empty".to_string()))
    }
}

/// Reject depths outside the supported range
pub fn check_depth(max_depth: usize) -> LineageResult<usize> {
    if (MIN_TRAVERSAL_DEPTH..=MAX_TRAVERSAL_DEPTH).contains(&max_depth) {
        Ok(max_depth)
    } else {
        Err(LineageError::InvalidArgument(format!(
            "max_depth must be between {} and {}, got {}",
            MIN_TRAVERSAL_DEPTH, MAX_TRAVERSAL_DEPTH, max_depth
        )))
    }
}

/// Aggregate transformations over paths
pub fn summarize(entity_id: &str, paths: &[LineagePath]) -> TransformationSummary {
    TransformationSummary {
        entity_id: entity_id.to_string(),
        transformations: paths
            .iter()
            .flat_map(|p| p.transformations.iter().cloned())
            .collect(),
        transformation_count: paths.iter().map(|p| p.transformations.len()).sum(),
    }
}

/// One record per distinct `DERIVES_FROM` edge whose origin declares a type
pub fn validate(paths: &[LineagePath]) -> Vec<ValidationRecord> {
    let types: HashMap<&str, Option<&str>> = paths
        .iter()
        .flat_map(|p| p.entities.iter())
        .map(|e| (e.id.as_str(), e.data_type.as_deref()))
        .collect();

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for relationship in paths.iter().flat_map(|p| p.relationships.iter()) {
        if relationship.relationship_type != RelationshipType::DerivesFrom || !seen.insert(relationship.key()) {
            continue;
        }
        let Some((derived, origin)) = derived_and_origin(relationship) else {
            continue;
        };
        let Some(data_type) = types.get(origin).copied().flatten() else {
            continue;
        };
        let target_data_type = types.get(derived).copied().flatten();
        let status = match target_data_type {
            Some(t) if !t.eq_ignore_ascii_case(data_type) => ValidationStatus::TypeChanged,
            _ => ValidationStatus::Passed,
        };
        records.push(ValidationRecord {
            source: origin.to_string(),
            target: derived.to_string(),
            data_type: data_type.to_string(),
            target_data_type: target_data_type.map(str::to_string),
            status,
        });
    }
    records
}

fn derived_and_origin(relationship: &GraphRelationship) -> Option<(&str, &str)> {
    let (source, target) = (relationship.source_id.as_str(), relationship.target_id.as_str());
    match relationship.relationship_type.upstream_direction()? {
        EdgeDirection::Outgoing => Some((source, target)),
        EdgeDirection::Incoming => Some((target, source)),
    }
}

#[cfg(test)]
#[path = "traversal_test.rs"]
mod tests;
