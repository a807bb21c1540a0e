//! Graph store trait definitions

use crate::error::StoreResult;
use async_trait::async_trait;
use lg_core::EdgeDirection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored vertex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A stored directed edge. At most one edge exists per `(source, target, label)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    pub label: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A traversal result: `vertices[i]` and `vertices[i + 1]` are joined by `edges[i]`.
///
/// No vertex appears twice in a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
}

impl Path {
    /// Number of edges walked
    pub fn hops(&self) -> usize {
        self.edges.len()
    }

    pub fn start(&self) -> Option<&Vertex> {
        self.vertices.first()
    }

    pub fn end(&self) -> Option<&Vertex> {
        self.vertices.last()
    }
}

/// An edge kind a traversal hop may follow
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeStep {
    pub label: String,
    pub direction: EdgeDirection,
}

impl EdgeStep {
    pub fn new(label: impl Into<String>, direction: EdgeDirection) -> Self {
        Self {
            label: label.into(),
            direction,
        }
    }
}

/// Bounded simple-path traversal request.
///
/// Every hop may follow any of `steps`. Paths stop growing when they cannot be
/// extended or after `max_depth` hops. With `until` set, a path ends as soon as
/// it reaches that vertex and only such paths are returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalQuery {
    pub start_id: String,
    pub steps: Vec<EdgeStep>,
    pub max_depth: usize,
    #[serde(default)]
    pub until: Option<String>,
}

impl TraversalQuery {
    pub fn new(start_id: impl Into<String>, steps: Vec<EdgeStep>, max_depth: usize) -> Self {
        Self {
            start_id: start_id.into(),
            steps,
            max_depth,
            until: None,
        }
    }

    pub fn until(mut self, target_id: impl Into<String>) -> Self {
        self.until = Some(target_id.into());
        self
    }
}

/// Graph store abstraction used by the builder and the traversal engine
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create a vertex or merge `properties` into an existing one (last writer wins per key).
    /// Returns the vertex id.
    async fn upsert_vertex(
        &self,
        id: &str,
        label: &str,
        properties: Map<String, Value>,
    ) -> StoreResult<String>;

    /// Create an edge or merge `properties` into the existing `(source, target, label)` edge.
    /// Both endpoints must already exist.
    async fn upsert_edge(
        &self,
        source_id: &str,
        target_id: &str,
        label: &str,
        properties: Map<String, Value>,
    ) -> StoreResult<()>;

    /// Fetch a vertex by id
    async fn get_vertex(&self, id: &str) -> StoreResult<Option<Vertex>>;

    /// Enumerate simple paths from `query.start_id`.
    ///
    /// A missing start vertex yields no paths.
    async fn traverse(&self, query: &TraversalQuery) -> StoreResult<Vec<Path>>;

    /// Vertices whose id or `name` contains `fragment` (case-insensitive), ordered by id
    async fn find_vertices(
        &self,
        fragment: &str,
        label: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<Vertex>>;

    async fn vertex_count(&self) -> StoreResult<usize>;

    async fn edge_count(&self) -> StoreResult<usize>;

    /// Backend name for logging
    fn store_type(&self) -> &'static str;
}
