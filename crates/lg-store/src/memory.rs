//! In-memory graph store backed by petgraph

use crate::error::{StoreError, StoreResult};
use crate::traits::{Edge, EdgeStep, GraphStore, Path, TraversalQuery, Vertex};
use async_trait::async_trait;
use lg_core::EdgeDirection;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct GraphState {
    graph: DiGraph<Vertex, Edge>,
    vertices: HashMap<String, NodeIndex>,
    edges: HashMap<(NodeIndex, NodeIndex, String), EdgeIndex>,
}

/// In-memory graph store
#[derive(Default)]
pub struct InMemoryGraphStore {
    state: RwLock<GraphState>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, GraphState>> {
        self.state
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, GraphState>> {
        self.state
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn upsert_vertex_sync(
        &self,
        id: &str,
        label: &str,
        properties: Map<String, Value>,
    ) -> StoreResult<String> {
        if id.is_empty() {
            return Err(StoreError::InvalidQuery("vertex id is empty".to_string()));
        }
        let mut state = self.write()?;
        match state.vertices.get(id).copied() {
            Some(node) => {
                let vertex = &mut state.graph[node];
                vertex.label = label.to_string();
                vertex.properties.extend(properties);
            }
            None => {
                let node = state.graph.add_node(Vertex {
                    id: id.to_string(),
                    label: label.to_string(),
                    properties,
                });
                state.vertices.insert(id.to_string(), node);
            }
        }
        Ok(id.to_string())
    }

    fn upsert_edge_sync(
        &self,
        source_id: &str,
        target_id: &str,
        label: &str,
        properties: Map<String, Value>,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        let source = state.node(source_id)?;
        let target = state.node(target_id)?;
        let key = (source, target, label.to_string());
        match state.edges.get(&key).copied() {
            Some(edge) => state.graph[edge].properties.extend(properties),
            None => {
                let edge = state.graph.add_edge(
                    source,
                    target,
                    Edge {
                        source_id: source_id.to_string(),
                        target_id: target_id.to_string(),
                        label: label.to_string(),
                        properties,
                    },
                );
                state.edges.insert(key, edge);
            }
        }
        Ok(())
    }

    fn traverse_sync(&self, query: &TraversalQuery) -> StoreResult<Vec<Path>> {
        if query.max_depth == 0 {
            return Err(StoreError::InvalidQuery(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if query.steps.is_empty() {
            return Err(StoreError::InvalidQuery(
                "traversal needs at least one edge step".to_string(),
            ));
        }

        let state = self.read()?;
        let Some(&start) = state.vertices.get(&query.start_id) else {
            return Ok(Vec::new());
        };

        let mut walk = Walk {
            state: &state,
            query,
            nodes: vec![start],
            edges: Vec::new(),
            paths: Vec::new(),
        };
        walk.extend();
        Ok(walk.paths)
    }

    fn find_vertices_sync(
        &self,
        fragment: &str,
        label: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<Vertex>> {
        let needle = fragment.to_lowercase();
        let state = self.read()?;
        let mut found: Vec<Vertex> = state
            .graph
            .node_weights()
            .filter(|v| label.is_none_or(|l| v.label.eq_ignore_ascii_case(l)))
            .filter(|v| {
                let name = v
                    .properties
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                v.id.to_lowercase().contains(&needle) || name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found.truncate(limit);
        Ok(found)
    }
}

impl GraphState {
    fn node(&self, id: &str) -> StoreResult<NodeIndex> {
        self.vertices
            .get(id)
            .copied()
            .ok_or_else(|| StoreError::VertexNotFound(id.to_string()))
    }

    /// Edges leaving `node` along any of `steps`, ordered by neighbor id then label.
    fn neighbors(&self, node: NodeIndex, steps: &[EdgeStep]) -> Vec<(NodeIndex, EdgeIndex)> {
        let mut found = Vec::new();
        for step in steps {
            let direction = match step.direction {
                EdgeDirection::Outgoing => Direction::Outgoing,
                EdgeDirection::Incoming => Direction::Incoming,
            };
            for edge in self.graph.edges_directed(node, direction) {
                if edge.weight().label != step.label {
                    continue;
                }
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                found.push((other, edge.id()));
            }
        }
        found.sort_by(|a, b| {
            self.graph[a.0]
                .id
                .cmp(&self.graph[b.0].id)
                .then_with(|| self.graph[a.1].label.cmp(&self.graph[b.1].label))
        });
        found.dedup_by_key(|(_, edge)| *edge);
        found
    }
}

/// Depth-first simple-path enumeration state
struct Walk<'a> {
    state: &'a GraphState,
    query: &'a TraversalQuery,
    nodes: Vec<NodeIndex>,
    edges: Vec<EdgeIndex>,
    paths: Vec<Path>,
}

impl Walk<'_> {
    fn extend(&mut self) {
        let Some(&current) = self.nodes.last() else {
            return;
        };

        if let Some(until) = &self.query.until {
            if !self.edges.is_empty() && self.state.graph[current].id == *until {
                self.emit();
                return;
            }
        }
        if self.edges.len() >= self.query.max_depth {
            if self.query.until.is_none() {
                self.emit();
            }
            return;
        }

        let mut extended = false;
        for (next, edge) in self.state.neighbors(current, &self.query.steps) {
            if self.nodes.contains(&next) {
                continue;
            }
            extended = true;
            self.nodes.push(next);
            self.edges.push(edge);
            self.extend();
            self.nodes.pop();
            self.edges.pop();
        }

        if !extended && !self.edges.is_empty() && self.query.until.is_none() {
            self.emit();
        }
    }

    fn emit(&mut self) {
        let graph = &self.state.graph;
        self.paths.push(Path {
            vertices: self.nodes.iter().map(|n| graph[*n].clone()).collect(),
            edges: self.edges.iter().map(|e| graph[*e].clone()).collect(),
        });
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn upsert_vertex(
        &self,
        id: &str,
        label: &str,
        properties: Map<String, Value>,
    ) -> StoreResult<String> {
        self.upsert_vertex_sync(id, label, properties)
    }

    async fn upsert_edge(
        &self,
        source_id: &str,
        target_id: &str,
        label: &str,
        properties: Map<String, Value>,
    ) -> StoreResult<()> {
        self.upsert_edge_sync(source_id, target_id, label, properties)
    }

    async fn get_vertex(&self, id: &str) -> StoreResult<Option<Vertex>> {
        let state = self.read()?;
        Ok(state.vertices.get(id).map(|n| state.graph[*n].clone()))
    }

    async fn traverse(&self, query: &TraversalQuery) -> StoreResult<Vec<Path>> {
        self.traverse_sync(query)
    }

    async fn find_vertices(
        &self,
        fragment: &str,
        label: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<Vertex>> {
        self.find_vertices_sync(fragment, label, limit)
    }

    async fn vertex_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.graph.node_count())
    }

    async fn edge_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.graph.edge_count())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
