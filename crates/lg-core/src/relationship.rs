//! Typed graph relationships (edges) and the upstream-orientation rule.

use crate::entity_id::EntityId;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;

/// Direction in which an edge is followed relative to its stored orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeDirection {
    /// Follow `source_id -> target_id`
    Outgoing,
    /// Follow `target_id -> source_id`
    Incoming,
}

impl EdgeDirection {
    pub fn reverse(self) -> Self {
        match self {
            EdgeDirection::Outgoing => EdgeDirection::Incoming,
            EdgeDirection::Incoming => EdgeDirection::Outgoing,
        }
    }
}

/// Kind of edge in the lineage graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    /// Stored `derived -> origin`
    DerivesFrom,
    /// Stored `origin -> derived` (data-flow order)
    TransformsTo,
    Contains,
    Executes,
    ReadsFrom,
    WritesTo,
    CastsTo,
    JoinsWith,
    DependsOn,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 9] = [
        RelationshipType::DerivesFrom,
        RelationshipType::TransformsTo,
        RelationshipType::Contains,
        RelationshipType::Executes,
        RelationshipType::ReadsFrom,
        RelationshipType::WritesTo,
        RelationshipType::CastsTo,
        RelationshipType::JoinsWith,
        RelationshipType::DependsOn,
    ];

    /// Edge types that carry data lineage
    pub const LINEAGE: [RelationshipType; 2] =
        [RelationshipType::DerivesFrom, RelationshipType::TransformsTo];

    /// Edge label used by graph stores
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::DerivesFrom => "DERIVES_FROM",
            RelationshipType::TransformsTo => "TRANSFORMS_TO",
            RelationshipType::Contains => "CONTAINS",
            RelationshipType::Executes => "EXECUTES",
            RelationshipType::ReadsFrom => "READS_FROM",
            RelationshipType::WritesTo => "WRITES_TO",
            RelationshipType::CastsTo => "CASTS_TO",
            RelationshipType::JoinsWith => "JOINS_WITH",
            RelationshipType::DependsOn => "DEPENDS_ON",
        }
    }

    /// Direction that walks from a derived entity towards its origins.
    ///
    /// `None` for edge types that do not carry lineage. This is the only
    /// place that knows how lineage edges are oriented in storage.
    pub fn upstream_direction(&self) -> Option<EdgeDirection> {
        match self {
            RelationshipType::DerivesFrom => Some(EdgeDirection::Outgoing),
            RelationshipType::TransformsTo => Some(EdgeDirection::Incoming),
            _ => None,
        }
    }

    /// Direction that walks from an origin towards what derives from it.
    pub fn downstream_direction(&self) -> Option<EdgeDirection> {
        self.upstream_direction().map(EdgeDirection::reverse)
    }

    /// Stored `(source, target)` for a lineage fact `derived <- origin`.
    ///
    /// Returns `None` for non-lineage types.
    pub fn orient<'a, T: ?Sized>(&self, derived: &'a T, origin: &'a T) -> Option<(&'a T, &'a T)> {
        match self.upstream_direction()? {
            EdgeDirection::Outgoing => Some((derived, origin)),
            EdgeDirection::Incoming => Some((origin, derived)),
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelationshipType::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| CoreError::InvalidProperty {
                id: s.to_string(),
                key: "relationship_type".to_string(),
                reason: "unknown relationship type".to_string(),
            })
    }
}

/// Clamp a confidence into `[0, 1]`; NaN becomes the default of 1.0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        1.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A directed, typed edge of the lineage graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRelationship {
    pub source_id: EntityId,
    pub target_id: EntityId,
    pub relationship_type: RelationshipType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation_logic: Option<String>,
    pub confidence_score: f64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl GraphRelationship {
    pub fn new(source_id: EntityId, target_id: EntityId, relationship_type: RelationshipType) -> Self {
        Self {
            source_id,
            target_id,
            relationship_type,
            transformation_logic: None,
            confidence_score: 1.0,
            properties: Map::new(),
        }
    }

    /// Lineage edge meaning "`derived` comes from `origin`", stored in the
    /// orientation [`RelationshipType::upstream_direction`] dictates.
    ///
    /// Non-lineage types are stored as `derived -> origin`.
    pub fn lineage(relationship_type: RelationshipType, derived: EntityId, origin: EntityId) -> Self {
        let (source, target) = relationship_type
            .orient(&derived, &origin)
            .map(|(s, t)| (s.clone(), t.clone()))
            .unwrap_or((derived, origin));
        Self::new(source, target, relationship_type)
    }

    pub fn with_transformation(mut self, logic: impl Into<String>) -> Self {
        self.transformation_logic = Some(logic.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence_score = clamp_confidence(confidence);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn is_self_edge(&self) -> bool {
        self.source_id == self.target_id
    }

    /// Identity used for upsert: one edge per `(source, target, type)`.
    pub fn key(&self) -> (EntityId, EntityId, RelationshipType) {
        (self.source_id.clone(), self.target_id.clone(), self.relationship_type)
    }

    pub fn to_properties(&self) -> Map<String, Value> {
        let mut map = self.properties.clone();
        if let Some(logic) = &self.transformation_logic {
            map.insert("transformation_logic".to_string(), Value::String(logic.clone()));
        }
        let confidence = Number::from_f64(self.confidence_score).unwrap_or_else(|| Number::from(1));
        map.insert("confidence_score".to_string(), Value::Number(confidence));
        map
    }

    /// Rebuild a relationship from a stored edge.
    pub fn from_properties(
        source_id: &str,
        target_id: &str,
        label: &str,
        properties: &Map<String, Value>,
    ) -> CoreResult<Self> {
        let empty = || CoreError::EmptyName {
            context: format!("{} endpoint", label),
        };
        let source = EntityId::try_new(source_id).ok_or_else(empty)?;
        let target = EntityId::try_new(target_id).ok_or_else(empty)?;
        let relationship_type = label.parse::<RelationshipType>()?;
        let edge_id = format!("{}->{}", source, target);

        let transformation_logic = match properties.get("transformation_logic") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(CoreError::InvalidProperty {
                    id: edge_id,
                    key: "transformation_logic".to_string(),
                    reason: "expected a string".to_string(),
                })
            }
        };
        let confidence_score = match properties.get("confidence_score") {
            None | Some(Value::Null) => 1.0,
            Some(v) => v.as_f64().map(clamp_confidence).ok_or_else(|| {
                CoreError::InvalidProperty {
                    id: edge_id.clone(),
                    key: "confidence_score".to_string(),
                    reason: "expected a number".to_string(),
                }
            })?,
        };
        let properties = properties
            .iter()
            .filter(|(k, _)| k.as_str() != "transformation_logic" && k.as_str() != "confidence_score")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            source_id: source,
            target_id: target,
            relationship_type,
            transformation_logic,
            confidence_score,
            properties,
        })
    }
}

#[cfg(test)]
#[path = "relationship_test.rs"]
mod tests;
