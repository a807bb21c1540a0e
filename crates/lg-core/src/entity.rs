//! Graph entities (vertices) and their property-map encoding.

use crate::entity_id::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::naming::{column_id, QualifiedName};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Kind of node in the lineage graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    Table,
    View,
    Column,
    Script,
    Pipeline,
    Transformation,
    DataType,
}

impl EntityType {
    /// All entity types, in declaration order
    pub const ALL: [EntityType; 7] = [
        EntityType::Table,
        EntityType::View,
        EntityType::Column,
        EntityType::Script,
        EntityType::Pipeline,
        EntityType::Transformation,
        EntityType::DataType,
    ];

    /// Vertex label used by graph stores
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Table => "Table",
            EntityType::View => "View",
            EntityType::Column => "Column",
            EntityType::Script => "Script",
            EntityType::Pipeline => "Pipeline",
            EntityType::Transformation => "Transformation",
            EntityType::DataType => "DataType",
        }
    }

    /// Whether entities of this type own columns
    pub fn is_relation(&self) -> bool {
        matches!(self, EntityType::Table | EntityType::View)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| CoreError::InvalidProperty {
                id: s.to_string(),
                key: "entity_type".to_string(),
                reason: "unknown entity type".to_string(),
            })
    }
}

/// Property keys with a dedicated field on [`GraphEntity`].
const RESERVED_KEYS: [&str; 6] = [
    "entity_type",
    "name",
    "database",
    "schema",
    "data_type",
    "file_path",
];

/// A node of the lineage graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntity {
    pub id: EntityId,
    pub entity_type: EntityType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl GraphEntity {
    pub fn new(id: EntityId, entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            id,
            entity_type,
            name: name.into(),
            database: None,
            schema: None,
            data_type: None,
            file_path: None,
            properties: Map::new(),
        }
    }

    /// Table entity for a qualified name. The entity name is the bare table name.
    pub fn table(name: &QualifiedName) -> Self {
        Self::relation(name, EntityType::Table)
    }

    /// View entity; materialized views carry `materialized: true`.
    pub fn view(name: &QualifiedName, materialized: bool) -> Self {
        let mut entity = Self::relation(name, EntityType::View);
        if materialized {
            entity
                .properties
                .insert("materialized".to_string(), Value::Bool(true));
        }
        entity
    }

    fn relation(name: &QualifiedName, entity_type: EntityType) -> Self {
        let mut entity = Self::new(name.entity_id(), entity_type, name.name.clone());
        entity.database = name.database.clone();
        entity.schema = name.schema.clone();
        entity
    }

    /// Column entity owned by `table`
    pub fn column(table: &QualifiedName, column: &str) -> Self {
        let mut entity = Self::new(
            column_id(&table.entity_id(), column),
            EntityType::Column,
            column,
        );
        entity.database = table.database.clone();
        entity.schema = table.schema.clone();
        entity.properties.insert(
            "table_name".to_string(),
            Value::String(table.name.clone()),
        );
        entity
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Vertex label for graph stores
    pub fn label(&self) -> &'static str {
        self.entity_type.as_str()
    }

    /// Flatten into a store property map.
    ///
    /// Reserved fields win over same-named keys in `properties`.
    pub fn to_properties(&self) -> Map<String, Value> {
        let mut map = self.properties.clone();
        map.insert(
            "entity_type".to_string(),
            Value::String(self.entity_type.as_str().to_string()),
        );
        map.insert("name".to_string(), Value::String(self.name.clone()));
        let optional = [
            ("database", &self.database),
            ("schema", &self.schema),
            ("data_type", &self.data_type),
            ("file_path", &self.file_path),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                map.insert(key.to_string(), Value::String(v.clone()));
            }
        }
        map
    }

    /// Rebuild an entity from a stored vertex.
    ///
    /// `label` is used when the property map has no `entity_type`.
    pub fn from_properties(id: &str, label: &str, properties: &Map<String, Value>) -> CoreResult<Self> {
        let id = EntityId::try_new(id).ok_or_else(|| CoreError::EmptyName {
            context: "entity id".to_string(),
        })?;
        let type_name = match properties.get("entity_type") {
            Some(Value::String(s)) => s.as_str(),
            Some(_) => {
                return Err(CoreError::InvalidProperty {
                    id: id.to_string(),
                    key: "entity_type".to_string(),
                    reason: "expected a string".to_string(),
                })
            }
            None => label,
        };
        let entity_type = type_name.parse::<EntityType>()?;
        let name = string_property(&id, properties, "name")?.unwrap_or_else(|| id.to_string());

        let mut entity = Self::new(id.clone(), entity_type, name);
        entity.database = string_property(&id, properties, "database")?;
        entity.schema = string_property(&id, properties, "schema")?;
        entity.data_type = string_property(&id, properties, "data_type")?;
        entity.file_path = string_property(&id, properties, "file_path")?;
        entity.properties = properties
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(entity)
    }
}

fn string_property(
    id: &EntityId,
    properties: &Map<String, Value>,
    key: &str,
) -> CoreResult<Option<String>> {
    match properties.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(CoreError::InvalidProperty {
            id: id.to_string(),
            key: key.to_string(),
            reason: "expected a string".to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "entity_test.rs"]
mod tests;
