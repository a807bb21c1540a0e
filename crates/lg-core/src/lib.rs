//! lg-core - Core library for lineagegraph
//!
//! This crate provides the lineage graph data model (entities, relationships
//! and their orientation rules), the per-statement extraction record, entity
//! id derivation, and configuration parsing shared across all crates.

pub mod checksum;
pub mod config;
pub mod entity;
pub mod entity_id;
pub mod error;
pub mod naming;
pub mod record;
pub mod relationship;

pub use checksum::compute_checksum;
pub use config::{
    Config, RetrySettings, StoreConfig, DEFAULT_TRAVERSAL_DEPTH, MAX_TRAVERSAL_DEPTH,
    MIN_TRAVERSAL_DEPTH,
};
pub use entity::{EntityType, GraphEntity};
pub use entity_id::EntityId;
pub use error::{CoreError, CoreResult};
pub use naming::QualifiedName;
pub use record::{
    CallType, ColumnDefinition, ColumnDerivation, ExprType, ExtractionRecord, ProcedureCall,
    StatementKind, SynonymDef, TriggerDef, CONSOLE_TARGET,
};
pub use relationship::{EdgeDirection, GraphRelationship, RelationshipType};
