//! lg-store - Graph store abstraction for lineagegraph
//!
//! This crate provides the `GraphStore` trait, an in-memory implementation
//! backed by petgraph, and a wrapper adding per-call timeouts and retries of
//! transient failures.

pub mod error;
pub mod memory;
pub mod retry;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryGraphStore;
pub use retry::{RetryPolicy, RetryingStore};
pub use traits::{Edge, EdgeStep, GraphStore, Path, TraversalQuery, Vertex};
