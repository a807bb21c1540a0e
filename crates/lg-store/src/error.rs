//! Error types for lg-store

use thiserror::Error;

/// Graph store operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Backend asked the caller to slow down (G001)
    #[error("[G001] Graph store throttled the request: {0}")]
    Throttled(String),

    /// Call did not complete in time (G002)
    #[error("[G002] Graph store call '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Backend unreachable (G003)
    #[error("[G003] Graph store unavailable: {0}")]
    Unavailable(String),

    /// Edge endpoint or lookup target is missing (G004)
    #[error("[G004] Vertex not found: {0}")]
    VertexNotFound(String),

    /// Malformed traversal or lookup (G005)
    #[error("[G005] Invalid graph query: {0}")]
    InvalidQuery(String),

    /// Lock poisoned by a panicking writer (G006)
    #[error("[G006] Graph store lock poisoned: {0}")]
    LockPoisoned(String),

    /// Internal error (G007)
    #[error("[G007] Internal graph store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Throttled(_) | StoreError::Timeout { .. } | StoreError::Unavailable(_)
        )
    }
}

/// Result type alias for StoreError
pub type StoreResult<T> = Result<T, StoreError>;
