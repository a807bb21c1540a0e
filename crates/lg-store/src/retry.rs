//! Timeout and retry wrapper for any graph store

use crate::error::{StoreError, StoreResult};
use crate::traits::{GraphStore, Path, TraversalQuery, Vertex};
use async_trait::async_trait;
use lg_core::StoreConfig;
use serde_json::{Map, Value};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Per-call timeout and exponential backoff for transient failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Limit for a single attempt
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            max_attempts: config.retry.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.retry.initial_delay_ms),
            max_delay: Duration::from_millis(config.retry.max_delay_ms),
            multiplier: config.retry.multiplier,
            call_timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Wraps a store so every call gets a timeout and transient errors are retried.
///
/// Non-transient errors are returned on the first occurrence.
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: GraphStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, mut f: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match timeout(self.policy.call_timeout, f()).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms: self.policy.call_timeout.as_millis() as u64,
                }),
            };

            match result {
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    log::warn!(
                        "{} failed on attempt {}/{}: {}; retrying in {}ms",
                        operation,
                        attempt,
                        self.policy.max_attempts,
                        e,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    if e.is_transient() {
                        log::warn!("{} gave up after {} attempts: {}", operation, attempt, e);
                    }
                    return Err(e);
                }
                Ok(value) => return Ok(value),
            }
        }
    }
}

#[async_trait]
impl<S: GraphStore> GraphStore for RetryingStore<S> {
    async fn upsert_vertex(
        &self,
        id: &str,
        label: &str,
        properties: Map<String, Value>,
    ) -> StoreResult<String> {
        self.call("upsert_vertex", || {
            self.inner.upsert_vertex(id, label, properties.clone())
        })
        .await
    }

    async fn upsert_edge(
        &self,
        source_id: &str,
        target_id: &str,
        label: &str,
        properties: Map<String, Value>,
    ) -> StoreResult<()> {
        self.call("upsert_edge", || {
            self.inner
                .upsert_edge(source_id, target_id, label, properties.clone())
        })
        .await
    }

    async fn get_vertex(&self, id: &str) -> StoreResult<Option<Vertex>> {
        self.call("get_vertex", || self.inner.get_vertex(id)).await
    }

    async fn traverse(&self, query: &TraversalQuery) -> StoreResult<Vec<Path>> {
        self.call("traverse", || self.inner.traverse(query)).await
    }

    async fn find_vertices(
        &self,
        fragment: &str,
        label: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<Vertex>> {
        self.call("find_vertices", || {
            self.inner.find_vertices(fragment, label, limit)
        })
        .await
    }

    async fn vertex_count(&self) -> StoreResult<usize> {
        self.call("vertex_count", || self.inner.vertex_count()).await
    }

    async fn edge_count(&self) -> StoreResult<usize> {
        self.call("edge_count", || self.inner.edge_count()).await
    }

    fn store_type(&self) -> &'static str {
        self.inner.store_type()
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;
