use super::*;
use crate::memory::InMemoryGraphStore;
use std::sync::atomic::{AtomicU32, Ordering};

/// Fails the first `failures` vertex lookups with `error`, then delegates.
struct FlakyStore {
    inner: InMemoryGraphStore,
    failures: u32,
    error: StoreError,
    calls: AtomicU32,
    stall: Option<Duration>,
}

impl FlakyStore {
    fn new(failures: u32, error: StoreError) -> Self {
        Self {
            inner: InMemoryGraphStore::new(),
            failures,
            error,
            calls: AtomicU32::new(0),
            stall: None,
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphStore for FlakyStore {
    async fn upsert_vertex(
        &self,
        id: &str,
        label: &str,
        properties: Map<String, Value>,
    ) -> StoreResult<String> {
        self.inner.upsert_vertex(id, label, properties).await
    }

    async fn upsert_edge(
        &self,
        source_id: &str,
        target_id: &str,
        label: &str,
        properties: Map<String, Value>,
    ) -> StoreResult<()> {
        self.inner
            .upsert_edge(source_id, target_id, label, properties)
            .await
    }

    async fn get_vertex(&self, id: &str) -> StoreResult<Option<Vertex>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(stall) = self.stall {
            sleep(stall).await;
        }
        if call < self.failures {
            return Err(self.error.clone());
        }
        self.inner.get_vertex(id).await
    }

    async fn traverse(&self, query: &TraversalQuery) -> StoreResult<Vec<Path>> {
        self.inner.traverse(query).await
    }

    async fn find_vertices(
        &self,
        fragment: &str,
        label: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<Vertex>> {
        self.inner.find_vertices(fragment, label, limit).await
    }

    async fn vertex_count(&self) -> StoreResult<usize> {
        self.inner.vertex_count().await
    }

    async fn edge_count(&self) -> StoreResult<usize> {
        self.inner.edge_count().await
    }

    fn store_type(&self) -> &'static str {
        "flaky"
    }
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
        call_timeout: Duration::from_secs(5),
    }
}

#[test]
fn test_policy_from_default_config() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.initial_delay, Duration::from_secs(2));
    assert_eq!(policy.max_delay, Duration::from_secs(10));
    assert_eq!(policy.call_timeout, Duration::from_secs(30));
}

#[test]
fn test_delay_for_attempt_is_capped() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
    assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
    assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
    assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(10));
    assert_eq!(policy.delay_for_attempt(40), Duration::from_secs(10));
}

#[tokio::test]
async fn test_retries_transient_failures() {
    let flaky = FlakyStore::new(2, StoreError::Throttled("slow down".to_string()));
    flaky
        .upsert_vertex("t", "Table", Map::new())
        .await
        .unwrap();
    let store = RetryingStore::new(flaky, fast_policy(3));

    let vertex = store.get_vertex("t").await.unwrap();
    assert!(vertex.is_some());
    assert_eq!(store.inner().calls(), 3);
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let flaky = FlakyStore::new(10, StoreError::Unavailable("down".to_string()));
    let store = RetryingStore::new(flaky, fast_policy(3));

    let err = store.get_vertex("t").await.unwrap_err();
    assert_eq!(err, StoreError::Unavailable("down".to_string()));
    assert_eq!(store.inner().calls(), 3);
}

#[tokio::test]
async fn test_non_transient_error_is_not_retried() {
    let flaky = FlakyStore::new(10, StoreError::InvalidQuery("bad".to_string()));
    let store = RetryingStore::new(flaky, fast_policy(3));

    let err = store.get_vertex("t").await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidQuery(_)));
    assert_eq!(store.inner().calls(), 1);
}

#[tokio::test]
async fn test_slow_call_times_out_and_retries() {
    let mut flaky = FlakyStore::new(0, StoreError::Internal(String::new()));
    flaky.stall = Some(Duration::from_millis(200));
    let mut policy = fast_policy(2);
    policy.call_timeout = Duration::from_millis(20);
    let store = RetryingStore::new(flaky, policy);

    let err = store.get_vertex("t").await.unwrap_err();
    assert!(matches!(err, StoreError::Timeout { .. }));
    assert!(err.is_transient());
    assert_eq!(store.inner().calls(), 2);
}

#[tokio::test]
async fn test_wrapper_delegates_writes() {
    let store = RetryingStore::new(InMemoryGraphStore::new(), fast_policy(3));
    store.upsert_vertex("a", "Table", Map::new()).await.unwrap();
    store.upsert_vertex("b", "Table", Map::new()).await.unwrap();
    store
        .upsert_edge("a", "b", "DERIVES_FROM", Map::new())
        .await
        .unwrap();

    assert_eq!(store.vertex_count().await.unwrap(), 2);
    assert_eq!(store.edge_count().await.unwrap(), 1);
    assert_eq!(store.store_type(), "memory");
}
