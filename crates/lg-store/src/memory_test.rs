use super::*;
use serde_json::json;

fn props(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

async fn chain(store: &InMemoryGraphStore, ids: &[&str], label: &str) {
    for id in ids {
        store
            .upsert_vertex(id, "Table", props(json!({ "name": id })))
            .await
            .unwrap();
    }
    for pair in ids.windows(2) {
        store
            .upsert_edge(pair[0], pair[1], label, Map::new())
            .await
            .unwrap();
    }
}

fn ids(path: &Path) -> Vec<&str> {
    path.vertices.iter().map(|v| v.id.as_str()).collect()
}

fn outgoing(label: &str) -> Vec<EdgeStep> {
    vec![EdgeStep::new(label, EdgeDirection::Outgoing)]
}

#[tokio::test]
async fn test_store_type() {
    let store = InMemoryGraphStore::new();
    assert_eq!(store.store_type(), "memory");
    assert_eq!(store.vertex_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_upsert_vertex_is_idempotent_and_merges() {
    let store = InMemoryGraphStore::new();
    store
        .upsert_vertex("t", "Table", props(json!({ "name": "t", "a": 1 })))
        .await
        .unwrap();
    store
        .upsert_vertex("t", "Table", props(json!({ "a": 2, "b": true })))
        .await
        .unwrap();

    assert_eq!(store.vertex_count().await.unwrap(), 1);
    let vertex = store.get_vertex("t").await.unwrap().unwrap();
    assert_eq!(vertex.properties["name"], json!("t"));
    assert_eq!(vertex.properties["a"], json!(2));
    assert_eq!(vertex.properties["b"], json!(true));
}

#[tokio::test]
async fn test_upsert_vertex_rejects_empty_id() {
    let store = InMemoryGraphStore::new();
    let err = store.upsert_vertex("", "Table", Map::new()).await;
    assert!(matches!(err, Err(StoreError::InvalidQuery(_))));
}

#[tokio::test]
async fn test_upsert_edge_is_idempotent() {
    let store = InMemoryGraphStore::new();
    chain(&store, &["a", "b"], "DERIVES_FROM").await;
    store
        .upsert_edge("a", "b", "DERIVES_FROM", props(json!({ "confidence_score": 0.5 })))
        .await
        .unwrap();
    store
        .upsert_edge("a", "b", "CONTAINS", Map::new())
        .await
        .unwrap();

    assert_eq!(store.edge_count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_upsert_edge_missing_endpoint() {
    let store = InMemoryGraphStore::new();
    chain(&store, &["a"], "DERIVES_FROM").await;
    let err = store
        .upsert_edge("a", "missing", "DERIVES_FROM", Map::new())
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::VertexNotFound("missing".to_string()));
    assert!(!err.is_transient());
    assert_eq!(store.edge_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_get_vertex_missing() {
    let store = InMemoryGraphStore::new();
    assert!(store.get_vertex("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_traverse_respects_max_depth() {
    let store = InMemoryGraphStore::new();
    chain(&store, &["c", "b", "a"], "DERIVES_FROM").await;

    let paths = store
        .traverse(&TraversalQuery::new("c", outgoing("DERIVES_FROM"), 2))
        .await
        .unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(ids(&paths[0]), vec!["c", "b", "a"]);
    assert_eq!(paths[0].hops(), 2);

    let paths = store
        .traverse(&TraversalQuery::new("c", outgoing("DERIVES_FROM"), 1))
        .await
        .unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(ids(&paths[0]), vec!["c", "b"]);
}

#[tokio::test]
async fn test_traverse_incoming_direction() {
    let store = InMemoryGraphStore::new();
    chain(&store, &["c", "b", "a"], "DERIVES_FROM").await;

    let steps = vec![EdgeStep::new("DERIVES_FROM", EdgeDirection::Incoming)];
    let paths = store
        .traverse(&TraversalQuery::new("a", steps, 10))
        .await
        .unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(ids(&paths[0]), vec!["a", "b", "c"]);
    assert_eq!(paths[0].edges[0].source_id, "b");
}

#[tokio::test]
async fn test_traverse_terminates_on_cycle() {
    let store = InMemoryGraphStore::new();
    chain(&store, &["a", "b", "c", "a"], "DERIVES_FROM").await;

    let paths = store
        .traverse(&TraversalQuery::new("a", outgoing("DERIVES_FROM"), 50))
        .await
        .unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(ids(&paths[0]), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_traverse_self_loop_yields_nothing() {
    let store = InMemoryGraphStore::new();
    chain(&store, &["a"], "DERIVES_FROM").await;
    store
        .upsert_edge("a", "a", "DERIVES_FROM", Map::new())
        .await
        .unwrap();

    let paths = store
        .traverse(&TraversalQuery::new("a", outgoing("DERIVES_FROM"), 5))
        .await
        .unwrap();
    assert!(paths.is_empty());
}

#[tokio::test]
async fn test_traverse_paths_are_simple_and_ordered() {
    let store = InMemoryGraphStore::new();
    chain(&store, &["x", "b", "z"], "DERIVES_FROM").await;
    chain(&store, &["x", "a", "z"], "DERIVES_FROM").await;

    let paths = store
        .traverse(&TraversalQuery::new("x", outgoing("DERIVES_FROM"), 10))
        .await
        .unwrap();
    assert_eq!(paths.len(), 2);
    assert_eq!(ids(&paths[0]), vec!["x", "a", "z"]);
    assert_eq!(ids(&paths[1]), vec!["x", "b", "z"]);
    for path in &paths {
        let mut seen = ids(path);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), path.vertices.len());
        assert_eq!(path.edges.len() + 1, path.vertices.len());
    }
}

#[tokio::test]
async fn test_traverse_ignores_other_labels() {
    let store = InMemoryGraphStore::new();
    chain(&store, &["a", "b"], "DERIVES_FROM").await;
    chain(&store, &["b", "c"], "CONTAINS").await;

    let paths = store
        .traverse(&TraversalQuery::new("a", outgoing("DERIVES_FROM"), 10))
        .await
        .unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(ids(&paths[0]), vec!["a", "b"]);
}

#[tokio::test]
async fn test_traverse_multiple_steps() {
    let store = InMemoryGraphStore::new();
    chain(&store, &["a", "b"], "DERIVES_FROM").await;
    chain(&store, &["c", "b"], "TRANSFORMS_TO").await;

    // b <- c in data-flow order walks upstream as an incoming TRANSFORMS_TO edge
    let steps = vec![
        EdgeStep::new("DERIVES_FROM", EdgeDirection::Outgoing),
        EdgeStep::new("TRANSFORMS_TO", EdgeDirection::Incoming),
    ];
    let paths = store
        .traverse(&TraversalQuery::new("a", steps, 10))
        .await
        .unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(ids(&paths[0]), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_traverse_until_target() {
    let store = InMemoryGraphStore::new();
    chain(&store, &["a", "b", "c", "d"], "DEPENDS_ON").await;
    chain(&store, &["a", "x"], "DEPENDS_ON").await;

    let query = TraversalQuery::new("a", outgoing("DEPENDS_ON"), 10).until("c");
    let paths = store.traverse(&query).await.unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(ids(&paths[0]), vec!["a", "b", "c"]);

    let query = TraversalQuery::new("a", outgoing("DEPENDS_ON"), 1).until("c");
    assert!(store.traverse(&query).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_traverse_missing_start() {
    let store = InMemoryGraphStore::new();
    let paths = store
        .traverse(&TraversalQuery::new("ghost", outgoing("DERIVES_FROM"), 3))
        .await
        .unwrap();
    assert!(paths.is_empty());
}

#[tokio::test]
async fn test_traverse_rejects_bad_query() {
    let store = InMemoryGraphStore::new();
    let err = store
        .traverse(&TraversalQuery::new("a", outgoing("DERIVES_FROM"), 0))
        .await;
    assert!(matches!(err, Err(StoreError::InvalidQuery(_))));

    let err = store
        .traverse(&TraversalQuery::new("a", Vec::new(), 3))
        .await;
    assert!(matches!(err, Err(StoreError::InvalidQuery(_))));
}

#[tokio::test]
async fn test_find_vertices() {
    let store = InMemoryGraphStore::new();
    chain(&store, &["db_dbo_orders", "db_dbo_customers"], "DERIVES_FROM").await;
    store
        .upsert_vertex("db_dbo_orders_id", "Column", props(json!({ "name": "ID" })))
        .await
        .unwrap();

    let found = store.find_vertices("ORDERS", None, 100).await.unwrap();
    let found: Vec<_> = found.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(found, vec!["db_dbo_orders", "db_dbo_orders_id"]);

    let columns = store.find_vertices("orders", Some("column"), 100).await.unwrap();
    assert_eq!(columns.len(), 1);

    let limited = store.find_vertices("db", None, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, "db_dbo_customers");
}
