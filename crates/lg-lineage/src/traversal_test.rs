use super::*;
use crate::builder::{GraphFragment, LineageBuilder};
use lg_store::InMemoryGraphStore;

fn id(s: &str) -> EntityId {
    EntityId::new(s)
}

fn node(name: &str) -> GraphEntity {
    GraphEntity::new(id(name), EntityType::Column, name)
}

fn derives(derived: &str, origin: &str, logic: &str) -> GraphRelationship {
    GraphRelationship::lineage(RelationshipType::DerivesFrom, id(derived), id(origin)).with_transformation(logic)
}

async fn engine(entities: Vec<GraphEntity>, relationships: Vec<GraphRelationship>) -> LineageEngine {
    let store = Arc::new(InMemoryGraphStore::new());
    let fragment = GraphFragment {
        entities,
        relationships,
        ..GraphFragment::default()
    };
    let report = LineageBuilder::new(store.clone()).write(fragment).await;
    assert!(report.is_clean(), "{:?}", report.failures);
    LineageEngine::new(store)
}

async fn chain() -> LineageEngine {
    engine(
        vec![node("a"), node("b"), node("c")],
        vec![derives("b", "a", "upper(a)"), derives("c", "b", "trim(b)")],
    )
    .await
}

#[tokio::test]
async fn test_upstream_respects_depth() {
    let engine = chain().await;

    let paths = engine.get_upstream("c", 2).await.unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].entity_ids(), vec!["c", "b", "a"]);
    assert_eq!(paths[0].total_hops, 2);
    assert_eq!(paths[0].transformations, vec!["trim(b)", "upper(a)"]);

    let paths = engine.get_upstream("c", 1).await.unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].entity_ids(), vec!["c", "b"]);
}

#[tokio::test]
async fn test_downstream_walks_the_other_way() {
    let engine = chain().await;
    let paths = engine.get_downstream("a", 10).await.unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].entity_ids(), vec!["a", "b", "c"]);

    assert!(engine.get_downstream("c", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_transforms_to_uses_data_flow_orientation() {
    let t1 = GraphEntity::new(id("t1"), EntityType::Table, "t1");
    let t2 = GraphEntity::new(id("t2"), EntityType::Table, "t2");
    let edge = GraphRelationship::lineage(RelationshipType::TransformsTo, id("t2"), id("t1"));
    assert_eq!(edge.source_id, "t1");
    let engine = engine(vec![t1, t2], vec![edge]).await;

    let up = engine.get_upstream("t2", 5).await.unwrap();
    assert_eq!(up[0].entity_ids(), vec!["t2", "t1"]);
    let down = engine.get_downstream("t1", 5).await.unwrap();
    assert_eq!(down[0].entity_ids(), vec!["t1", "t2"]);
}

#[tokio::test]
async fn test_depth_is_validated() {
    let engine = chain().await;
    for depth in [0, MAX_TRAVERSAL_DEPTH + 1] {
        let err = engine.get_upstream("c", depth).await.unwrap_err();
        assert!(matches!(err, LineageError::InvalidArgument(_)));
        let err = engine.find_path("c", "a", depth).await.unwrap_err();
        assert!(matches!(err, LineageError::InvalidArgument(_)));
    }
    assert!(engine.get_upstream("c", MAX_TRAVERSAL_DEPTH).await.is_ok());
    assert!(LineageEngine::new(Arc::new(InMemoryGraphStore::new()))
        .with_default_depth(0)
        .is_err());
}

#[tokio::test]
async fn test_missing_entity_has_no_lineage() {
    let engine = chain().await;
    assert!(engine.get_upstream("nope", 5).await.unwrap().is_empty());
    let summary = engine.get_transformation_summary("nope").await.unwrap();
    assert_eq!(summary.transformation_count, 0);
    assert!(summary.transformations.is_empty());
}

#[tokio::test]
async fn test_synonym_cycle_terminates() {
    let engine = engine(
        vec![node("s1"), node("s2")],
        vec![derives("s1", "s2", "SYNONYM FOR s2"), derives("s2", "s1", "SYNONYM FOR s1")],
    )
    .await;

    let paths = engine.get_upstream("s1", MAX_TRAVERSAL_DEPTH).await.unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].entity_ids(), vec!["s1", "s2"]);
}

#[tokio::test]
async fn test_summary_counts_shared_edges_per_path() {
    let engine = engine(
        vec![node("c"), node("b"), node("a1"), node("a2")],
        vec![derives("c", "b", "x"), derives("b", "a1", "y"), derives("b", "a2", "z")],
    )
    .await;

    let summary = engine.get_transformation_summary("c").await.unwrap();
    assert_eq!(summary.entity_id, "c");
    assert_eq!(summary.transformation_count, 4);
    assert_eq!(summary.transformations.len(), 3);
    assert!(summary.transformations.contains("x"));
}

#[tokio::test]
async fn test_path_confidence_is_product() {
    let engine = engine(
        vec![node("a"), node("b"), node("c")],
        vec![
            derives("c", "b", "b").with_confidence(0.5),
            derives("b", "a", "a").with_confidence(0.7),
        ],
    )
    .await;

    let paths = engine.get_upstream("c", 10).await.unwrap();
    assert!((paths[0].confidence - 0.35).abs() < 1e-9);
}

#[tokio::test]
async fn test_find_path_follows_stored_orientation() {
    let engine = engine(
        vec![node("a"), node("b"), node("c"), node("d")],
        vec![
            GraphRelationship::new(id("a"), id("b"), RelationshipType::DependsOn),
            GraphRelationship::new(id("b"), id("c"), RelationshipType::Contains),
            GraphRelationship::new(id("c"), id("d"), RelationshipType::Contains),
        ],
    )
    .await;

    let paths = engine.find_path("a", "c", 10).await.unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].entity_ids(), vec!["a", "b", "c"]);

    assert!(engine.find_path("c", "a", 10).await.unwrap().is_empty());
    assert!(engine.find_path("a", "c", 1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_validate_lineage_types() {
    let engine = engine(
        vec![
            node("c").with_data_type("VARCHAR"),
            node("b").with_data_type("INT"),
            node("a1").with_data_type("INT"),
            node("a2"),
        ],
        vec![derives("c", "b", "x"), derives("b", "a1", "y"), derives("b", "a2", "z")],
    )
    .await;

    let records = engine.validate_lineage_types("c").await.unwrap();
    // c <- b appears on both paths but is reported once; a2 has no type
    assert_eq!(records.len(), 2);
    let changed = records.iter().find(|r| r.source == "b").unwrap();
    assert_eq!(changed.target, "c");
    assert_eq!(changed.data_type, "INT");
    assert_eq!(changed.target_data_type.as_deref(), Some("VARCHAR"));
    assert_eq!(changed.status, ValidationStatus::TypeChanged);
    let passed = records.iter().find(|r| r.source == "a1").unwrap();
    assert_eq!(passed.status, ValidationStatus::Passed);
}

#[tokio::test]
async fn test_trace_column_and_table_dependencies() {
    let x = QualifiedName::new("db", "dbo", "x");
    let t = QualifiedName::new("db", "dbo", "t");
    let x_a = GraphEntity::column(&x, "a");
    let t_a = GraphEntity::column(&t, "a");
    let loader = GraphEntity::new(id("script_load"), EntityType::Script, "load.sql");
    let report = GraphEntity::new(id("script_report"), EntityType::Script, "report.sql");
    let engine = engine(
        vec![GraphEntity::table(&x), GraphEntity::table(&t), x_a, t_a, loader, report],
        vec![
            GraphRelationship::new(id("db_dbo_x"), id("db_dbo_x_a"), RelationshipType::Contains),
            GraphRelationship::new(id("db_dbo_t"), id("db_dbo_t_a"), RelationshipType::Contains),
            derives("db_dbo_x_a", "db_dbo_t_a", "t.a"),
            GraphRelationship::new(id("script_load"), id("db_dbo_x"), RelationshipType::WritesTo),
            GraphRelationship::new(id("script_load"), id("db_dbo_t"), RelationshipType::ReadsFrom),
            GraphRelationship::new(id("script_report"), id("db_dbo_x"), RelationshipType::ReadsFrom),
        ],
    )
    .await
    .with_name_defaults(Some("db"), Some("dbo"));

    let trace = engine.trace_column("x", "A").await.unwrap();
    assert_eq!(trace.column_id, "db_dbo_x_a");
    assert_eq!(trace.upstream.len(), 1);
    assert!(trace.downstream.is_empty());
    let trace = engine.trace_column("db_dbo_t", "a").await.unwrap();
    assert_eq!(trace.downstream[0].entity_ids(), vec!["db_dbo_t_a", "db_dbo_x_a"]);
    assert!(engine.trace_column("x", " ").await.is_err());

    let deps = engine.get_table_dependencies("db_dbo_x").await.unwrap();
    assert_eq!(deps.table.unwrap().entity_type, EntityType::Table);
    let readers: Vec<_> = deps.readers.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(readers, vec!["script_report"]);
    assert_eq!(deps.writers[0].id, "script_load");
    assert_eq!(deps.columns[0].id, "db_dbo_x_a");

    let missing = engine.get_table_dependencies("db_dbo_nope").await.unwrap();
    assert!(missing.table.is_none() && missing.readers.is_empty());

    let column = engine.get_table_dependencies("db_dbo_x_a").await.unwrap();
    assert_eq!(column.table.unwrap().entity_type, EntityType::Column);
    assert!(column.readers.is_empty() && column.columns.is_empty());
}

#[tokio::test]
async fn test_find_entities() {
    let engine = chain().await;
    let all = engine.find_entities("", None).await.unwrap();
    assert_eq!(all.len(), 3);
    let columns = engine.find_entities("B", Some(EntityType::Column)).await.unwrap();
    assert_eq!(columns.len(), 1);
    assert!(engine
        .find_entities("b", Some(EntityType::Table))
        .await
        .unwrap()
        .is_empty());
}

#[test]
fn test_summarize_without_paths() {
    let summary = summarize("x", &[]);
    assert_eq!(summary.transformation_count, 0);
    assert!(validate(&[]).is_empty());
}
