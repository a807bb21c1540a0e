use super::*;
use crate::traversal::LineageEngine;
use lg_store::InMemoryGraphStore;

fn sources() -> Vec<SourceFile> {
    vec![
        SourceFile::new("views/v.sql", "CREATE VIEW v AS SELECT a FROM t;"),
        SourceFile::new("load/x.sql", "INSERT INTO x SELECT a FROM v;\nSELEC oops FRM t;"),
    ]
}

fn config() -> Config {
    Config::from_yaml("name: nightly\ndefaults:\n  database: db\n  schema: dbo\ningest:\n  concurrency: 2\n")
        .unwrap()
}

#[tokio::test]
async fn test_ingest_collects_records_and_failures() {
    let store = Arc::new(InMemoryGraphStore::new());
    let ingestor = Ingestor::from_config(&config(), Analyzer::from_dialect_name("generic").unwrap(), store.clone());

    let report = ingestor.ingest(sources()).await;
    assert!(!report.run_id.is_nil());
    assert!(report.finished_at >= report.started_at);
    assert!(report.aborted.is_empty());

    let paths: Vec<_> = report.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["views/v.sql", "load/x.sql"]);
    assert_eq!(report.files[0].records.len(), 1);
    assert_eq!(report.files[1].records.len(), 1);
    assert_eq!(report.files[1].failures.len(), 1);
    assert_eq!(report.statement_count(), 2);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.files[0].checksum, compute_checksum("CREATE VIEW v AS SELECT a FROM t;"));

    let engine = LineageEngine::new(store.clone());
    let upstream = engine.get_upstream("db_dbo_x_a", 10).await.unwrap();
    assert_eq!(upstream.len(), 1);
    assert_eq!(upstream[0].entity_ids(), vec!["db_dbo_x_a", "db_dbo_v_a", "db_dbo_t_a"]);

    let pipeline = store.get_vertex("pipeline_nightly").await.unwrap().unwrap();
    assert_eq!(pipeline.label, "Pipeline");
}

#[tokio::test]
async fn test_ingest_is_idempotent_and_order_independent() {
    let serial_store = Arc::new(InMemoryGraphStore::new());
    let serial = Ingestor::new(Analyzer::from_dialect_name("generic").unwrap(), serial_store.clone())
        .with_concurrency(1)
        .with_defaults(Some("db"), Some("dbo"));
    serial.ingest(sources()).await;
    let vertices = serial_store.vertex_count().await.unwrap();
    let edges = serial_store.edge_count().await.unwrap();

    serial.ingest(sources()).await;
    assert_eq!(serial_store.vertex_count().await.unwrap(), vertices);
    assert_eq!(serial_store.edge_count().await.unwrap(), edges);

    let parallel_store = Arc::new(InMemoryGraphStore::new());
    let parallel = Ingestor::new(Analyzer::from_dialect_name("generic").unwrap(), parallel_store.clone())
        .with_concurrency(8)
        .with_defaults(Some("db"), Some("dbo"));
    let mut reversed = sources();
    reversed.reverse();
    parallel.ingest(reversed).await;
    assert_eq!(parallel_store.vertex_count().await.unwrap(), vertices);
    assert_eq!(parallel_store.edge_count().await.unwrap(), edges);
}

#[tokio::test]
async fn test_ingest_nothing() {
    let ingestor = Ingestor::new(
        Analyzer::from_dialect_name("generic").unwrap(),
        Arc::new(InMemoryGraphStore::new()),
    );
    let report = ingestor.ingest(Vec::new()).await;
    assert!(report.files.is_empty());
    assert_eq!(report.failure_count(), 0);
}
