use super::*;
use std::io::Write;
use tempfile::TempDir;

#[test]
fn test_parse_minimal_config() {
    let config = Config::from_yaml("name: warehouse").unwrap();
    assert_eq!(config.name.as_deref(), Some("warehouse"));
    assert_eq!(config.dialect, "generic");
    assert_eq!(config.traversal.max_depth, 10);
    assert_eq!(config.store.retry.max_attempts, 3);
    assert_eq!(config.store.retry.initial_delay_ms, 2000);
    assert_eq!(config.store.retry.max_delay_ms, 10000);
    assert_eq!(config.ingest.concurrency, 4);
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
name: warehouse
dialect: tsql
defaults:
  database: bronze
  schema: dbo
traversal:
  max_depth: 25
store:
  timeout_ms: 5000
  retry:
    max_attempts: 5
    initial_delay_ms: 100
    max_delay_ms: 1000
    multiplier: 1.5
ingest:
  concurrency: 8
analyzer:
  builtin_functions: [MY_SCALAR_FN]
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.dialect, "tsql");
    assert_eq!(config.default_database(), Some("bronze"));
    assert_eq!(config.default_schema(), Some("dbo"));
    assert_eq!(config.traversal.max_depth, 25);
    assert_eq!(config.store.timeout_ms, 5000);
    assert_eq!(config.store.retry.multiplier, 1.5);
    assert_eq!(config.ingest.concurrency, 8);
    assert_eq!(config.analyzer.builtin_functions, vec!["MY_SCALAR_FN"]);
}

#[test]
fn test_empty_config_is_default() {
    assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
}

#[test]
fn test_unknown_field_rejected() {
    let err = Config::from_yaml("name: x\nmodel_paths: [models]").unwrap_err();
    assert!(matches!(err, CoreError::ConfigParseError { .. }));
}

#[test]
fn test_depth_out_of_range_rejected() {
    for depth in [0, 51] {
        let yaml = format!("traversal:\n  max_depth: {}", depth);
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }), "depth {}", depth);
    }
    assert!(Config::from_yaml("traversal:\n  max_depth: 50").is_ok());
}

#[test]
fn test_invalid_retry_rejected() {
    assert!(Config::from_yaml("store:\n  retry:\n    max_attempts: 0").is_err());
    assert!(Config::from_yaml("store:\n  retry:\n    multiplier: 0.5").is_err());
    assert!(Config::from_yaml(
        "store:\n  retry:\n    initial_delay_ms: 20000\n    max_delay_ms: 100"
    )
    .is_err());
}

#[test]
fn test_invalid_concurrency_and_names_rejected() {
    assert!(Config::from_yaml("ingest:\n  concurrency: 0").is_err());
    assert!(Config::from_yaml("name: \"  \"").is_err());
    assert!(Config::from_yaml("analyzer:\n  builtin_functions: [\"\"]").is_err());
}

#[test]
fn test_load_from_dir() {
    let dir = TempDir::new().unwrap();
    let mut file = std::fs::File::create(dir.path().join("lineage.yml")).unwrap();
    writeln!(file, "name: from_dir\ndialect: duckdb").unwrap();

    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.name.as_deref(), Some("from_dir"));
    assert_eq!(config.dialect, "duckdb");
}

#[test]
fn test_load_from_dir_yaml_extension() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("lineage.yaml"), "dialect: snowflake\n").unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.dialect, "snowflake");
}

#[test]
fn test_load_missing() {
    let dir = TempDir::new().unwrap();
    let err = Config::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
    assert!(Config::load(&dir.path().join("nope.yml")).is_err());
}
