use super::*;

#[test]
fn test_aliases_resolve() {
    let cases = [
        ("duckdb", "duckdb"),
        ("Snowflake", "snowflake"),
        ("tsql", "tsql"),
        ("mssql", "tsql"),
        ("postgresql", "postgres"),
        ("postgres", "postgres"),
        ("bigquery", "bigquery"),
        ("spark", "databricks"),
        ("databricks", "databricks"),
        ("hive", "hive"),
        ("auto", "generic"),
        ("generic", "generic"),
    ];
    for (alias, expected) in cases {
        let dialect = NamedDialect::from_name(alias).unwrap();
        assert_eq!(dialect.name(), expected, "alias {}", alias);
    }
}

#[test]
fn test_unknown_dialect() {
    let err = NamedDialect::from_name("cobol").err().unwrap();
    assert_eq!(err, SqlError::UnknownDialect("cobol".to_string()));
}

#[test]
fn test_parse_error_is_typed() {
    let err = NamedDialect::generic()
        .parse("SELEC 1\nFRM t")
        .unwrap_err();
    assert!(matches!(err, SqlError::ParseError { .. }));
}

#[test]
fn test_location_from_message() {
    assert_eq!(
        parse_location_from_error("Expected: identifier at Line: 3, Column: 14"),
        (3, 14)
    );
    assert_eq!(parse_location_from_error("no location"), (0, 0));
}
