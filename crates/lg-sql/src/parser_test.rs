use super::*;

#[test]
fn test_parse_select() {
    let parser = SqlParser::duckdb();
    let stmts = parser
        .parse("SELECT id, name FROM users WHERE id = 1")
        .unwrap();
    assert_eq!(stmts.len(), 1);
}

#[test]
fn test_parse_empty() {
    let parser = SqlParser::generic();
    assert!(matches!(parser.parse("  "), Err(SqlError::EmptySql)));
}

#[test]
fn test_from_dialect_name() {
    let parser = SqlParser::from_dialect_name("mssql").unwrap();
    assert_eq!(parser.dialect_name(), "tsql");

    let result = SqlParser::from_dialect_name("unknown");
    assert!(matches!(result, Err(SqlError::UnknownDialect(_))));
}

#[test]
fn test_split_respects_strings_and_comments() {
    let parser = SqlParser::generic();
    let chunks = parser
        .split_statements("SELECT ';' AS s;\n-- a; b\nSELECT 2;\n\n;")
        .unwrap();
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].text.contains("';'"));
    assert_eq!(chunks[0].line, 1);
    assert_eq!(chunks[1].line, 3);
}

#[test]
fn test_split_keeps_begin_end_blocks() {
    let parser = SqlParser::tsql();
    let sql = "CREATE PROCEDURE p AS BEGIN UPDATE t SET a = 1; DELETE FROM u; END;\nSELECT 1";
    let chunks = parser.split_statements(sql).unwrap();
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].text.trim_end().ends_with("END"));
}

#[test]
fn test_split_procedural_end_keywords() {
    let parser = SqlParser::generic();
    let sql = "CREATE PROCEDURE p() AS BEGIN IF x THEN DELETE FROM t; END IF; \
               WHILE y LOOP UPDATE u SET a = 1; END LOOP; INSERT INTO v SELECT 1; END;\nSELECT 2";
    let chunks = parser.split_statements(sql).unwrap();
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].text.contains("INSERT INTO v"));
    assert_eq!(chunks[1].text.trim(), "SELECT 2");
}

#[test]
fn test_split_tsql_end_followed_by_if_closes_block() {
    let parser = SqlParser::tsql();
    let sql = "IF @a = 1 BEGIN DELETE FROM t; END IF @b = 2 BEGIN DELETE FROM u; END; SELECT 1";
    let chunks = parser.split_statements(sql).unwrap();
    assert_eq!(chunks.len(), 2);
}

#[test]
fn test_split_case_expression() {
    let parser = SqlParser::generic();
    let chunks = parser
        .split_statements("SELECT CASE WHEN a THEN 1 END FROM t; SELECT 2")
        .unwrap();
    assert_eq!(chunks.len(), 2);
}

#[test]
fn test_parse_script_whole() {
    let parser = SqlParser::generic();
    let script = parser.parse_script("SELECT 1;\nSELECT 2;");
    assert!(script.failures.is_empty());
    assert_eq!(script.statements.len(), 2);
    assert_eq!(script.statements[1].index, 1);
    assert_eq!(script.statements[1].line, Some(2));
}

#[test]
fn test_parse_script_isolates_failures() {
    let parser = SqlParser::generic();
    let script = parser.parse_script("SELECT a FROM t;\nSELEC a FRM t;\nSELECT b FROM u;");
    assert_eq!(script.statements.len(), 2);
    assert_eq!(script.failures.len(), 1);
    let failure = &script.failures[0];
    assert_eq!(failure.index, 1);
    assert_eq!(failure.line, Some(2));
    assert!(matches!(failure.error, SqlError::ParseError { .. }));
    assert_eq!(script.statements[1].index, 2);
}

#[test]
fn test_unparseable_create_becomes_command() {
    let parser = SqlParser::generic();
    let stmts = parser
        .parse_statement("CREATE SYNONYM dbo.cust FOR bronze.dbo.raw_customers")
        .unwrap();
    match &stmts[0] {
        SqlStatement::Command(cmd) => {
            assert_eq!(cmd.verb, "CREATE");
            assert!(cmd.text.contains("SYNONYM"));
        }
        other => panic!("expected opaque command, got {:?}", other),
    }
}

#[test]
fn test_unparseable_select_is_error() {
    let parser = SqlParser::generic();
    assert!(parser.parse_statement("SELEC a FRM t").is_err());
}

#[test]
fn test_parse_script_empty() {
    let script = SqlParser::generic().parse_script("   ");
    assert!(script.statements.is_empty());
    assert!(script.failures.is_empty());
}
