use super::*;
use crate::dialect::{BigQueryDialect, PostgresDialect};

#[test]
fn test_validate_select() {
    let dialect = PostgresDialect::new();
    assert!(validate_sql("select \"id\" as \"id\" from \"s\".\"users\"", &dialect).is_ok());
}

#[test]
fn test_validate_backticks_for_bigquery() {
    let dialect = BigQueryDialect::new();
    assert!(validate_sql("select `id` as `id` from `s`.`users`", &dialect).is_ok());
}

#[test]
fn test_empty_sql() {
    let dialect = PostgresDialect::new();
    assert!(matches!(
        validate_sql("  \n ", &dialect),
        Err(SqlError::EmptySql)
    ));
}

#[test]
fn test_insert_rejected() {
    let dialect = PostgresDialect::new();
    assert!(matches!(
        validate_sql("insert into users values (1)", &dialect),
        Err(SqlError::ValidationError(_))
    ));
}

#[test]
fn test_multiple_statements_rejected() {
    let dialect = PostgresDialect::new();
    let err = validate_sql("select 1; select 2", &dialect).unwrap_err();
    assert_eq!(
        err.to_string(),
        "[S004] SQL validation failed: expected exactly one statement, found 2"
    );
}

#[test]
fn test_syntax_error_has_location() {
    let dialect = PostgresDialect::new();
    match validate_sql("select 1\nfrom )", &dialect) {
        Err(SqlError::ParseError { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected a parse error, got {other:?}"),
    }
}
