use super::*;

#[test]
fn test_postgres_parse() {
    let dialect = PostgresDialect::new();
    let stmts = dialect.parse("select \"id\" from \"users\"").unwrap();
    assert_eq!(stmts.len(), 1);
}

#[test]
fn test_bigquery_parse() {
    let dialect = BigQueryDialect::new();
    let stmts = dialect.parse("select `id` from `ds`.`users`").unwrap();
    assert_eq!(stmts.len(), 1);
}

#[test]
fn test_quote_ident() {
    assert_eq!(PostgresDialect::new().quote_ident("user\"name"), "\"user\"\"name\"");
    assert_eq!(SnowflakeDialect::new().quote_ident("user"), "\"user\"");
    assert_eq!(RedshiftDialect::new().quote_ident("user"), "\"user\"");
    assert_eq!(BigQueryDialect::new().quote_ident("user"), "`user`");
}

#[test]
fn test_string_literals() {
    assert_eq!(PostgresDialect::new().string_literal("it's"), "'it''s'");
    assert_eq!(BigQueryDialect::new().string_literal("it's"), "'it\\'s'");
}

#[test]
fn test_type_names() {
    let int_types: Vec<&str> = DialectKind::ALL
        .iter()
        .map(|kind| dialect_for(*kind).type_name(TyKind::Int))
        .collect();
    assert_eq!(int_types, vec!["bigint", "int64", "integer", "bigint"]);
    assert_eq!(PostgresDialect::new().type_name(TyKind::Timestamp), "timestamptz");
    assert_eq!(SnowflakeDialect::new().type_name(TyKind::Timestamp), "timestamp_tz");
    assert_eq!(RedshiftDialect::new().type_name(TyKind::String), "varchar");
    assert_eq!(BigQueryDialect::new().type_name(TyKind::Boolean), "bool");
}

#[test]
fn test_dialect_for_round_trips_kind() {
    for kind in DialectKind::ALL {
        let dialect = dialect_for(kind);
        assert_eq!(dialect.kind(), kind);
        assert_eq!(dialect.name(), kind.name());
    }
}

#[test]
fn test_median_spelling() {
    assert_eq!(
        PostgresDialect::new().median("\"x\"", TyKind::Int),
        "percentile_disc(0.5) within group (order by \"x\")"
    );
    assert_eq!(
        PostgresDialect::new().median("\"x\"", TyKind::Float),
        "percentile_cont(0.5) within group (order by \"x\")"
    );
    assert_eq!(
        BigQueryDialect::new().median("`x`", TyKind::Float),
        "approx_quantiles(`x`, 2)[offset(1)]"
    );
    assert_eq!(SnowflakeDialect::new().median("\"x\"", TyKind::Int), "median(\"x\")");
}

#[test]
fn test_series_sources() {
    assert_eq!(
        PostgresDialect::new().series(0, 3).unwrap(),
        (
            "\"n\"".to_string(),
            "generate_series(0, 2) as \"series\"(\"n\")".to_string()
        )
    );
    assert_eq!(
        BigQueryDialect::new().series(5, 10).unwrap().1,
        "unnest(generate_array(5, 9)) as `n`"
    );
    assert_eq!(
        SnowflakeDialect::new().series(0, 3).unwrap(),
        (
            "(row_number() over (order by seq4()) - 1)".to_string(),
            "table (generator(rowcount => 3))".to_string()
        )
    );
    assert_eq!(
        SnowflakeDialect::new().series(10, 12).unwrap().0,
        "(row_number() over (order by seq4()) + 9)"
    );
    assert!(matches!(
        RedshiftDialect::new().series(0, 3),
        Err(SqlError::Unsupported { dialect: "redshift", .. })
    ));
}

#[test]
fn test_union_keywords() {
    assert_eq!(PostgresDialect::new().union_keyword(UnionKind::Distinct), "union");
    assert_eq!(
        BigQueryDialect::new().union_keyword(UnionKind::Distinct),
        "union distinct"
    );
    assert_eq!(SnowflakeDialect::new().union_keyword(UnionKind::All), "union all");
}

#[test]
fn test_values_encodings() {
    assert_eq!(PostgresDialect::new().values_encoding(), ValuesEncoding::Native);
    assert_eq!(RedshiftDialect::new().values_encoding(), ValuesEncoding::Native);
    assert_eq!(
        SnowflakeDialect::new().values_encoding(),
        ValuesEncoding::JsonParameter
    );
    assert_eq!(
        BigQueryDialect::new().values_encoding(),
        ValuesEncoding::StructArray
    );
}

#[test]
fn test_parse_error_location() {
    let dialect = PostgresDialect::new();
    let result = dialect.parse("select 1\nfrom )");
    if let Err(SqlError::ParseError {
        line,
        column,
        message,
    }) = result
    {
        assert_eq!(line, 2, "message: {message}");
        assert!(column > 0, "message: {message}");
    } else {
        panic!("expected a parse error");
    }
}

#[test]
fn test_parse_location_extraction() {
    let (line, col) = super::parse_location_from_error("Expected: something at Line: 5, Column: 10");
    assert_eq!(line, 5);
    assert_eq!(col, 10);

    let (line, col) = super::parse_location_from_error("Some error without location");
    assert_eq!(line, 0);
    assert_eq!(col, 0);
}
