//! Generated SQL across dialects, through the public API

use era_core::Dialect;
use era_ir::*;
use era_sql::*;

fn some_table() -> Relation {
    Relation::from_table(
        "some_schema",
        "some_table_name",
        [
            ("foo", Ty::nn(TyKind::String)),
            ("bar", Ty::nn(TyKind::Int)),
        ],
    )
}

fn customers() -> Relation {
    Relation::from_table(
        "shop",
        "customers",
        [("id", Ty::nn(TyKind::Int)), ("name", Ty::nn(TyKind::String))],
    )
}

fn orders() -> Relation {
    Relation::from_table(
        "shop",
        "orders",
        [
            ("customer_id", Ty::nn(TyKind::Int)),
            ("amount", Ty::nullable(TyKind::Float)),
        ],
    )
}

fn assert_valid_postgres(sql: &str) {
    if let Err(e) = validate_sql(sql, &PostgresDialect::new()) {
        panic!("generated SQL does not parse: {e}\n{sql}");
    }
}

#[test]
fn test_filtered_scan_in_every_dialect() {
    let rel = some_table().filter(|t| t.attr("bar").gt(2)).unwrap();

    let expected = r#"select "bar" as "bar", "foo" as "foo" from "some_schema"."some_table_name" where ("bar" > 2)"#;
    assert_eq!(rel.postgres_sql().unwrap().sql, expected);
    assert_eq!(rel.snowflake_sql().unwrap().sql, expected);
    assert_eq!(rel.redshift_sql().unwrap().sql, expected);
    assert_eq!(
        rel.bigquery_sql().unwrap().sql,
        "select `bar` as `bar`, `foo` as `foo` from `some_schema`.`some_table_name` where (`bar` > 2)"
    );
    for dialect in Dialect::ALL {
        assert!(rel.sql(dialect).unwrap().params.is_empty());
    }
    assert_valid_postgres(expected);
}

#[test]
fn test_pick_and_except_generate_the_same_sql() {
    let wide = Relation::from_table(
        "shop",
        "items",
        [
            ("id", Ty::nn(TyKind::Int)),
            ("price", Ty::nullable(TyKind::Float)),
            ("sku", Ty::nn(TyKind::String)),
        ],
    );
    let cases = [
        (some_table(), vec!["foo"], vec!["bar"]),
        (
            some_table().filter(|t| t.attr("bar").gt(2)).unwrap(),
            vec!["bar"],
            vec!["foo"],
        ),
        (wide.clone(), vec!["id", "sku"], vec!["price"]),
        (wide.limit(3), vec!["price"], vec!["id", "sku"]),
    ];

    for (input, keep, drop) in cases {
        let picked = input.select(|t| t.pick(&keep)).unwrap();
        let excepted = input.select(|t| t.except(&drop)).unwrap();
        for dialect in Dialect::ALL {
            assert_eq!(
                picked.sql(dialect).unwrap(),
                excepted.sql(dialect).unwrap(),
                "{dialect}: pick {keep:?} vs except {drop:?}"
            );
        }
    }
}

#[test]
fn test_values_encodings() {
    let rel = Relation::values(vec![row! { "n" => 1 }, row! { "n" => 2 }]).unwrap();

    let postgres = rel.postgres_sql().unwrap();
    assert_eq!(
        postgres.sql,
        r#"(select arg_0 as "n" from (values (1), (2)) as vals(arg_0))"#
    );
    assert!(postgres.params.is_empty());
    assert_valid_postgres(&postgres.sql);

    let snowflake = rel.snowflake_sql().unwrap();
    assert_eq!(
        snowflake.sql,
        r#"select cast(value['n'] as integer) as "n" from table (flatten(input => parse_json((:1))))"#
    );
    assert_eq!(
        snowflake.params,
        vec![Literal::String(r#"[{"n":1},{"n":2}]"#.to_string())]
    );

    assert_eq!(
        rel.bigquery_sql().unwrap().sql,
        "select `n` as `n` from unnest([struct(1 as `n`), struct(2 as `n`)])"
    );
}

#[test]
fn test_values_with_declared_float_and_nulls() {
    let rel = Relation::values_with_attributes(
        vec![
            row! { "x" => 1, "label" => "a" },
            row! { "x" => 2.5, "label" => Literal::Null },
        ],
        [
            ("x", Ty::nn(TyKind::Float)),
            ("label", Ty::nullable(TyKind::String)),
        ]
        .into_iter()
        .collect(),
    )
    .unwrap();
    assert_eq!(
        rel.postgres_sql().unwrap().sql,
        r#"(select arg_0 as "x", arg_1 as "label" from (values (1.0, 'a'), (2.5, cast(null as text))) as vals(arg_0, arg_1))"#
    );
    assert_eq!(
        rel.snowflake_sql().unwrap().params,
        vec![Literal::String(
            r#"[{"label":"a","x":1.0},{"label":null,"x":2.5}]"#.to_string()
        )]
    );
}

#[test]
fn test_shared_values_become_a_cte() {
    let base = Relation::values(vec![
        row! { "foo" => 1, "bar" => "a" },
        row! { "foo" => 2, "bar" => "b" },
    ])
    .unwrap();
    let joined = base
        .inner_join(&base, |l, r| {
            JoinSpec::new(
                eq(l.attr("foo"), r.attr("foo")),
                l.star().with("other_bar", r.attr("bar")),
            )
        })
        .unwrap();

    let sql = joined.postgres_sql().unwrap().sql;
    assert!(sql.starts_with(r#"with "cte1" as ("#), "{sql}");
    assert_eq!(
        sql,
        concat!(
            r#"with "cte1" as (select arg_0 as "foo", arg_1 as "bar" from (values (1, 'a'), (2, 'b')) as vals(arg_0, arg_1)) "#,
            r#"select "t1"."foo" as "foo", "t1"."bar" as "bar", "t2"."bar" as "other_bar" "#,
            r#"from "cte1" as "t1" inner join "cte1" as "t2" on ("t1"."foo" = "t2"."foo")"#
        )
    );
    assert_valid_postgres(&sql);

    // one JSON parameter, bound once for the shared node
    let snowflake = joined.snowflake_sql().unwrap();
    assert_eq!(snowflake.params.len(), 1);
    assert!(snowflake.sql.ends_with(
        r#"from "cte1" as "t1" inner join "cte1" as "t2" on ("t1"."foo" = "t2"."foo")"#
    ));
}

#[test]
fn test_outer_join_of_tables() {
    let rel = customers()
        .left_join(&orders(), |c, o| {
            JoinSpec::new(
                eq(c.attr("id"), o.attr("customer_id")),
                c.pick(&["name"]).with("amount", o.attr("amount")),
            )
        })
        .unwrap();
    let sql = rel.postgres_sql().unwrap().sql;
    assert_eq!(
        sql,
        r#"select "t1"."name" as "name", "t2"."amount" as "amount" from "shop"."customers" as "t1" left join "shop"."orders" as "t2" on ("t1"."id" = "t2"."customer_id")"#
    );
    assert_valid_postgres(&sql);

    let filtered = rel.filter(|t| t.attr("amount").gt(10)).unwrap();
    let sql = filtered.postgres_sql().unwrap().sql;
    assert!(
        sql.starts_with(r#"select "name" as "name", "amount" as "amount" from (select "t1"."name""#),
        "{sql}"
    );
    assert!(sql.ends_with(r#") as "t3" where ("amount" > 10)"#), "{sql}");
    assert_valid_postgres(&sql);
}

#[test]
fn test_full_join_keyword() {
    let rel = customers()
        .full_join(&orders(), |c, o| {
            JoinSpec::new(eq(c.attr("id"), o.attr("customer_id")), c.pick(&["id"]))
        })
        .unwrap();
    assert!(rel
        .bigquery_sql()
        .unwrap()
        .sql
        .contains("`shop`.`customers` as `t1` full outer join `shop`.`orders` as `t2`"));
}

#[test]
fn test_aggregate() {
    let rel = orders()
        .aggregate(|t| {
            Aggregation::by(t.pick(&["customer_id"]))
                .with("total", sum(t.attr("amount")))
                .with("orders", count())
        })
        .unwrap();
    let sql = rel.postgres_sql().unwrap().sql;
    assert_eq!(
        sql,
        r#"select "customer_id" as "customer_id", sum("amount") as "total", count(*) as "orders" from "shop"."orders" group by "customer_id""#
    );
    assert_valid_postgres(&sql);
}

#[test]
fn test_median_per_dialect() {
    let rel = orders()
        .summary(|t| Projection::new().with("mid", median(t.attr("customer_id"))))
        .unwrap();
    assert_eq!(
        rel.postgres_sql().unwrap().sql,
        r#"select percentile_disc(0.5) within group (order by "customer_id") as "mid" from "shop"."orders""#
    );
    assert_eq!(
        rel.bigquery_sql().unwrap().sql,
        "select approx_quantiles(`customer_id`, 2)[offset(1)] as `mid` from `shop`.`orders`"
    );
    assert_eq!(
        rel.snowflake_sql().unwrap().sql,
        r#"select median("customer_id") as "mid" from "shop"."orders""#
    );
}

#[test]
fn test_assert_limit() {
    let rel = customers().assert_limit(3);
    let sql = rel.postgres_sql().unwrap().sql;
    assert_eq!(
        sql,
        concat!(
            r#"select "id" as "id", "name" as "name" from ("#,
            r#"select "id" as "id", "name" as "name", count(*) over () as "__era_row_count" from ("#,
            r#"select "id" as "id", "name" as "name" from "shop"."customers" limit 4"#,
            r#") as "t1") as "t2" "#,
            r#"where cast(case when ("__era_row_count" > 3) then 'Invariant *LIMIT IS BELOW 3* failed!' else '0' end as bigint) = 0"#
        )
    );
    assert!(sql.contains(&limit_invariant_message(3)));
    assert_valid_postgres(&sql);

    let bigquery = rel.bigquery_sql().unwrap().sql;
    assert!(bigquery.contains("as int64) = 0"), "{bigquery}");
}

#[test]
fn test_generate_series() {
    let rel = Relation::generate_series(0, 3);
    let sql = rel.postgres_sql().unwrap().sql;
    assert_eq!(
        sql,
        r#"select "n" as "n" from generate_series(0, 2) as "series"("n")"#
    );
    assert_valid_postgres(&sql);
    assert_eq!(
        rel.bigquery_sql().unwrap().sql,
        "select `n` as `n` from unnest(generate_array(0, 2)) as `n`"
    );
    assert_eq!(
        rel.snowflake_sql().unwrap().sql,
        r#"select (row_number() over (order by seq4()) - 1) as "n" from table (generator(rowcount => 3))"#
    );
    let err = rel.redshift_sql().unwrap_err();
    assert!(matches!(err, SqlError::Unsupported { dialect: "redshift", .. }));

    let empty = Relation::generate_series(3, 3);
    assert_eq!(
        empty.redshift_sql().unwrap().sql,
        r#"select cast(null as bigint) as "n" limit 0"#
    );
}

#[test]
fn test_union_aligns_columns_by_name() {
    let left = Relation::from_table(
        "s",
        "a",
        [("x", Ty::nn(TyKind::Int)), ("y", Ty::nn(TyKind::Int))],
    );
    let right = Relation::from_table(
        "s",
        "b",
        [("x", Ty::nn(TyKind::Int)), ("y", Ty::nn(TyKind::Int))],
    )
    .select(|t| t.pick(&["y", "x"]))
    .unwrap();

    let sql = left.union_all(&right).unwrap().postgres_sql().unwrap().sql;
    assert_eq!(
        sql,
        r#"select "x" as "x", "y" as "y" from ((select "x" as "x", "y" as "y" from "s"."a") union all (select "x" as "x", "y" as "y" from "s"."b")) as "t1""#
    );
    assert_valid_postgres(&sql);

    let distinct = left.union_distinct(&right).unwrap();
    assert!(distinct
        .bigquery_sql()
        .unwrap()
        .sql
        .contains(") union distinct ("));
    assert!(distinct.postgres_sql().unwrap().sql.contains(") union ("));
}

#[test]
fn test_ordered_select_with_limit() {
    let rel = customers()
        .select_with(
            |t| t.pick(&["id"]).with("double", t.attr("id").mul(2)),
            SelectOptions::default()
                .order_by(vec![desc(attr("double"))])
                .limit(10),
        )
        .unwrap();
    let sql = rel.postgres_sql().unwrap().sql;
    assert_eq!(
        sql,
        r#"select "id" as "id", ("id" * 2) as "double" from "shop"."customers" order by "double" desc limit 10"#
    );
    assert_valid_postgres(&sql);
}

#[test]
fn test_bigquery_offset_needs_a_limit() {
    let rel = customers()
        .select_with(|t| t.pick(&["id"]), SelectOptions::default().offset(5))
        .unwrap();
    assert!(rel.postgres_sql().unwrap().sql.ends_with(r#"from "shop"."customers" offset 5"#));
    assert!(rel
        .bigquery_sql()
        .unwrap()
        .sql
        .ends_with("limit 9223372036854775807 offset 5"));
}

#[test]
fn test_dialect_specific_functions() {
    let rel = orders()
        .select(|t| {
            Projection::new()
                .with("m", t.attr("customer_id").modulo(3))
                .with("l", log10(t.attr("amount")))
                .with("r", random())
        })
        .unwrap();
    assert_eq!(
        rel.postgres_sql().unwrap().sql,
        r#"select ("customer_id" % 3) as "m", log("amount") as "l", random() as "r" from "shop"."orders""#
    );
    assert_eq!(
        rel.bigquery_sql().unwrap().sql,
        "select mod(`customer_id`, 3) as `m`, log10(`amount`) as `l`, rand() as `r` from `shop`.`orders`"
    );
    assert_eq!(
        rel.snowflake_sql().unwrap().sql,
        r#"select ("customer_id" % 3) as "m", log(10, "amount") as "l", uniform(0::float, 1::float, random()) as "r" from "shop"."orders""#
    );
}

#[test]
fn test_invalid_relation_is_reported() {
    let rel = Relation::new(RelationKind::Filter {
        input: some_table(),
        predicate: attr("missing").gt(1),
    });
    let err = rel.postgres_sql().unwrap_err();
    let err = match err {
        SqlError::Type(err) => err,
        other => panic!("expected a type error, got {other}"),
    };
    assert!(matches!(err.cause(), TypeError::NoSuchAttribute { .. }));
    assert_eq!(err.node(), Some((rel.id(), "filter")));
}
