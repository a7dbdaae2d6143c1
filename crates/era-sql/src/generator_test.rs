use super::*;
use crate::dialect::{BigQueryDialect, PostgresDialect, SnowflakeDialect};
use chrono::{NaiveDate, TimeZone, Utc};
use era_ir::*;

fn scan() -> Relation {
    Relation::from_table("s", "t", [("id", Ty::nn(TyKind::Int))])
}

fn postgres(relation: &Relation) -> String {
    generate(relation, &PostgresDialect::new()).unwrap().sql
}

fn project(build: impl FnOnce(&Scope) -> Projection) -> String {
    postgres(&scan().select(build).unwrap())
}

#[test]
fn test_constant_folding() {
    assert_eq!(
        project(|t| Projection::new()
            .with("y", Expr::from(1).add(2))
            .with("id", t.attr("id"))),
        r#"select 3 as "y", "id" as "id" from "s"."t""#
    );
    assert_eq!(
        project(|_| Projection::new().with("y", Expr::from(1).add(2).impure())),
        r#"select (1 + 2) as "y" from "s"."t""#
    );
    assert_eq!(
        project(|_| Projection::new().with("msg", f!["Result => ", eq(4, 4)])),
        r#"select 'Result => true' as "msg" from "s"."t""#
    );
    // the evaluator rejects division by zero, the database reports it
    assert_eq!(
        project(|_| Projection::new().with("y", Expr::from(1).div(0))),
        r#"select (cast(1 as double precision) / 0) as "y" from "s"."t""#
    );
}

#[test]
fn test_scalar_expressions() {
    assert_eq!(
        project(|t| Projection::new()
            .with("half", t.attr("id").div(2))
            .with("fl", t.attr("id").floor())
            .with("bits", t.attr("id").log2())
            .with("neg", t.attr("id").neg())),
        concat!(
            r#"select (cast("id" as double precision) / 2) as "half", "id" as "fl", "#,
            r#"(ln("id") / ln(2)) as "bits", (- "id") as "neg" from "s"."t""#
        )
    );
    assert_eq!(
        project(|t| Projection::new()
            .with(
                "size",
                case_when(
                    [(t.attr("id").gt(1), Expr::from("big"))],
                    Some(Expr::from("small"))
                )
            )
            .with("small", t.attr("id").one_of([1, 2]))
            .with("msg", f!["id=", t.attr("id")])
            .with("missing", t.attr("id").is_null().not())),
        concat!(
            r#"select (case when ("id" > 1) then 'big' else 'small' end) as "size", "#,
            r#"("id" in (1, 2)) as "small", ('id=' || cast("id" as text)) as "msg", "#,
            r#"(not ("id" is null)) as "missing" from "s"."t""#
        )
    );
}

#[test]
fn test_window_functions() {
    assert_eq!(
        project(|t| Projection::new()
            .with(
                "rn",
                row_number().over(vec![t.attr("id")], vec![desc(t.attr("id"))])
            )
            .with("prev", lag(t.attr("id"), 1).over(vec![], vec![asc(t.attr("id"))]))
            .with("total", sum(t.attr("id")).over(vec![], vec![]))),
        concat!(
            r#"select row_number() over (partition by "id" order by "id" desc) as "rn", "#,
            r#"lag("id", 1) over (order by "id" asc) as "prev", "#,
            r#"sum("id") over () as "total" from "s"."t""#
        )
    );
}

#[test]
fn test_windowed_median() {
    let rel = scan()
        .select(|t| Projection::new().with("m", median(t.attr("id")).over(vec![], vec![])))
        .unwrap();
    assert!(matches!(
        generate(&rel, &PostgresDialect::new()),
        Err(SqlError::Unsupported { dialect: "postgres", .. })
    ));
    assert!(matches!(
        generate(&rel, &BigQueryDialect::new()),
        Err(SqlError::Unsupported { dialect: "bigquery", .. })
    ));
    assert_eq!(
        generate(&rel, &SnowflakeDialect::new()).unwrap().sql,
        r#"select median("id") over () as "m" from "s"."t""#
    );
}

#[test]
fn test_filters_merge() {
    let rel = scan()
        .filter(|t| t.attr("id").gt(1))
        .unwrap()
        .filter(|t| t.attr("id").lt(5))
        .unwrap();
    assert_eq!(
        postgres(&rel),
        r#"select "id" as "id" from "s"."t" where ("id" > 1) and ("id" < 5)"#
    );
}

#[test]
fn test_filter_after_distinct_wraps() {
    let rel = scan()
        .select_with(|t| t.star(), SelectOptions::default().distinct())
        .unwrap()
        .filter(|t| t.attr("id").gt(1))
        .unwrap();
    assert_eq!(
        postgres(&rel),
        r#"select "id" as "id" from (select distinct "id" as "id" from "s"."t") as "t1" where ("id" > 1)"#
    );
}

#[test]
fn test_ordering() {
    let rel = scan()
        .order_by(|t| vec![desc(t.attr("id").mul(-1))])
        .unwrap();
    assert_eq!(
        postgres(&rel),
        r#"select "id" as "id" from "s"."t" order by ("id" * -1) desc"#
    );

    let rel = scan()
        .select(|t| Projection::new().with("d", t.attr("id").mul(2)))
        .unwrap()
        .order_by(|t| vec![asc(t.attr("d").add(1))])
        .unwrap();
    assert_eq!(
        postgres(&rel),
        r#"select "d" as "d" from (select ("id" * 2) as "d" from "s"."t") as "t1" order by ("d" + 1) asc"#
    );

    let rel = scan().order_by(|t| vec![asc(t.attr("id"))]).unwrap().limit(5);
    assert_eq!(
        postgres(&rel),
        r#"select "id" as "id" from "s"."t" order by "id" asc limit 5"#
    );

    let rel = scan().limit(5).order_by(|t| vec![asc(t.attr("id"))]).unwrap();
    assert_eq!(
        postgres(&rel),
        r#"select "id" as "id" from (select "id" as "id" from "s"."t" limit 5) as "t1" order by "id" asc"#
    );
}

#[test]
fn test_constant_keys() {
    let rel = scan().order_by(|_| vec![asc(Expr::from(1))]).unwrap();
    assert_eq!(postgres(&rel), r#"select "id" as "id" from "s"."t""#);

    let rel = scan()
        .aggregate(|_| Aggregation::by(Projection::new().with("k", Expr::from(1))).with("c", count()))
        .unwrap();
    assert_eq!(
        postgres(&rel),
        r#"select 1 as "k", count(*) as "c" from "s"."t" having count(*) > 0"#
    );

    let rel = scan()
        .aggregate(|t| {
            Aggregation::by(
                Projection::new()
                    .with("k", Expr::from(1))
                    .with("id", t.attr("id")),
            )
            .with("c", count())
        })
        .unwrap();
    assert_eq!(
        postgres(&rel),
        r#"select 1 as "k", "id" as "id", count(*) as "c" from "s"."t" group by "id""#
    );
}

#[test]
fn test_nested_limits_wrap() {
    let rel = scan().limit_offset(10, 2).limit(3);
    assert_eq!(
        postgres(&rel),
        r#"select "id" as "id" from (select "id" as "id" from "s"."t" limit 10 offset 2) as "t1" limit 3"#
    );
}

#[test]
fn test_empty_values() {
    let rel = Relation::values_with_attributes(
        vec![],
        [("x", Ty::nn(TyKind::Int)), ("label", Ty::nullable(TyKind::String))]
            .into_iter()
            .collect(),
    )
    .unwrap();
    assert_eq!(
        postgres(&rel),
        r#"select cast(null as bigint) as "x", cast(null as text) as "label" limit 0"#
    );
    let generated = generate(&rel, &SnowflakeDialect::new()).unwrap();
    assert!(generated.params.is_empty());
}

#[test]
fn test_temporal_literals() {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let rel = Relation::values(vec![row! { "at" => at, "day" => day }]).unwrap();
    assert_eq!(
        postgres(&rel),
        concat!(
            r#"(select arg_0 as "at", arg_1 as "day" from (values ("#,
            r#"cast('2024-03-01T12:00:00.000Z' as timestamptz), cast('2024-03-01' as date)"#,
            r#")) as vals(arg_0, arg_1))"#
        )
    );
    let snowflake = generate(&rel, &SnowflakeDialect::new()).unwrap();
    assert_eq!(
        snowflake.params,
        vec![Literal::String(
            r#"[{"at":"2024-03-01T12:00:00.000Z","day":"2024-03-01"}]"#.to_string()
        )]
    );
}

#[test]
fn test_bigquery_string_escaping() {
    let rel = Relation::from_table("s", "people", [("name", Ty::nn(TyKind::String))])
        .filter(|t| t.attr("name").eq("it's"))
        .unwrap();
    assert_eq!(
        generate(&rel, &BigQueryDialect::new()).unwrap().sql,
        r"select `name` as `name` from `s`.`people` where (`name` = 'it\'s')"
    );
    assert!(postgres(&rel).ends_with(r#"where ("name" = 'it''s')"#));
}

#[test]
fn test_snowflake_series_is_wrapped_before_filtering() {
    let rel = Relation::generate_series(0, 3)
        .filter(|t| t.attr("n").gt(0))
        .unwrap();
    assert_eq!(
        generate(&rel, &SnowflakeDialect::new()).unwrap().sql,
        concat!(
            r#"select "n" as "n" from (select (row_number() over (order by seq4()) - 1) as "n" "#,
            r#"from table (generator(rowcount => 3))) as "t1" where ("n" > 0)"#
        )
    );
    assert_eq!(
        postgres(&rel),
        r#"select "n" as "n" from generate_series(0, 2) as "series"("n") where ("n" > 0)"#
    );
}

#[test]
fn test_self_join_of_a_table_needs_no_cte() {
    let t = scan();
    let rel = t
        .inner_join(&t, |l, r| {
            JoinSpec::new(
                eq(l.attr("id"), r.attr("id")),
                Projection::new()
                    .with("a", l.attr("id"))
                    .with("b", r.attr("id")),
            )
        })
        .unwrap();
    assert_eq!(
        postgres(&rel),
        r#"select "t1"."id" as "a", "t2"."id" as "b" from "s"."t" as "t1" inner join "s"."t" as "t2" on ("t1"."id" = "t2"."id")"#
    );
    assert!(shared_nodes(&rel).is_empty());
}

#[test]
fn test_shared_nodes() {
    let base = scan().filter(|t| t.attr("id").gt(0)).unwrap();
    let left = base.limit(2);
    let rel = left.union_all(&base).unwrap();
    let shared = shared_nodes(&rel);
    assert_eq!(shared.len(), 1);
    assert!(shared.contains(&base.id()));

    let sql = postgres(&rel);
    assert_eq!(
        sql,
        concat!(
            r#"with "cte1" as (select "id" as "id" from "s"."t" where ("id" > 0)) "#,
            r#"select "id" as "id" from ((select "id" as "id" from "cte1" limit 2) "#,
            r#"union all (select "id" as "id" from "cte1")) as "t1""#
        )
    );
}

#[test]
fn test_unsupported_shapes() {
    let rel = Relation::values(vec![Row::new()]).unwrap();
    assert!(matches!(
        generate(&rel, &PostgresDialect::new()),
        Err(SqlError::Unsupported { .. })
    ));

    let rel = scan()
        .select(|t| Projection::new().with("x", t.attr("id").mul(f64::INFINITY)))
        .unwrap();
    assert!(matches!(
        generate(&rel, &PostgresDialect::new()),
        Err(SqlError::Unsupported { .. })
    ));
}

#[test]
fn test_limit_invariant_message() {
    assert_eq!(limit_invariant_message(5), "Invariant *LIMIT IS BELOW 5* failed!");
}

#[test]
fn test_limits_beyond_bigint_are_rejected() {
    let too_far = i64::MAX as u64 + 1;
    for rel in [
        scan().limit(too_far),
        scan().limit_offset(1, too_far),
        scan().assert_limit(too_far),
        scan().assert_limit(u64::MAX),
    ] {
        assert!(matches!(
            generate(&rel, &PostgresDialect::new()),
            Err(SqlError::Unsupported { .. })
        ));
    }
    assert!(postgres(&scan().limit(i64::MAX as u64)).ends_with(&format!("limit {}", i64::MAX)));
}
