//! Relation type checking: one ordered attribute set per node

use super::expr::{infer, Placement, TypeEnv};
use crate::error::{CheckResult, TypeError};
use crate::ir::expr::{Expr, SortKey};
use crate::ir::literal::{Literal, Row};
use crate::ir::relation::{JoinKind, Relation, RelationKind, SERIES_ATTRIBUTE};
use crate::ir::scope::Projection;
use crate::ir::types::{AttributeSet, Nullability, Ty, TyKind};
use std::collections::HashSet;

const SELECT: Placement = Placement {
    aggregates: false,
    windows: true,
    clause: "select projections",
};

const AGGREGATE_OUTPUT: Placement = Placement {
    aggregates: true,
    windows: false,
    clause: "aggregate outputs",
};

/// Compute the attribute set of one node. Inputs are checked (and memoized)
/// through [`Relation::check`].
pub(crate) fn check_relation(relation: &Relation) -> CheckResult<AttributeSet> {
    match relation.kind() {
        RelationKind::Scan { attributes, .. } => {
            ensure_unique(attributes.names())?;
            let mut sorted: Vec<(&str, Ty)> = attributes.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            Ok(sorted.into_iter().collect())
        }
        RelationKind::Values { rows, attributes } => match attributes {
            Some(declared) => check_declared_values(rows, declared),
            None => infer_values(rows),
        },
        RelationKind::GenerateSeries { .. } => {
            Ok([(SERIES_ATTRIBUTE, Ty::nn(TyKind::Int))].into_iter().collect())
        }
        RelationKind::Select {
            input,
            projection,
            order_by,
            ..
        } => {
            let input_attrs = input.check()?;
            let output = check_projection(projection, &TypeEnv::Single(input_attrs), SELECT)?;
            check_sort_keys(order_by, &TypeEnv::Single(&output))?;
            Ok(output)
        }
        RelationKind::Filter { input, predicate } => {
            let input_attrs = input.check()?;
            expect_boolean(
                predicate,
                &TypeEnv::Single(input_attrs),
                Placement::row("filter predicates"),
                "filter predicate",
            )?;
            Ok(input_attrs.clone())
        }
        RelationKind::Join {
            kind,
            left,
            right,
            on,
            projection,
        } => check_join(*kind, left, right, on, projection),
        RelationKind::OrderBy { input, keys } => {
            let input_attrs = input.check()?;
            check_sort_keys(keys, &TypeEnv::Single(input_attrs))?;
            Ok(input_attrs.clone())
        }
        RelationKind::Limit { input, .. } | RelationKind::AssertLimit { input, .. } => {
            Ok(input.check()?.clone())
        }
        RelationKind::Aggregate {
            input,
            group_by,
            aggregates,
        } => {
            let input_attrs = input.check()?;
            let env = TypeEnv::Single(input_attrs);
            let keys = check_projection(group_by, &env, Placement::row("group keys"))?;
            for (name, expr) in aggregates.iter() {
                if let Some(bare) = bare_attribute(expr) {
                    return Err(TypeError::InvalidArgument {
                        message: format!(
                            "aggregate output \"{name}\" reads \"{bare}\" outside of an aggregate function"
                        ),
                    });
                }
            }
            let outputs = check_projection(aggregates, &env, AGGREGATE_OUTPUT)?;
            let combined: AttributeSet = keys.iter().chain(outputs.iter()).collect();
            ensure_unique(combined.names())?;
            Ok(combined)
        }
        RelationKind::Union { left, right, .. } => check_union(left.check()?, right.check()?),
    }
}

fn ensure_unique(names: Vec<&str>) -> CheckResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(TypeError::DuplicateAttribute {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn check_projection(
    projection: &Projection,
    env: &TypeEnv<'_>,
    at: Placement,
) -> CheckResult<AttributeSet> {
    ensure_unique(projection.names())?;
    projection
        .iter()
        .map(|(name, expr)| Ok((name, infer(expr, env, at)?)))
        .collect()
}

fn check_sort_keys(keys: &[SortKey], env: &TypeEnv<'_>) -> CheckResult<()> {
    for key in keys {
        infer(&key.expr, env, Placement::row("sort keys"))?;
    }
    Ok(())
}

fn expect_boolean(
    expr: &Expr,
    env: &TypeEnv<'_>,
    at: Placement,
    context: &str,
) -> CheckResult<()> {
    let ty = infer(expr, env, at)?;
    if ty.kind == TyKind::Boolean {
        Ok(())
    } else {
        Err(TypeError::ExpectedBoolean {
            context: context.to_string(),
            found: ty,
        })
    }
}

/// First attribute read outside of any aggregate call
fn bare_attribute(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Attr { name, .. } => Some(name),
        Expr::Aggregate { .. } => None,
        other => other.children().into_iter().find_map(bare_attribute),
    }
}

fn check_join(
    kind: JoinKind,
    left: &Relation,
    right: &Relation,
    on: &Expr,
    projection: &Projection,
) -> CheckResult<AttributeSet> {
    let left_attrs = left.check()?;
    let right_attrs = right.check()?;
    expect_boolean(
        on,
        &TypeEnv::Join {
            left: left_attrs,
            right: right_attrs,
        },
        Placement::row("join predicates"),
        "join predicate",
    )?;

    // Attributes of an optional side are missing on unmatched rows.
    let (left_optional, right_optional) = kind.optional_sides();
    let left_view = if left_optional {
        left_attrs.with_nullability(Nullability::Nullable)
    } else {
        left_attrs.clone()
    };
    let right_view = if right_optional {
        right_attrs.with_nullability(Nullability::Nullable)
    } else {
        right_attrs.clone()
    };
    check_projection(
        projection,
        &TypeEnv::Join {
            left: &left_view,
            right: &right_view,
        },
        SELECT,
    )
}

fn check_union(left: &AttributeSet, right: &AttributeSet) -> CheckResult<AttributeSet> {
    let mismatch = || TypeError::UnionMismatch {
        message: format!(
            "both sides must have the same attributes\nleft: {}\nright: {}",
            left, right
        ),
    };
    if left.len() != right.len() {
        return Err(mismatch());
    }
    left.iter()
        .map(|(name, l)| {
            let r = right.get(name).ok_or_else(mismatch)?;
            let kind = l.kind.unify(&r.kind).ok_or_else(|| TypeError::UnionMismatch {
                message: format!(
                    "attribute \"{name}\" is {} on the left and {} on the right",
                    l.kind, r.kind
                ),
            })?;
            Ok((
                name,
                Ty {
                    kind,
                    nullability: l.nullability.combine(r.nullability),
                },
            ))
        })
        .collect()
}

fn ragged(index: usize, expected: &[&str], row: &Row) -> TypeError {
    TypeError::RaggedValues {
        row: index,
        expected: expected.join(", "),
        found: row.names().join(", "),
    }
}

fn same_names(expected: &[&str], row: &Row) -> bool {
    row.len() == expected.len() && expected.iter().all(|n| row.get(n).is_some())
}

fn infer_values(rows: &[Row]) -> CheckResult<AttributeSet> {
    let first = rows.first().ok_or_else(|| TypeError::InvalidArgument {
        message: "values without rows need declared attributes".to_string(),
    })?;
    let names = first.names();
    ensure_unique(names.clone())?;

    let mut attrs = Vec::with_capacity(names.len());
    for name in &names {
        let mut kind: Option<TyKind> = None;
        let mut nullability = Nullability::NotNull;
        for (index, row) in rows.iter().enumerate() {
            if !same_names(&names, row) {
                return Err(ragged(index, &names, row));
            }
            match row.get(name).and_then(Literal::kind) {
                None => nullability = Nullability::Nullable,
                Some(found) => {
                    // no numeric widening: declare the attributes to mix int and float
                    kind = match kind {
                        Some(prev) if prev != found => {
                            return Err(TypeError::HeterogeneousValues {
                                name: name.to_string(),
                                first: prev,
                                second: found,
                            });
                        }
                        _ => Some(found),
                    }
                }
            }
        }
        let kind = kind.ok_or_else(|| TypeError::UntypedNull {
            context: format!(" in attribute \"{name}\""),
        })?;
        attrs.push((*name, Ty { kind, nullability }));
    }
    Ok(attrs.into_iter().collect())
}

fn check_declared_values(rows: &[Row], declared: &AttributeSet) -> CheckResult<AttributeSet> {
    ensure_unique(declared.names())?;
    let names = declared.names();
    for (index, row) in rows.iter().enumerate() {
        if !same_names(&names, row) {
            return Err(ragged(index, &names, row));
        }
        for (name, ty) in declared.iter() {
            match row.get(name) {
                Some(Literal::Null) | None if !ty.is_nullable() => {
                    return Err(TypeError::TypeMismatch {
                        message: format!("row {index} has null for \"{name}\" declared {ty}"),
                    });
                }
                Some(value) => match value.kind() {
                    Some(kind) if kind.unify(&ty.kind) != Some(ty.kind) => {
                        return Err(TypeError::TypeMismatch {
                            message: format!(
                                "row {index} has {kind} for \"{name}\" declared {ty}"
                            ),
                        });
                    }
                    _ => {}
                },
                None => {}
            }
        }
    }
    Ok(declared.clone())
}

#[cfg(test)]
#[path = "relation_test.rs"]
mod tests;
