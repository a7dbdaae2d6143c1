//! Expression type inference
//!
//! Every expression's type is computed structurally; only attribute
//! references need the enclosing relation's attribute set, supplied through a
//! [`TypeEnv`].

use crate::error::{CheckResult, TypeError};
use crate::ir::expr::{AggFunc, BinaryOp, Expr, Func, Side, TemplatePart, UnaryOp, WindowFunc};
use crate::ir::literal::Literal;
use crate::ir::types::{AttributeSet, Nullability, Ty, TyKind};

static NO_ATTRIBUTES: AttributeSet = AttributeSet::empty();

/// Attributes visible to an expression
#[derive(Debug, Clone, Copy)]
pub enum TypeEnv<'a> {
    /// A single input relation
    Single(&'a AttributeSet),
    /// Both inputs of a join
    Join {
        left: &'a AttributeSet,
        right: &'a AttributeSet,
    },
}

impl<'a> TypeEnv<'a> {
    /// Environment without attributes, for constant expressions
    pub fn empty() -> TypeEnv<'static> {
        TypeEnv::Single(&NO_ATTRIBUTES)
    }

    /// Resolve an attribute reference
    pub fn resolve(&self, name: &str, side: Option<Side>) -> CheckResult<Ty> {
        match (self, side) {
            (TypeEnv::Single(attrs), None) => attrs.get(name).ok_or_else(|| no_such(name, attrs)),
            (TypeEnv::Single(_), Some(side)) => Err(TypeError::InvalidArgument {
                message: format!("attribute \"{name}\" refers to the {side} side outside of a join"),
            }),
            (TypeEnv::Join { left, .. }, Some(Side::Left)) => {
                left.get(name).ok_or_else(|| no_such(name, left))
            }
            (TypeEnv::Join { right, .. }, Some(Side::Right)) => {
                right.get(name).ok_or_else(|| no_such(name, right))
            }
            (TypeEnv::Join { left, right }, None) => match (left.get(name), right.get(name)) {
                (Some(_), Some(_)) => Err(TypeError::AmbiguousAttribute {
                    name: name.to_string(),
                }),
                (Some(ty), None) | (None, Some(ty)) => Ok(ty),
                (None, None) => Err(no_such(name, &AttributeSet::merge(left, right))),
            },
        }
    }

    /// Infer the type of an expression, allowing aggregates and windows
    /// anywhere. Used by code generation on already checked relations.
    pub fn infer(&self, expr: &Expr) -> CheckResult<Ty> {
        infer(expr, self, Placement::ANYWHERE)
    }
}

fn no_such(name: &str, available: &AttributeSet) -> TypeError {
    TypeError::NoSuchAttribute {
        name: name.to_string(),
        available: available.clone(),
    }
}

/// Where an expression appears, which decides whether aggregate and window
/// calls are allowed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Placement {
    pub aggregates: bool,
    pub windows: bool,
    pub clause: &'static str,
}

impl Placement {
    pub const ANYWHERE: Placement = Placement {
        aggregates: true,
        windows: true,
        clause: "expressions",
    };

    /// Row-level expressions: neither aggregates nor windows
    pub const fn row(clause: &'static str) -> Placement {
        Placement {
            aggregates: false,
            windows: false,
            clause,
        }
    }
}

pub(crate) fn infer(expr: &Expr, env: &TypeEnv<'_>, at: Placement) -> CheckResult<Ty> {
    match expr {
        Expr::Literal { value, ty } => check_literal(value, *ty),
        Expr::Attr { name, side } => env.resolve(name, *side),
        Expr::Unary { op, operand } => {
            let ty = infer(operand, env, at)?;
            match op {
                UnaryOp::Not => {
                    expect_kind(ty, TyKind::Boolean, "not")?;
                    Ok(ty)
                }
                UnaryOp::Neg => {
                    expect_numeric(ty, "negation")?;
                    Ok(ty)
                }
                UnaryOp::IsNull | UnaryOp::IsNotNull => Ok(Ty::nn(TyKind::Boolean)),
            }
        }
        Expr::Binary { op, left, right } => {
            let l = infer(left, env, at)?;
            let r = infer(right, env, at)?;
            let kind = binary_kind(*op, l.kind, r.kind)?;
            Ok(Ty {
                kind,
                nullability: l.nullability.combine(r.nullability),
            })
        }
        Expr::Function { func, args } => {
            let tys = args
                .iter()
                .map(|a| infer(a, env, at))
                .collect::<CheckResult<Vec<_>>>()?;
            function_ty(*func, &tys)
        }
        Expr::In { operand, list } => {
            let ty = infer(operand, env, at)?;
            if list.is_empty() {
                return Err(TypeError::InvalidArgument {
                    message: "one_of requires at least one candidate".to_string(),
                });
            }
            let mut nullability = ty.nullability;
            for item in list {
                let item_ty = infer(item, env, at)?;
                if !ty.kind.is_comparable_with(&item_ty.kind) {
                    return Err(mismatch("one_of", ty.kind, item_ty.kind));
                }
                nullability = nullability.combine(item_ty.nullability);
            }
            Ok(Ty {
                kind: TyKind::Boolean,
                nullability,
            })
        }
        Expr::Case {
            branches,
            otherwise,
        } => {
            let mut result: Option<Ty> = None;
            for branch in branches {
                let when = infer(&branch.when, env, at)?;
                if when.kind != TyKind::Boolean {
                    return Err(TypeError::ExpectedBoolean {
                        context: "case condition".to_string(),
                        found: when,
                    });
                }
                let then = infer(&branch.then, env, at)?;
                result = Some(unify_ty(result, then, "case")?);
            }
            if let Some(e) = otherwise {
                result = Some(unify_ty(result, infer(e, env, at)?, "case")?);
            }
            let ty = result.ok_or_else(|| TypeError::InvalidArgument {
                message: "case requires at least one branch".to_string(),
            })?;
            Ok(match otherwise {
                Some(_) => ty,
                None => ty.with_nullability(Nullability::Nullable),
            })
        }
        Expr::Cast { operand, kind } => {
            let ty = infer(operand, env, at)?;
            if !castable(ty.kind, *kind) {
                return Err(TypeError::TypeMismatch {
                    message: format!("cannot cast {} to {}", ty.kind, kind),
                });
            }
            Ok(Ty {
                kind: *kind,
                nullability: ty.nullability,
            })
        }
        Expr::Aggregate { func, operand, .. } => {
            if !at.aggregates {
                return Err(TypeError::MisplacedAggregate {
                    clause: at.clause.to_string(),
                });
            }
            let operand_ty = operand
                .as_ref()
                .map(|e| infer(e, env, Placement::row("aggregate arguments")))
                .transpose()?;
            aggregate_ty(*func, operand_ty)
        }
        Expr::Window {
            func,
            operand,
            partition_by,
            order_by,
        } => {
            if !at.windows {
                return Err(TypeError::MisplacedWindow {
                    clause: at.clause.to_string(),
                });
            }
            let inner = Placement::row("window arguments");
            for e in partition_by {
                infer(e, env, inner)?;
            }
            for key in order_by {
                infer(&key.expr, env, inner)?;
            }
            let operand_ty = operand
                .as_ref()
                .map(|e| infer(e, env, inner))
                .transpose()?;
            window_ty(*func, operand_ty)
        }
        Expr::Template { parts } => {
            let mut nullability = Nullability::NotNull;
            for part in parts {
                if let TemplatePart::Expr(e) = part {
                    nullability = nullability.combine(infer(e, env, at)?.nullability);
                }
            }
            Ok(Ty {
                kind: TyKind::String,
                nullability,
            })
        }
        Expr::Impure { inner } => infer(inner, env, at),
    }
}

fn check_literal(value: &Literal, ty: Ty) -> CheckResult<Ty> {
    match value.kind() {
        None if !ty.is_nullable() => Err(TypeError::TypeMismatch {
            message: format!("null literal declared as {ty}"),
        }),
        Some(kind) if kind != ty.kind => Err(TypeError::TypeMismatch {
            message: format!("literal {value} declared as {ty}"),
        }),
        _ => Ok(ty),
    }
}

fn mismatch(op: impl std::fmt::Display, left: TyKind, right: TyKind) -> TypeError {
    TypeError::TypeMismatch {
        message: format!("cannot apply {op} to {left} and {right}"),
    }
}

fn expect_kind(ty: Ty, kind: TyKind, op: &str) -> CheckResult<()> {
    if ty.kind == kind {
        Ok(())
    } else {
        Err(TypeError::TypeMismatch {
            message: format!("{op} expects {kind}, found {}", ty.kind),
        })
    }
}

fn expect_numeric(ty: Ty, op: &str) -> CheckResult<()> {
    if ty.kind.is_numeric() {
        Ok(())
    } else {
        Err(TypeError::TypeMismatch {
            message: format!("{op} expects a numeric value, found {}", ty.kind),
        })
    }
}

fn binary_kind(op: BinaryOp, l: TyKind, r: TyKind) -> CheckResult<TyKind> {
    let kind = match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul if l.is_numeric() && r.is_numeric() => {
            if l == TyKind::Int && r == TyKind::Int {
                TyKind::Int
            } else {
                TyKind::Float
            }
        }
        BinaryOp::Div if l.is_numeric() && r.is_numeric() => TyKind::Float,
        BinaryOp::Mod if l == TyKind::Int && r == TyKind::Int => TyKind::Int,
        op if op.is_comparison() && l.is_comparable_with(&r) => TyKind::Boolean,
        BinaryOp::And | BinaryOp::Or if l == TyKind::Boolean && r == TyKind::Boolean => {
            TyKind::Boolean
        }
        BinaryOp::Concat if l == TyKind::String && r == TyKind::String => TyKind::String,
        BinaryOp::Like if l == TyKind::String && r == TyKind::String => TyKind::Boolean,
        op => return Err(mismatch(op, l, r)),
    };
    Ok(kind)
}

fn expect_arity(func: Func, tys: &[Ty], arity: usize) -> CheckResult<()> {
    if tys.len() == arity {
        Ok(())
    } else {
        Err(TypeError::InvalidArgument {
            message: format!(
                "{} expects {arity} argument(s), got {}",
                func.name(),
                tys.len()
            ),
        })
    }
}

fn unify_ty(acc: Option<Ty>, next: Ty, what: &str) -> CheckResult<Ty> {
    match acc {
        None => Ok(next),
        Some(acc) => {
            let kind = acc
                .kind
                .unify(&next.kind)
                .ok_or_else(|| mismatch(what, acc.kind, next.kind))?;
            Ok(Ty {
                kind,
                nullability: acc.nullability.combine(next.nullability),
            })
        }
    }
}

fn function_ty(func: Func, tys: &[Ty]) -> CheckResult<Ty> {
    match func {
        Func::Abs | Func::Floor | Func::Ceil => {
            expect_arity(func, tys, 1)?;
            expect_numeric(tys[0], func.name())?;
            Ok(tys[0])
        }
        Func::Ln | Func::Log2 | Func::Log10 => {
            expect_arity(func, tys, 1)?;
            expect_numeric(tys[0], func.name())?;
            Ok(Ty {
                kind: TyKind::Float,
                nullability: tys[0].nullability,
            })
        }
        Func::Power => {
            expect_arity(func, tys, 2)?;
            expect_numeric(tys[0], func.name())?;
            expect_numeric(tys[1], func.name())?;
            Ok(Ty {
                kind: TyKind::Float,
                nullability: tys[0].nullability.combine(tys[1].nullability),
            })
        }
        Func::Upper | Func::Lower => {
            expect_arity(func, tys, 1)?;
            expect_kind(tys[0], TyKind::String, func.name())?;
            Ok(tys[0])
        }
        Func::Length => {
            expect_arity(func, tys, 1)?;
            expect_kind(tys[0], TyKind::String, func.name())?;
            Ok(Ty {
                kind: TyKind::Int,
                nullability: tys[0].nullability,
            })
        }
        Func::Coalesce | Func::Greatest | Func::Least => {
            let mut acc: Option<Ty> = None;
            for ty in tys {
                acc = Some(unify_ty(acc, *ty, func.name())?);
            }
            let mut ty = acc.ok_or_else(|| TypeError::InvalidArgument {
                message: format!("{} expects at least one argument", func.name()),
            })?;
            if func == Func::Coalesce {
                ty.nullability = if tys.iter().all(|t| t.is_nullable()) {
                    Nullability::Nullable
                } else {
                    Nullability::NotNull
                };
            }
            Ok(ty)
        }
        Func::Random => {
            expect_arity(func, tys, 0)?;
            Ok(Ty::nn(TyKind::Float))
        }
    }
}

fn aggregate_ty(func: AggFunc, operand: Option<Ty>) -> CheckResult<Ty> {
    if func == AggFunc::Count {
        return Ok(Ty::nn(TyKind::Int));
    }
    let ty = operand.ok_or_else(|| TypeError::InvalidArgument {
        message: format!("{} requires an argument", func.name()),
    })?;
    match func {
        AggFunc::Sum | AggFunc::Median => {
            expect_numeric(ty, func.name())?;
            Ok(ty)
        }
        AggFunc::Avg => {
            expect_numeric(ty, func.name())?;
            Ok(Ty {
                kind: TyKind::Float,
                nullability: ty.nullability,
            })
        }
        AggFunc::Min | AggFunc::Max | AggFunc::Count => Ok(ty),
    }
}

fn window_ty(func: WindowFunc, operand: Option<Ty>) -> CheckResult<Ty> {
    match func {
        WindowFunc::RowNumber | WindowFunc::Rank | WindowFunc::DenseRank => {
            Ok(Ty::nn(TyKind::Int))
        }
        WindowFunc::Lead { offset } | WindowFunc::Lag { offset } => {
            if offset < 0 {
                return Err(TypeError::InvalidArgument {
                    message: format!("lead/lag offset must not be negative, got {offset}"),
                });
            }
            let ty = operand.ok_or_else(|| TypeError::InvalidArgument {
                message: "lead/lag require an argument".to_string(),
            })?;
            Ok(ty.with_nullability(Nullability::Nullable))
        }
        WindowFunc::Aggregate(agg) => aggregate_ty(agg, operand),
    }
}

fn castable(from: TyKind, to: TyKind) -> bool {
    from == to
        || from == TyKind::String
        || to == TyKind::String
        || (from.is_numeric() && to.is_numeric())
        || (from.is_temporal() && to.is_temporal())
        || matches!(
            (from, to),
            (TyKind::Boolean, TyKind::Int) | (TyKind::Int, TyKind::Boolean)
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::*;

    fn env_attrs() -> AttributeSet {
        [
            ("id", Ty::nn(TyKind::Int)),
            ("score", Ty::nullable(TyKind::Float)),
            ("name", Ty::nullable(TyKind::String)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_arithmetic_promotion() {
        let attrs = env_attrs();
        let env = TypeEnv::Single(&attrs);
        assert_eq!(env.infer(&attr("id").add(1)).unwrap(), Ty::nn(TyKind::Int));
        assert_eq!(
            env.infer(&attr("id").add(attr("score"))).unwrap(),
            Ty::nullable(TyKind::Float)
        );
        assert_eq!(env.infer(&attr("id").div(2)).unwrap(), Ty::nn(TyKind::Float));
        assert!(env.infer(&attr("id").add(attr("name"))).is_err());
    }

    #[test]
    fn test_count_is_never_null_and_is_null_is_not_null() {
        let attrs = env_attrs();
        let env = TypeEnv::Single(&attrs);
        assert_eq!(env.infer(&count_of(attr("score"))).unwrap(), Ty::nn(TyKind::Int));
        assert_eq!(
            env.infer(&attr("score").is_null()).unwrap(),
            Ty::nn(TyKind::Boolean)
        );
    }

    #[test]
    fn test_coalesce_nullability() {
        let attrs = env_attrs();
        let env = TypeEnv::Single(&attrs);
        assert_eq!(
            env.infer(&coalesce([attr("score"), Expr::from(0.0)])).unwrap(),
            Ty::nn(TyKind::Float)
        );
        assert_eq!(
            env.infer(&coalesce([attr("score"), null_of(TyKind::Float)]))
                .unwrap(),
            Ty::nullable(TyKind::Float)
        );
    }

    #[test]
    fn test_case_without_else_is_nullable() {
        let attrs = env_attrs();
        let env = TypeEnv::Single(&attrs);
        let e = case_when([(attr("id").gt(1), Expr::from("big"))], None);
        assert_eq!(env.infer(&e).unwrap(), Ty::nullable(TyKind::String));
        let e = case_when(
            [(attr("id").gt(1), Expr::from(1))],
            Some(Expr::from(2.5)),
        );
        assert_eq!(env.infer(&e).unwrap(), Ty::nn(TyKind::Float));
    }

    #[test]
    fn test_join_env_resolution() {
        let left: AttributeSet = [("id", Ty::nn(TyKind::Int))].into_iter().collect();
        let right: AttributeSet = [("id", Ty::nn(TyKind::Int)), ("v", Ty::nn(TyKind::String))]
            .into_iter()
            .collect();
        let env = TypeEnv::Join {
            left: &left,
            right: &right,
        };
        assert!(matches!(
            env.resolve("id", None),
            Err(TypeError::AmbiguousAttribute { .. })
        ));
        assert_eq!(env.resolve("v", None).unwrap(), Ty::nn(TyKind::String));
        assert_eq!(
            env.resolve("id", Some(Side::Left)).unwrap(),
            Ty::nn(TyKind::Int)
        );
        assert!(matches!(
            env.resolve("v", Some(Side::Left)),
            Err(TypeError::NoSuchAttribute { .. })
        ));
    }

    #[test]
    fn test_misplaced_aggregate() {
        let attrs = env_attrs();
        let env = TypeEnv::Single(&attrs);
        let err = infer(&sum(attr("id")), &env, Placement::row("filter predicates")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "MisplacedAggregate - aggregate functions are not allowed in filter predicates"
        );
        let nested = sum(sum(attr("id")));
        assert!(matches!(
            env.infer(&nested),
            Err(TypeError::MisplacedAggregate { .. })
        ));
    }

    #[test]
    fn test_lead_is_nullable() {
        let attrs = env_attrs();
        let env = TypeEnv::Single(&attrs);
        let e = lead(attr("id"), 1).over(vec![], vec![asc(attr("id"))]);
        assert_eq!(env.infer(&e).unwrap(), Ty::nullable(TyKind::Int));
    }

    #[test]
    fn test_template_is_string() {
        let attrs = env_attrs();
        let env = TypeEnv::Single(&attrs);
        let e = f(vec!["id=".into(), attr("id").into()]);
        assert_eq!(env.infer(&e).unwrap(), Ty::nn(TyKind::String));
        let e = f(vec!["name=".into(), attr("name").into()]);
        assert_eq!(env.infer(&e).unwrap(), Ty::nullable(TyKind::String));
    }
}
