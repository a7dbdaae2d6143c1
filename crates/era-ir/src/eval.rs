//! Local evaluation of constant expressions
//!
//! Only expressions that need no relation can be evaluated: no attribute
//! reference, impure marker, `random`, aggregate or window. Evaluation follows
//! SQL semantics: nulls propagate, `and`/`or`/`not` use three-valued logic and
//! integer arithmetic fails on overflow instead of wrapping.

use crate::check::expr::TypeEnv;
use crate::error::{EvalError, EvalResult, TypeError};
use crate::ir::expr::{BinaryOp, Expr, Func, TemplatePart, UnaryOp};
use crate::ir::literal::Literal;
use crate::ir::types::TyKind;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::cmp::Ordering;

/// Evaluate a constant expression to a literal.
///
/// The expression is type checked first; the result always has the checked
/// kind (an `int` branch of a `float` case yields a float).
pub fn evaluate(expr: &Expr) -> EvalResult<Literal> {
    if let Some(reason) = blocker(expr) {
        return Err(EvalError::CannotEvaluate { reason });
    }
    let ty = TypeEnv::empty().infer(expr)?;
    let value = eval(expr)?;
    log::trace!("Evaluated constant expression to {value} ({ty})");
    Ok(coerce(value, ty.kind))
}

impl Expr {
    /// See [`evaluate`]
    pub fn evaluate(&self) -> EvalResult<Literal> {
        evaluate(self)
    }
}

/// First reason the expression cannot be evaluated without a relation
fn blocker(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Attr { name, .. } => Some(format!("expression reads attribute \"{name}\"")),
        Expr::Impure { .. } => Some("expression is marked impure".to_string()),
        Expr::Function {
            func: Func::Random, ..
        } => Some("random() has no fixed value".to_string()),
        Expr::Aggregate { func, .. } => Some(format!("{}() aggregates over rows", func.name())),
        Expr::Window { .. } => Some("window functions need a relation".to_string()),
        other => other.children().into_iter().find_map(blocker),
    }
}

fn eval(expr: &Expr) -> EvalResult<Literal> {
    match expr {
        Expr::Literal { value, ty } => Ok(coerce(value.clone(), ty.kind)),
        Expr::Unary { op, operand } => unary(*op, eval(operand)?),
        Expr::Binary { op, left, right } => binary(*op, eval(left)?, eval(right)?),
        Expr::Function { func, args } => {
            let values = args.iter().map(eval).collect::<EvalResult<Vec<_>>>()?;
            let value = function(*func, values)?;
            Ok(coerce(value, kind_of(expr)?))
        }
        Expr::In { operand, list } => {
            let needle = eval(operand)?;
            if needle.is_null() {
                return Ok(Literal::Null);
            }
            let mut saw_null = false;
            for item in list {
                let candidate = eval(item)?;
                if candidate.is_null() {
                    saw_null = true;
                } else if compare(&needle, &candidate)? == Ordering::Equal {
                    return Ok(Literal::Boolean(true));
                }
            }
            Ok(if saw_null {
                Literal::Null
            } else {
                Literal::Boolean(false)
            })
        }
        Expr::Case {
            branches,
            otherwise,
        } => {
            for branch in branches {
                if eval(&branch.when)? == Literal::Boolean(true) {
                    return Ok(coerce(eval(&branch.then)?, kind_of(expr)?));
                }
            }
            match otherwise {
                Some(e) => Ok(coerce(eval(e)?, kind_of(expr)?)),
                None => Ok(Literal::Null),
            }
        }
        Expr::Cast { operand, kind } => cast(eval(operand)?, *kind),
        Expr::Template { parts } => {
            let mut out = String::new();
            for part in parts {
                match part {
                    TemplatePart::Text(text) => out.push_str(text),
                    TemplatePart::Expr(e) => match eval(e)? {
                        Literal::Null => return Ok(Literal::Null),
                        value => out.push_str(&value.to_string()),
                    },
                }
            }
            Ok(Literal::String(out))
        }
        Expr::Attr { .. } | Expr::Aggregate { .. } | Expr::Window { .. } | Expr::Impure { .. } => {
            Err(EvalError::CannotEvaluate {
                reason: "expression needs a relation".to_string(),
            })
        }
    }
}

fn kind_of(expr: &Expr) -> EvalResult<TyKind> {
    Ok(TypeEnv::empty().infer(expr)?.kind)
}

/// Widen integers where a float is expected
fn coerce(value: Literal, kind: TyKind) -> Literal {
    match (value, kind) {
        (Literal::Int(i), TyKind::Float) => Literal::Float(i as f64),
        (value, _) => value,
    }
}

fn unexpected(what: &str, value: &Literal) -> EvalError {
    EvalError::Type(TypeError::TypeMismatch {
        message: format!("{what} cannot take {value}"),
    })
}

fn overflow(operation: &str) -> EvalError {
    EvalError::Overflow {
        operation: operation.to_string(),
    }
}

fn number(value: &Literal) -> EvalResult<f64> {
    match value {
        Literal::Int(i) => Ok(*i as f64),
        Literal::Float(x) => Ok(*x),
        other => Err(unexpected("arithmetic", other)),
    }
}

fn unary(op: UnaryOp, value: Literal) -> EvalResult<Literal> {
    match (op, value) {
        (UnaryOp::IsNull, v) => Ok(Literal::Boolean(v.is_null())),
        (UnaryOp::IsNotNull, v) => Ok(Literal::Boolean(!v.is_null())),
        (_, Literal::Null) => Ok(Literal::Null),
        (UnaryOp::Not, Literal::Boolean(b)) => Ok(Literal::Boolean(!b)),
        (UnaryOp::Neg, Literal::Int(i)) => i
            .checked_neg()
            .map(Literal::Int)
            .ok_or_else(|| overflow("negation")),
        (UnaryOp::Neg, Literal::Float(x)) => Ok(Literal::Float(-x)),
        (_, other) => Err(unexpected("unary operator", &other)),
    }
}

fn binary(op: BinaryOp, left: Literal, right: Literal) -> EvalResult<Literal> {
    match op {
        BinaryOp::And => return Ok(kleene_and(&left, &right)),
        BinaryOp::Or => return Ok(kleene_or(&left, &right)),
        _ => {}
    }
    if left.is_null() || right.is_null() {
        return Ok(Literal::Null);
    }
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, &left, &right)
        }
        BinaryOp::Eq
        | BinaryOp::Neq
        | BinaryOp::Lt
        | BinaryOp::Lte
        | BinaryOp::Gt
        | BinaryOp::Gte => {
            let ord = compare(&left, &right)?;
            Ok(Literal::Boolean(match op {
                BinaryOp::Eq => ord == Ordering::Equal,
                BinaryOp::Neq => ord != Ordering::Equal,
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::Lte => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }))
        }
        BinaryOp::Concat => match (left, right) {
            (Literal::String(a), Literal::String(b)) => Ok(Literal::String(a + &b)),
            (a, _) => Err(unexpected("||", &a)),
        },
        BinaryOp::Like => match (&left, &right) {
            (Literal::String(text), Literal::String(pattern)) => {
                Ok(Literal::Boolean(like(text, pattern)?))
            }
            _ => Err(unexpected("like", &left)),
        },
        BinaryOp::And | BinaryOp::Or => Err(unexpected("logic", &left)),
    }
}

fn kleene_and(left: &Literal, right: &Literal) -> Literal {
    match (left, right) {
        (Literal::Boolean(false), _) | (_, Literal::Boolean(false)) => Literal::Boolean(false),
        (Literal::Boolean(true), Literal::Boolean(true)) => Literal::Boolean(true),
        _ => Literal::Null,
    }
}

fn kleene_or(left: &Literal, right: &Literal) -> Literal {
    match (left, right) {
        (Literal::Boolean(true), _) | (_, Literal::Boolean(true)) => Literal::Boolean(true),
        (Literal::Boolean(false), Literal::Boolean(false)) => Literal::Boolean(false),
        _ => Literal::Null,
    }
}

fn arithmetic(op: BinaryOp, left: &Literal, right: &Literal) -> EvalResult<Literal> {
    match (op, left, right) {
        (BinaryOp::Div, _, _) => {
            let divisor = number(right)?;
            if divisor == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Literal::Float(number(left)? / divisor))
        }
        (BinaryOp::Mod, Literal::Int(a), Literal::Int(b)) => {
            if *b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            a.checked_rem(*b)
                .map(Literal::Int)
                .ok_or_else(|| overflow("modulo"))
        }
        (_, Literal::Int(a), Literal::Int(b)) => {
            let (result, operation) = match op {
                BinaryOp::Add => (a.checked_add(*b), "addition"),
                BinaryOp::Sub => (a.checked_sub(*b), "subtraction"),
                _ => (a.checked_mul(*b), "multiplication"),
            };
            result.map(Literal::Int).ok_or_else(|| overflow(operation))
        }
        (BinaryOp::Mod, _, _) => Err(unexpected("modulo", left)),
        _ => {
            let (a, b) = (number(left)?, number(right)?);
            Ok(Literal::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                _ => a * b,
            }))
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Order two non-null values of comparable kinds
fn compare(left: &Literal, right: &Literal) -> EvalResult<Ordering> {
    let ord = match (left, right) {
        (Literal::Int(a), Literal::Int(b)) => a.cmp(b),
        (Literal::Int(_) | Literal::Float(_), Literal::Int(_) | Literal::Float(_)) => {
            let (a, b) = (number(left)?, number(right)?);
            a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
        }
        (Literal::String(a), Literal::String(b)) => a.cmp(b),
        (Literal::Boolean(a), Literal::Boolean(b)) => a.cmp(b),
        (Literal::Timestamp(a), Literal::Timestamp(b)) => a.cmp(b),
        (Literal::Date(a), Literal::Date(b)) => a.cmp(b),
        (Literal::Date(a), Literal::Timestamp(b)) => midnight(*a).cmp(b),
        (Literal::Timestamp(a), Literal::Date(b)) => a.cmp(&midnight(*b)),
        _ => {
            return Err(EvalError::Type(TypeError::TypeMismatch {
                message: format!("cannot compare {left} and {right}"),
            }))
        }
    };
    Ok(ord)
}

enum LikeToken {
    Any,
    One,
    Char(char),
}

/// SQL `like` with `%` (any run), `_` (any single character) and `\` escaping
/// the character after it
fn like(text: &str, pattern: &str) -> EvalResult<bool> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::Any,
            '_' => LikeToken::One,
            '\\' => LikeToken::Char(chars.next().ok_or_else(|| EvalError::OutOfDomain {
                message: format!("like pattern '{pattern}' ends with an escape character"),
            })?),
            c => LikeToken::Char(c),
        });
    }
    // matched[j]: tokens[..j] match the text consumed so far
    let mut matched = vec![false; tokens.len() + 1];
    matched[0] = true;
    for j in 1..=tokens.len() {
        matched[j] = matched[j - 1] && matches!(tokens[j - 1], LikeToken::Any);
    }
    for c in text.chars() {
        let mut diagonal = matched[0];
        matched[0] = false;
        for j in 1..=tokens.len() {
            let above = matched[j];
            matched[j] = match tokens[j - 1] {
                LikeToken::Any => matched[j - 1] || above,
                LikeToken::One => diagonal,
                LikeToken::Char(p) => diagonal && p == c,
            };
            diagonal = above;
        }
    }
    Ok(matched[tokens.len()])
}

fn log(value: f64, name: &str, f: fn(f64) -> f64) -> EvalResult<Literal> {
    if value <= 0.0 {
        return Err(EvalError::OutOfDomain {
            message: format!("{name} of a non-positive number ({value})"),
        });
    }
    Ok(Literal::Float(f(value)))
}

fn function(func: Func, args: Vec<Literal>) -> EvalResult<Literal> {
    match func {
        Func::Coalesce => Ok(args
            .into_iter()
            .find(|v| !v.is_null())
            .unwrap_or(Literal::Null)),
        Func::Greatest | Func::Least => {
            if args.iter().any(Literal::is_null) {
                return Ok(Literal::Null);
            }
            let wanted = if func == Func::Greatest {
                Ordering::Greater
            } else {
                Ordering::Less
            };
            let mut best: Option<Literal> = None;
            for value in args {
                best = match best {
                    Some(current) if compare(&value, &current)? != wanted => Some(current),
                    _ => Some(value),
                };
            }
            Ok(best.unwrap_or(Literal::Null))
        }
        Func::Random => Err(EvalError::CannotEvaluate {
            reason: "random() has no fixed value".to_string(),
        }),
        _ if args.iter().any(Literal::is_null) => Ok(Literal::Null),
        Func::Abs => match &args[..] {
            [Literal::Int(i)] => i.checked_abs().map(Literal::Int).ok_or_else(|| overflow("abs")),
            [Literal::Float(x)] => Ok(Literal::Float(x.abs())),
            _ => Err(arity(func)),
        },
        Func::Floor | Func::Ceil => match &args[..] {
            [Literal::Int(i)] => Ok(Literal::Int(*i)),
            [Literal::Float(x)] => Ok(Literal::Float(if func == Func::Floor {
                x.floor()
            } else {
                x.ceil()
            })),
            _ => Err(arity(func)),
        },
        Func::Ln | Func::Log2 | Func::Log10 => match &args[..] {
            [value] => {
                let f = match func {
                    Func::Ln => f64::ln,
                    Func::Log2 => f64::log2,
                    _ => f64::log10,
                };
                log(number(value)?, func.name(), f)
            }
            _ => Err(arity(func)),
        },
        Func::Power => match &args[..] {
            [base, exponent] => Ok(Literal::Float(number(base)?.powf(number(exponent)?))),
            _ => Err(arity(func)),
        },
        Func::Upper | Func::Lower | Func::Length => match &args[..] {
            [Literal::String(s)] => Ok(match func {
                Func::Upper => Literal::String(s.to_uppercase()),
                Func::Lower => Literal::String(s.to_lowercase()),
                _ => Literal::Int(s.chars().count() as i64),
            }),
            _ => Err(arity(func)),
        },
    }
}

fn arity(func: Func) -> EvalError {
    EvalError::Type(TypeError::InvalidArgument {
        message: format!("unexpected arguments for {}", func.name()),
    })
}

fn invalid_text(text: &str, kind: TyKind) -> EvalError {
    EvalError::OutOfDomain {
        message: format!("invalid input for cast to {kind}: \"{text}\""),
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
        .or_else(|| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().map(midnight))
}

fn cast(value: Literal, kind: TyKind) -> EvalResult<Literal> {
    let cast_value = match (value, kind) {
        (Literal::Null, _) => Literal::Null,
        (value, _) if value.kind() == Some(kind) => value,
        (value, TyKind::String) => Literal::String(value.to_string()),
        (Literal::String(text), _) => {
            let trimmed = text.trim();
            match kind {
                TyKind::Int => trimmed.parse().map(Literal::Int).ok(),
                TyKind::Float => trimmed.parse().map(Literal::Float).ok(),
                TyKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                    "true" | "t" | "yes" | "y" | "1" => Some(Literal::Boolean(true)),
                    "false" | "f" | "no" | "n" | "0" => Some(Literal::Boolean(false)),
                    _ => None,
                },
                TyKind::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .ok()
                    .map(Literal::Date),
                TyKind::Timestamp => parse_timestamp(trimmed).map(Literal::Timestamp),
                TyKind::String => Some(Literal::String(text.clone())),
            }
            .ok_or_else(|| invalid_text(&text, kind))?
        }
        (Literal::Int(i), TyKind::Float) => Literal::Float(i as f64),
        (Literal::Float(x), TyKind::Int) => {
            let rounded = x.round();
            // i64::MAX as f64 rounds up to 2^63, which is out of range
            if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
                return Err(overflow("cast to int"));
            }
            Literal::Int(rounded as i64)
        }
        (Literal::Boolean(b), TyKind::Int) => Literal::Int(i64::from(b)),
        (Literal::Int(i), TyKind::Boolean) => Literal::Boolean(i != 0),
        (Literal::Date(d), TyKind::Timestamp) => Literal::Timestamp(midnight(d)),
        (Literal::Timestamp(ts), TyKind::Date) => Literal::Date(ts.date_naive()),
        (value, kind) => {
            return Err(EvalError::Type(TypeError::TypeMismatch {
                message: format!("cannot cast {value} to {kind}"),
            }))
        }
    };
    Ok(cast_value)
}

#[cfg(test)]
#[path = "eval_test.rs"]
mod tests;
