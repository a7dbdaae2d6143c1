//! Builder surface for expressions: operator methods on [`Expr`] and free
//! functions for constants, logic, math, aggregates and windows.

use super::expr::{
    AggFunc, BinaryOp, CaseBranch, Direction, Expr, Func, SortKey, TemplatePart, UnaryOp,
    WindowFunc,
};
use super::literal::Literal;
use super::types::{Nullability, Ty, TyKind};
use crate::error::{CheckResult, TypeError};
use chrono::{DateTime, NaiveDate, Utc};

macro_rules! expr_from_literal {
    ($($t:ty => $kind:ident),*) => {
        $(
            impl From<$t> for Expr {
                fn from(value: $t) -> Self {
                    Expr::Literal {
                        value: Literal::from(value),
                        ty: Ty::nn(TyKind::$kind),
                    }
                }
            }
        )*
    };
}

expr_from_literal!(
    bool => Boolean,
    i64 => Int,
    i32 => Int,
    f64 => Float,
    &str => String,
    String => String,
    NaiveDate => Date,
    DateTime<Utc> => Timestamp
);

/// Build a constant, inferring its type from the value.
///
/// Non-null values are `NOT NULL`; a bare null has no type and is rejected.
pub fn constant(value: impl Into<Literal>) -> CheckResult<Expr> {
    let value = value.into();
    match value.kind() {
        Some(kind) => Ok(Expr::Literal {
            value,
            ty: Ty::nn(kind),
        }),
        None => Err(TypeError::UntypedNull {
            context: String::new(),
        }),
    }
}

/// Build a constant with an explicit type.
///
/// Integers may be typed as `float`; `null` requires a nullable type.
pub fn typed_literal(value: impl Into<Literal>, ty: Ty) -> CheckResult<Expr> {
    let value = match (value.into(), ty.kind) {
        (Literal::Int(i), TyKind::Float) => Literal::Float(i as f64),
        (value, _) => value,
    };
    match value.kind() {
        None if ty.nullability == Nullability::NotNull => Err(TypeError::TypeMismatch {
            message: format!("null literal cannot have type {ty}"),
        }),
        Some(kind) if kind != ty.kind => Err(TypeError::TypeMismatch {
            message: format!("literal {value} of kind {kind} cannot have type {ty}"),
        }),
        _ => Ok(Expr::Literal { value, ty }),
    }
}

/// A typed null
pub fn null_of(kind: TyKind) -> Expr {
    Expr::Literal {
        value: Literal::Null,
        ty: Ty::nullable(kind),
    }
}

/// Reference an attribute by name, resolved against whatever relation the
/// expression ends up in.
pub fn attr(name: impl Into<String>) -> Expr {
    Expr::Attr {
        name: name.into(),
        side: None,
    }
}

fn binary(op: BinaryOp, left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left.into()),
        right: Box::new(right.into()),
    }
}

fn unary(op: UnaryOp, operand: impl Into<Expr>) -> Expr {
    Expr::Unary {
        op,
        operand: Box::new(operand.into()),
    }
}

fn function(func: Func, args: Vec<Expr>) -> Expr {
    Expr::Function { func, args }
}

fn aggregate(func: AggFunc, operand: Option<Expr>, distinct: bool) -> Expr {
    Expr::Aggregate {
        func,
        operand: operand.map(Box::new),
        distinct,
    }
}

fn window(func: WindowFunc, operand: Option<Expr>) -> Expr {
    Expr::Window {
        func,
        operand: operand.map(Box::new),
        partition_by: vec![],
        order_by: vec![],
    }
}

#[allow(clippy::should_implement_trait)]
impl Expr {
    pub fn add(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Add, self, other)
    }

    pub fn sub(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Sub, self, other)
    }

    pub fn mul(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Mul, self, other)
    }

    /// Division always produces a float
    pub fn div(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Div, self, other)
    }

    /// Integer remainder
    pub fn modulo(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Mod, self, other)
    }

    pub fn eq(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Eq, self, other)
    }

    pub fn neq(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Neq, self, other)
    }

    pub fn gt(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Gt, self, other)
    }

    pub fn gte(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Gte, self, other)
    }

    pub fn lt(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Lt, self, other)
    }

    pub fn lte(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Lte, self, other)
    }

    pub fn and(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::And, self, other)
    }

    pub fn or(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Or, self, other)
    }

    pub fn not(self) -> Expr {
        unary(UnaryOp::Not, self)
    }

    pub fn neg(self) -> Expr {
        unary(UnaryOp::Neg, self)
    }

    pub fn is_null(self) -> Expr {
        unary(UnaryOp::IsNull, self)
    }

    pub fn is_not_null(self) -> Expr {
        unary(UnaryOp::IsNotNull, self)
    }

    pub fn abs(self) -> Expr {
        function(Func::Abs, vec![self])
    }

    pub fn floor(self) -> Expr {
        function(Func::Floor, vec![self])
    }

    pub fn ceil(self) -> Expr {
        function(Func::Ceil, vec![self])
    }

    pub fn ln(self) -> Expr {
        function(Func::Ln, vec![self])
    }

    pub fn log2(self) -> Expr {
        function(Func::Log2, vec![self])
    }

    pub fn log10(self) -> Expr {
        function(Func::Log10, vec![self])
    }

    /// `self` raised to the power of `exponent`
    pub fn pow(self, exponent: impl Into<Expr>) -> Expr {
        function(Func::Power, vec![self, exponent.into()])
    }

    /// `greatest(least(self, hi), lo)`
    pub fn clamp(self, lo: impl Into<Expr>, hi: impl Into<Expr>) -> Expr {
        let capped = function(Func::Least, vec![self, hi.into()]);
        function(Func::Greatest, vec![capped, lo.into()])
    }

    pub fn upper(self) -> Expr {
        function(Func::Upper, vec![self])
    }

    pub fn lower(self) -> Expr {
        function(Func::Lower, vec![self])
    }

    /// Number of characters
    pub fn length(self) -> Expr {
        function(Func::Length, vec![self])
    }

    pub fn concat(self, other: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Concat, self, other)
    }

    /// SQL `like`, with `%` and `_` wildcards
    pub fn like(self, pattern: impl Into<Expr>) -> Expr {
        binary(BinaryOp::Like, self, pattern)
    }

    pub fn one_of<I, E>(self, list: I) -> Expr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Expr::In {
            operand: Box::new(self),
            list: list.into_iter().map(Into::into).collect(),
        }
    }

    /// `self >= lo and self <= hi`
    pub fn between(self, lo: impl Into<Expr>, hi: impl Into<Expr>) -> Expr {
        self.clone().gte(lo).and(self.lte(hi))
    }

    pub fn cast(self, kind: TyKind) -> Expr {
        Expr::Cast {
            operand: Box::new(self),
            kind,
        }
    }

    /// Prevent local evaluation (and constant folding) of this expression
    pub fn impure(self) -> Expr {
        Expr::Impure {
            inner: Box::new(self),
        }
    }

    pub fn asc(self) -> SortKey {
        asc(self)
    }

    pub fn desc(self) -> SortKey {
        desc(self)
    }

    /// Turn an aggregate or window function into a window over the given
    /// partition and ordering. DISTINCT is not carried into window
    /// aggregates.
    pub fn over(self, partition_by: Vec<Expr>, order_by: Vec<SortKey>) -> Expr {
        match self {
            Expr::Aggregate { func, operand, .. } => Expr::Window {
                func: WindowFunc::Aggregate(func),
                operand,
                partition_by,
                order_by,
            },
            Expr::Window { func, operand, .. } => Expr::Window {
                func,
                operand,
                partition_by,
                order_by,
            },
            other => other,
        }
    }
}

pub fn eq(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    binary(BinaryOp::Eq, left, right)
}

pub fn neq(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    binary(BinaryOp::Neq, left, right)
}

pub fn gt(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    binary(BinaryOp::Gt, left, right)
}

pub fn gte(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    binary(BinaryOp::Gte, left, right)
}

pub fn lt(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    binary(BinaryOp::Lt, left, right)
}

pub fn lte(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    binary(BinaryOp::Lte, left, right)
}

pub fn not(operand: impl Into<Expr>) -> Expr {
    unary(UnaryOp::Not, operand)
}

/// Conjunction of every operand; `true` when empty
pub fn and_all<I, E>(operands: I) -> Expr
where
    I: IntoIterator<Item = E>,
    E: Into<Expr>,
{
    operands
        .into_iter()
        .map(Into::into)
        .reduce(|acc, e| acc.and(e))
        .unwrap_or_else(|| Expr::from(true))
}

/// Disjunction of every operand; `false` when empty
pub fn or_all<I, E>(operands: I) -> Expr
where
    I: IntoIterator<Item = E>,
    E: Into<Expr>,
{
    operands
        .into_iter()
        .map(Into::into)
        .reduce(|acc, e| acc.or(e))
        .unwrap_or_else(|| Expr::from(false))
}

pub fn ln(operand: impl Into<Expr>) -> Expr {
    function(Func::Ln, vec![operand.into()])
}

pub fn log2(operand: impl Into<Expr>) -> Expr {
    function(Func::Log2, vec![operand.into()])
}

pub fn log10(operand: impl Into<Expr>) -> Expr {
    function(Func::Log10, vec![operand.into()])
}

/// Uniform float in `[0, 1)`; never evaluated locally
pub fn random() -> Expr {
    function(Func::Random, vec![])
}

pub fn coalesce<I, E>(args: I) -> Expr
where
    I: IntoIterator<Item = E>,
    E: Into<Expr>,
{
    function(Func::Coalesce, args.into_iter().map(Into::into).collect())
}

pub fn greatest<I, E>(args: I) -> Expr
where
    I: IntoIterator<Item = E>,
    E: Into<Expr>,
{
    function(Func::Greatest, args.into_iter().map(Into::into).collect())
}

pub fn least<I, E>(args: I) -> Expr
where
    I: IntoIterator<Item = E>,
    E: Into<Expr>,
{
    function(Func::Least, args.into_iter().map(Into::into).collect())
}

/// `case when … then … [else …] end`
pub fn case_when<I>(branches: I, otherwise: Option<Expr>) -> Expr
where
    I: IntoIterator<Item = (Expr, Expr)>,
{
    Expr::Case {
        branches: branches
            .into_iter()
            .map(|(when, then)| CaseBranch { when, then })
            .collect(),
        otherwise: otherwise.map(Box::new),
    }
}

/// String template from alternating text segments and expressions.
/// See also the [`f!`](crate::f) macro.
pub fn f(parts: Vec<TemplatePart>) -> Expr {
    Expr::Template { parts }
}

/// Build a string template from text segments and expressions.
///
/// ```
/// use era_ir::{eq, evaluate, f, Literal};
/// let e = f!["Result => ", eq(4, 4)];
/// assert_eq!(evaluate(&e).unwrap(), Literal::String("Result => true".into()));
/// ```
#[macro_export]
macro_rules! f {
    ($($part:expr),* $(,)?) => {
        $crate::ir::builder::f(vec![$($crate::TemplatePart::from($part)),*])
    };
}

pub fn asc(expr: impl Into<Expr>) -> SortKey {
    SortKey {
        expr: expr.into(),
        direction: Direction::Asc,
    }
}

pub fn desc(expr: impl Into<Expr>) -> SortKey {
    SortKey {
        expr: expr.into(),
        direction: Direction::Desc,
    }
}

/// `count(*)`
pub fn count() -> Expr {
    aggregate(AggFunc::Count, None, false)
}

/// `count(operand)`, counting non-null values
pub fn count_of(operand: impl Into<Expr>) -> Expr {
    aggregate(AggFunc::Count, Some(operand.into()), false)
}

pub fn count_distinct(operand: impl Into<Expr>) -> Expr {
    aggregate(AggFunc::Count, Some(operand.into()), true)
}

pub fn sum(operand: impl Into<Expr>) -> Expr {
    aggregate(AggFunc::Sum, Some(operand.into()), false)
}

pub fn avg(operand: impl Into<Expr>) -> Expr {
    aggregate(AggFunc::Avg, Some(operand.into()), false)
}

pub fn min(operand: impl Into<Expr>) -> Expr {
    aggregate(AggFunc::Min, Some(operand.into()), false)
}

pub fn max(operand: impl Into<Expr>) -> Expr {
    aggregate(AggFunc::Max, Some(operand.into()), false)
}

pub fn median(operand: impl Into<Expr>) -> Expr {
    aggregate(AggFunc::Median, Some(operand.into()), false)
}

pub fn row_number() -> Expr {
    window(WindowFunc::RowNumber, None)
}

pub fn rank() -> Expr {
    window(WindowFunc::Rank, None)
}

pub fn dense_rank() -> Expr {
    window(WindowFunc::DenseRank, None)
}

/// Value of `operand` `offset` rows after the current one
pub fn lead(operand: impl Into<Expr>, offset: i64) -> Expr {
    window(WindowFunc::Lead { offset }, Some(operand.into()))
}

/// Value of `operand` `offset` rows before the current one
pub fn lag(operand: impl Into<Expr>, offset: i64) -> Expr {
    window(WindowFunc::Lag { offset }, Some(operand.into()))
}
