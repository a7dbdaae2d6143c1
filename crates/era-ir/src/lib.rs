//! era-ir: typed relational algebra
//!
//! This crate provides the expression and relation AST, the builder surface
//! used to construct pipelines, a static type checker, the cardinality
//! analyzer and a local evaluator for constant expressions.

pub(crate) mod cardinality;
pub mod check;
pub(crate) mod error;
pub mod eval;
pub mod ir;
pub(crate) mod ordered_map;

pub use check::expr::TypeEnv;
pub use error::{CheckResult, EvalError, EvalResult, TypeError};
pub use eval::evaluate;
pub use ir::builder::*;
pub use ir::expr::{
    AggFunc, BinaryOp, CaseBranch, Direction, Expr, Func, Side, SortKey, TemplatePart, UnaryOp,
    WindowFunc,
};
pub use ir::literal::{Literal, Row};
pub use ir::relation::{JoinKind, NodeId, Relation, RelationKind, UnionKind, SERIES_ATTRIBUTE};
pub use ir::scope::{Aggregation, JoinSpec, Projection, Scope, SelectOptions};
pub use ir::types::{parse_kind, parse_ty, Attribute, AttributeSet, Nullability, Ty, TyKind};
