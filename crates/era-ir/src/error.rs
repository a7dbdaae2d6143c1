//! Error types for era-ir
//!
//! Type errors display as `Kind - message` so the kind is visible at the
//! start of every failure report.

use crate::ir::relation::NodeId;
use crate::ir::types::{AttributeSet, Ty, TyKind};
use thiserror::Error;

/// Type checker error.
///
/// Cloneable so a memoized failure can be replayed for every consumer of the
/// failing node.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    /// Attribute reference that the input does not provide
    #[error("NoSuchAttribute - \"{name}\" does not exist in\n{available}")]
    NoSuchAttribute {
        name: String,
        available: AttributeSet,
    },

    /// Unqualified attribute present on both sides of a join
    #[error("AmbiguousAttribute - \"{name}\" exists on both sides of the join, use the left or right scope")]
    AmbiguousAttribute { name: String },

    /// Output name produced more than once
    #[error("DuplicateAttribute - \"{name}\" appears more than once in the output")]
    DuplicateAttribute { name: String },

    /// Operator applied to incompatible types
    #[error("TypeMismatch - {message}")]
    TypeMismatch { message: String },

    /// Predicate that is not boolean
    #[error("ExpectedBoolean - {context} must be boolean, found {found}")]
    ExpectedBoolean { context: String, found: Ty },

    /// Union branches with different shapes
    #[error("UnionMismatch - {message}")]
    UnionMismatch { message: String },

    /// Values rows that do not all carry the same attribute names
    #[error("RaggedValues - row {row} has attributes ({found}), expected ({expected})")]
    RaggedValues {
        row: usize,
        expected: String,
        found: String,
    },

    /// Values column mixing kinds
    #[error("HeterogeneousValues - attribute \"{name}\" mixes {first} and {second}")]
    HeterogeneousValues {
        name: String,
        first: TyKind,
        second: TyKind,
    },

    /// Null whose type cannot be inferred
    #[error("UntypedNull - Unable to infer type of value null{context}")]
    UntypedNull { context: String },

    /// Aggregate used where only row-level expressions are allowed
    #[error("MisplacedAggregate - aggregate functions are not allowed in {clause}")]
    MisplacedAggregate { clause: String },

    /// Window used where it is not allowed
    #[error("MisplacedWindow - window functions are not allowed in {clause}")]
    MisplacedWindow { clause: String },

    /// Wrong arity, bad offsets and similar misuse
    #[error("InvalidArgument - {message}")]
    InvalidArgument { message: String },

    /// Failure raised while checking the relation node `node`, an `op`
    #[error("{error}")]
    At {
        node: NodeId,
        op: &'static str,
        error: Box<TypeError>,
    },
}

impl TypeError {
    /// The failure without its node context
    pub fn cause(&self) -> &TypeError {
        match self {
            TypeError::At { error, .. } => error.cause(),
            other => other,
        }
    }

    /// Id and operator name of the relation node that failed to check
    pub fn node(&self) -> Option<(NodeId, &'static str)> {
        match self {
            TypeError::At { node, op, .. } => Some((*node, *op)),
            _ => None,
        }
    }

    /// Attach `node` unless an input node already claimed the failure
    pub(crate) fn at(self, node: NodeId, op: &'static str) -> TypeError {
        match self {
            TypeError::At { .. } => self,
            error => TypeError::At {
                node,
                op,
                error: Box::new(error),
            },
        }
    }
}

/// Local evaluation error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Expression reads attributes, is impure, random, or aggregates
    #[error("CannotEvaluate - {reason}")]
    CannotEvaluate { reason: String },

    #[error("DivisionByZero - division by zero")]
    DivisionByZero,

    #[error("Overflow - integer overflow in {operation}")]
    Overflow { operation: String },

    /// Argument outside a function's domain, or a cast from unparsable text
    #[error("OutOfDomain - {message}")]
    OutOfDomain { message: String },

    /// The expression does not type check
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Result type alias for TypeError
pub type CheckResult<T> = Result<T, TypeError>;

/// Result type alias for EvalError
pub type EvalResult<T> = Result<T, EvalError>;
