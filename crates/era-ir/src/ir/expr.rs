//! Expression tree

use super::literal::Literal;
use super::types::{Ty, TyKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which input of a join an attribute reference reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// Logical NOT
    Not,
    /// Arithmetic negation
    Neg,
    IsNull,
    IsNotNull,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    /// String concatenation
    Concat,
    Like,
}

impl BinaryOp {
    /// Check if this is a comparison operator
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Neq
                | BinaryOp::Lt
                | BinaryOp::Lte
                | BinaryOp::Gt
                | BinaryOp::Gte
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Concat => "||",
            BinaryOp::Like => "like",
        };
        write!(f, "{s}")
    }
}

/// Scalar functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Func {
    Abs,
    Floor,
    Ceil,
    Ln,
    Log2,
    Log10,
    Power,
    Upper,
    Lower,
    Length,
    Coalesce,
    Greatest,
    Least,
    Random,
}

impl Func {
    /// Lowercase SQL-ish name, used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Func::Abs => "abs",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Ln => "ln",
            Func::Log2 => "log2",
            Func::Log10 => "log10",
            Func::Power => "power",
            Func::Upper => "upper",
            Func::Lower => "lower",
            Func::Length => "length",
            Func::Coalesce => "coalesce",
            Func::Greatest => "greatest",
            Func::Least => "least",
            Func::Random => "random",
        }
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Median,
}

impl AggFunc {
    pub fn name(&self) -> &'static str {
        match self {
            AggFunc::Count => "count",
            AggFunc::Sum => "sum",
            AggFunc::Avg => "avg",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Median => "median",
        }
    }
}

/// Window functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowFunc {
    RowNumber,
    Rank,
    DenseRank,
    Lead { offset: i64 },
    Lag { offset: i64 },
    /// An aggregate evaluated over a window
    Aggregate(AggFunc),
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// A sort key for ORDER BY
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub expr: Expr,
    #[serde(default)]
    pub direction: Direction,
}

/// One `when … then …` branch of a case expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseBranch {
    pub when: Expr,
    pub then: Expr,
}

/// A segment of a string template: literal text or an interpolated expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplatePart {
    Text(String),
    Expr(Expr),
}

impl From<&str> for TemplatePart {
    fn from(text: &str) -> Self {
        TemplatePart::Text(text.to_string())
    }
}

impl From<String> for TemplatePart {
    fn from(text: String) -> Self {
        TemplatePart::Text(text)
    }
}

impl From<Expr> for TemplatePart {
    fn from(expr: Expr) -> Self {
        TemplatePart::Expr(expr)
    }
}

/// Scalar expression. Every node is immutable; builder methods return new
/// nodes that own their operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum Expr {
    /// A literal with its declared type
    Literal { value: Literal, ty: Ty },

    /// Reference to an attribute of the input relation
    Attr {
        name: String,
        /// Join side, when the reference is made inside a join
        #[serde(default, skip_serializing_if = "Option::is_none")]
        side: Option<Side>,
    },

    Unary { op: UnaryOp, operand: Box<Expr> },

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    Function {
        func: Func,
        #[serde(default)]
        args: Vec<Expr>,
    },

    /// `operand in (list…)`
    In { operand: Box<Expr>, list: Vec<Expr> },

    Case {
        branches: Vec<CaseBranch>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        otherwise: Option<Box<Expr>>,
    },

    Cast { operand: Box<Expr>, kind: TyKind },

    Aggregate {
        func: AggFunc,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operand: Option<Box<Expr>>,
        #[serde(default)]
        distinct: bool,
    },

    Window {
        func: WindowFunc,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operand: Option<Box<Expr>>,
        #[serde(default)]
        partition_by: Vec<Expr>,
        #[serde(default)]
        order_by: Vec<SortKey>,
    },

    /// String template; text segments and expressions in order
    Template { parts: Vec<TemplatePart> },

    /// Marks an expression as not locally evaluable. Compiles to the inner
    /// expression unchanged.
    Impure { inner: Box<Expr> },
}

impl Expr {
    /// Direct children of this node, in evaluation order
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal { .. } | Expr::Attr { .. } => vec![],
            Expr::Unary { operand, .. } | Expr::Cast { operand, .. } => vec![operand],
            Expr::Binary { left, right, .. } => vec![left, right],
            Expr::Function { args, .. } => args.iter().collect(),
            Expr::In { operand, list } => {
                let mut out: Vec<&Expr> = vec![operand];
                out.extend(list.iter());
                out
            }
            Expr::Case {
                branches,
                otherwise,
            } => {
                let mut out = Vec::with_capacity(branches.len() * 2 + 1);
                for b in branches {
                    out.push(&b.when);
                    out.push(&b.then);
                }
                if let Some(e) = otherwise {
                    out.push(e);
                }
                out
            }
            Expr::Aggregate { operand, .. } => operand.iter().map(|e| e.as_ref()).collect(),
            Expr::Window {
                operand,
                partition_by,
                order_by,
                ..
            } => {
                let mut out: Vec<&Expr> = operand.iter().map(|e| e.as_ref()).collect();
                out.extend(partition_by.iter());
                out.extend(order_by.iter().map(|k| &k.expr));
                out
            }
            Expr::Template { parts } => parts
                .iter()
                .filter_map(|p| match p {
                    TemplatePart::Expr(e) => Some(e),
                    TemplatePart::Text(_) => None,
                })
                .collect(),
            Expr::Impure { inner } => vec![inner],
        }
    }

    /// Returns true if any node in the tree satisfies `pred`
    pub fn any(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        pred(self) || self.children().into_iter().any(|c| c.any(pred))
    }

    /// Whether the tree can be evaluated without a relation: no attribute
    /// reference, impure marker, `random`, aggregate or window.
    pub fn is_constant(&self) -> bool {
        !self.any(&|e| {
            matches!(
                e,
                Expr::Attr { .. }
                    | Expr::Impure { .. }
                    | Expr::Aggregate { .. }
                    | Expr::Window { .. }
                    | Expr::Function {
                        func: Func::Random,
                        ..
                    }
            )
        })
    }

    /// The attribute name if this is a bare attribute reference
    pub fn as_attr(&self) -> Option<&str> {
        match self {
            Expr::Attr { name, .. } => Some(name),
            _ => None,
        }
    }
}
