//! Relational operators, the nodes of a pipeline DAG
//!
//! A [`Relation`] is a cheap handle to an immutable node. Cloning a handle
//! shares the node, so one sub-relation can feed several consumers. Type
//! check and cardinality results are memoized per node.

use super::expr::{Expr, Side, SortKey};
use super::literal::Row;
use super::scope::{Aggregation, JoinSpec, Projection, Scope, SelectOptions};
use super::types::{AttributeSet, Ty};
use crate::error::CheckResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a relation node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Join type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    /// Sides whose attributes may be missing from an output row
    pub fn optional_sides(&self) -> (bool, bool) {
        match self {
            JoinKind::Inner => (false, false),
            JoinKind::Left => (false, true),
            JoinKind::Right => (true, false),
            JoinKind::Full => (true, true),
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "inner"),
            JoinKind::Left => write!(f, "left"),
            JoinKind::Right => write!(f, "right"),
            JoinKind::Full => write!(f, "full"),
        }
    }
}

/// Set operation variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnionKind {
    All,
    Distinct,
}

/// Relational operator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RelationKind {
    /// Warehouse table with declared attributes
    Scan {
        schema: String,
        table: String,
        attributes: AttributeSet,
    },

    /// Literal rows, with optional declared attributes
    Values {
        rows: Vec<Row>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<AttributeSet>,
    },

    Select {
        input: Relation,
        projection: Projection,
        #[serde(default)]
        distinct: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        order_by: Vec<SortKey>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offset: Option<u64>,
    },

    Filter {
        input: Relation,
        predicate: Expr,
    },

    Join {
        kind: JoinKind,
        left: Relation,
        right: Relation,
        on: Expr,
        projection: Projection,
    },

    OrderBy {
        input: Relation,
        keys: Vec<SortKey>,
    },

    Limit {
        input: Relation,
        limit: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offset: Option<u64>,
    },

    /// Passes rows through but fails at execution time if there are more
    /// than `limit`
    AssertLimit {
        input: Relation,
        limit: u64,
    },

    Aggregate {
        input: Relation,
        #[serde(default)]
        group_by: Projection,
        aggregates: Projection,
    },

    Union {
        kind: UnionKind,
        left: Relation,
        right: Relation,
    },

    /// Integers in `[start, stop)` as attribute `n`
    GenerateSeries {
        start: i64,
        stop: i64,
    },
}

impl RelationKind {
    /// Operator name, used in logs and error context
    pub fn name(&self) -> &'static str {
        match self {
            RelationKind::Scan { .. } => "scan",
            RelationKind::Values { .. } => "values",
            RelationKind::Select { .. } => "select",
            RelationKind::Filter { .. } => "filter",
            RelationKind::Join { .. } => "join",
            RelationKind::OrderBy { .. } => "order_by",
            RelationKind::Limit { .. } => "limit",
            RelationKind::AssertLimit { .. } => "assert_limit",
            RelationKind::Aggregate { .. } => "aggregate",
            RelationKind::Union { .. } => "union",
            RelationKind::GenerateSeries { .. } => "generate_series",
        }
    }
}

#[derive(Debug)]
struct RelationNode {
    id: NodeId,
    kind: RelationKind,
    attributes: OnceLock<CheckResult<AttributeSet>>,
    max_rows: OnceLock<Option<u64>>,
}

/// Shared handle to an immutable relation node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RelationKind", into = "RelationKind")]
pub struct Relation(Arc<RelationNode>);

impl From<RelationKind> for Relation {
    fn from(kind: RelationKind) -> Self {
        Relation::new(kind)
    }
}

impl From<Relation> for RelationKind {
    fn from(relation: Relation) -> Self {
        relation.kind().clone()
    }
}

impl Relation {
    /// Wrap an operator in a fresh node
    pub fn new(kind: RelationKind) -> Self {
        Relation(Arc::new(RelationNode {
            id: NodeId::next(),
            kind,
            attributes: OnceLock::new(),
            max_rows: OnceLock::new(),
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn kind(&self) -> &RelationKind {
        &self.0.kind
    }

    /// Direct inputs, left to right
    pub fn inputs(&self) -> Vec<&Relation> {
        match self.kind() {
            RelationKind::Scan { .. }
            | RelationKind::Values { .. }
            | RelationKind::GenerateSeries { .. } => vec![],
            RelationKind::Select { input, .. }
            | RelationKind::Filter { input, .. }
            | RelationKind::OrderBy { input, .. }
            | RelationKind::Limit { input, .. }
            | RelationKind::AssertLimit { input, .. }
            | RelationKind::Aggregate { input, .. } => vec![input],
            RelationKind::Join { left, right, .. } | RelationKind::Union { left, right, .. } => {
                vec![left, right]
            }
        }
    }

    /// Type check this node (and its inputs), memoized per node
    pub fn check(&self) -> CheckResult<&AttributeSet> {
        self.0
            .attributes
            .get_or_init(|| {
                let result = crate::check::relation::check_relation(self)
                    .map_err(|e| e.at(self.id(), self.kind().name()));
                match &result {
                    Ok(attrs) => log::debug!(
                        "Checked {} node {}: {} attribute(s)",
                        self.kind().name(),
                        self.id(),
                        attrs.len()
                    ),
                    Err(e) => log::debug!(
                        "Check failed for {} node {}: {}",
                        self.kind().name(),
                        self.id(),
                        e
                    ),
                }
                result
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// The ordered output attributes
    pub fn attributes(&self) -> CheckResult<AttributeSet> {
        self.check().cloned()
    }

    /// Upper bound on the number of rows, `None` when unbounded
    pub fn max_possible_rows(&self) -> Option<u64> {
        *self
            .0
            .max_rows
            .get_or_init(|| crate::cardinality::max_possible_rows(self))
    }

    /// Whether two handles point at the same node
    pub fn ptr_eq(&self, other: &Relation) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn scope(&self) -> CheckResult<Scope> {
        Ok(Scope::new(self.check()?.clone(), None))
    }

    fn checked(kind: RelationKind) -> CheckResult<Relation> {
        let relation = Relation::new(kind);
        relation.check()?;
        Ok(relation)
    }

    /// Scan a warehouse table. Attributes are exposed in name order.
    pub fn from_table<I, S>(schema: &str, table: &str, attributes: I) -> Relation
    where
        I: IntoIterator<Item = (S, Ty)>,
        S: Into<String>,
    {
        Relation::new(RelationKind::Scan {
            schema: schema.to_string(),
            table: table.to_string(),
            attributes: attributes
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
        })
    }

    /// Literal rows; attribute types are inferred from the values
    pub fn values(rows: Vec<Row>) -> CheckResult<Relation> {
        Relation::checked(RelationKind::Values {
            rows,
            attributes: None,
        })
    }

    /// Literal rows with declared attribute types
    pub fn values_with_attributes(rows: Vec<Row>, attributes: AttributeSet) -> CheckResult<Relation> {
        Relation::checked(RelationKind::Values {
            rows,
            attributes: Some(attributes),
        })
    }

    /// Integers in `[start, stop)` as a single attribute `n`
    pub fn generate_series(start: i64, stop: i64) -> Relation {
        Relation::new(RelationKind::GenerateSeries { start, stop })
    }

    pub fn select(&self, project: impl FnOnce(&Scope) -> Projection) -> CheckResult<Relation> {
        self.select_with(project, SelectOptions::default())
    }

    /// Select with distinct, ordering and paging applied to the output
    pub fn select_with(
        &self,
        project: impl FnOnce(&Scope) -> Projection,
        options: SelectOptions,
    ) -> CheckResult<Relation> {
        let projection = project(&self.scope()?);
        Relation::checked(RelationKind::Select {
            input: self.clone(),
            projection,
            distinct: options.distinct,
            order_by: options.order_by,
            limit: options.limit,
            offset: options.offset,
        })
    }

    /// Keep rows where the predicate is true
    pub fn filter(&self, predicate: impl FnOnce(&Scope) -> Expr) -> CheckResult<Relation> {
        let predicate = predicate(&self.scope()?);
        Relation::checked(RelationKind::Filter {
            input: self.clone(),
            predicate,
        })
    }

    /// Sort by keys in order. Only guaranteed to hold for the outermost query.
    pub fn order_by(&self, keys: impl FnOnce(&Scope) -> Vec<SortKey>) -> CheckResult<Relation> {
        let keys = keys(&self.scope()?);
        Relation::checked(RelationKind::OrderBy {
            input: self.clone(),
            keys,
        })
    }

    pub fn limit(&self, limit: u64) -> Relation {
        Relation::new(RelationKind::Limit {
            input: self.clone(),
            limit,
            offset: None,
        })
    }

    pub fn limit_offset(&self, limit: u64, offset: u64) -> Relation {
        Relation::new(RelationKind::Limit {
            input: self.clone(),
            limit,
            offset: Some(offset),
        })
    }

    /// Declare that this relation never has more than `limit` rows; checked
    /// when the generated query runs.
    pub fn assert_limit(&self, limit: u64) -> Relation {
        Relation::new(RelationKind::AssertLimit {
            input: self.clone(),
            limit,
        })
    }

    fn join(
        &self,
        kind: JoinKind,
        right: &Relation,
        spec: impl FnOnce(&Scope, &Scope) -> JoinSpec,
    ) -> CheckResult<Relation> {
        let left_scope = Scope::new(self.check()?.clone(), Some(Side::Left));
        let right_scope = Scope::new(right.check()?.clone(), Some(Side::Right));
        let JoinSpec { on, select } = spec(&left_scope, &right_scope);
        Relation::checked(RelationKind::Join {
            kind,
            left: self.clone(),
            right: right.clone(),
            on,
            projection: select,
        })
    }

    pub fn inner_join(
        &self,
        right: &Relation,
        spec: impl FnOnce(&Scope, &Scope) -> JoinSpec,
    ) -> CheckResult<Relation> {
        self.join(JoinKind::Inner, right, spec)
    }

    /// Every attribute read from `right` becomes nullable
    pub fn left_join(
        &self,
        right: &Relation,
        spec: impl FnOnce(&Scope, &Scope) -> JoinSpec,
    ) -> CheckResult<Relation> {
        self.join(JoinKind::Left, right, spec)
    }

    /// Every attribute read from `self` becomes nullable
    pub fn right_join(
        &self,
        right: &Relation,
        spec: impl FnOnce(&Scope, &Scope) -> JoinSpec,
    ) -> CheckResult<Relation> {
        self.join(JoinKind::Right, right, spec)
    }

    /// Every attribute becomes nullable
    pub fn full_join(
        &self,
        right: &Relation,
        spec: impl FnOnce(&Scope, &Scope) -> JoinSpec,
    ) -> CheckResult<Relation> {
        self.join(JoinKind::Full, right, spec)
    }

    /// Group and aggregate. Output is the group keys followed by the
    /// aggregates.
    pub fn aggregate(&self, spec: impl FnOnce(&Scope) -> Aggregation) -> CheckResult<Relation> {
        let Aggregation {
            group_by,
            aggregates,
        } = spec(&self.scope()?);
        Relation::checked(RelationKind::Aggregate {
            input: self.clone(),
            group_by,
            aggregates,
        })
    }

    /// Aggregate over all rows (no group keys); always one row
    pub fn summary(&self, aggregates: impl FnOnce(&Scope) -> Projection) -> CheckResult<Relation> {
        let aggregates = aggregates(&self.scope()?);
        Relation::checked(RelationKind::Aggregate {
            input: self.clone(),
            group_by: Projection::new(),
            aggregates,
        })
    }

    pub fn union_all(&self, other: &Relation) -> CheckResult<Relation> {
        self.union(UnionKind::All, other)
    }

    pub fn union_distinct(&self, other: &Relation) -> CheckResult<Relation> {
        self.union(UnionKind::Distinct, other)
    }

    fn union(&self, kind: UnionKind, other: &Relation) -> CheckResult<Relation> {
        Relation::checked(RelationKind::Union {
            kind,
            left: self.clone(),
            right: other.clone(),
        })
    }

    /// Rename every attribute
    pub fn rename_attributes(&self, rename: impl Fn(&str) -> String) -> CheckResult<Relation> {
        self.select(|t| t.rename_with(rename))
    }
}

/// Name of the single attribute produced by `generate_series`
pub const SERIES_ATTRIBUTE: &str = "n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::TyKind;
    use crate::row;

    #[test]
    fn test_transformations_do_not_mutate_input() {
        let base = Relation::values(vec![row! { "a" => 1, "b" => "x" }]).unwrap();
        let picked = base.select(|t| t.pick(&["a"])).unwrap();
        assert_eq!(base.attributes().unwrap().names(), vec!["a", "b"]);
        assert_eq!(picked.attributes().unwrap().names(), vec!["a"]);
        assert!(!base.ptr_eq(&picked));
    }

    #[test]
    fn test_clone_shares_node() {
        let base = Relation::generate_series(0, 3);
        let copy = base.clone();
        assert!(base.ptr_eq(&copy));
        assert_eq!(base.id(), copy.id());
        assert_ne!(base.id(), Relation::generate_series(0, 3).id());
    }

    #[test]
    fn test_relation_serde_round_trip() {
        let rel = Relation::from_table("public", "orders", [("id", Ty::nn(TyKind::Int))])
            .limit(5);
        let yaml = serde_yaml::to_string(&rel).unwrap();
        let back: Relation = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.attributes().unwrap(), rel.attributes().unwrap());
        assert_eq!(back.max_possible_rows(), Some(5));
        assert!(!back.ptr_eq(&rel));
    }
}
