//! Typed builder scopes handed to relation callbacks
//!
//! A [`Scope`] is bound to the checked attribute set of one input relation.
//! Callbacks build [`Projection`]s, join specifications and aggregations from
//! it.

use super::expr::{Expr, Side, SortKey};
use super::types::AttributeSet;
use crate::ordered_map;
use serde::{Deserialize, Serialize};

/// Accessor for the attributes of one relation (or one side of a join)
#[derive(Debug, Clone)]
pub struct Scope {
    attributes: AttributeSet,
    side: Option<Side>,
}

impl Scope {
    pub fn new(attributes: AttributeSet, side: Option<Side>) -> Self {
        Self { attributes, side }
    }

    /// Reference one attribute. Unknown names are reported when the
    /// enclosing relation is checked.
    pub fn attr(&self, name: &str) -> Expr {
        Expr::Attr {
            name: name.to_string(),
            side: self.side,
        }
    }

    /// Every attribute, in order
    pub fn star(&self) -> Projection {
        self.attributes
            .iter()
            .map(|(name, _)| (name.to_string(), self.attr(name)))
            .collect()
    }

    /// The named attributes, in the given order
    pub fn pick(&self, names: &[&str]) -> Projection {
        names
            .iter()
            .map(|name| (name.to_string(), self.attr(name)))
            .collect()
    }

    /// Every attribute except the named ones
    pub fn except(&self, names: &[&str]) -> Projection {
        self.attributes
            .iter()
            .filter(|(name, _)| !names.contains(name))
            .map(|(name, _)| (name.to_string(), self.attr(name)))
            .collect()
    }

    /// Every attribute under a new name
    pub fn rename_with(&self, rename: impl Fn(&str) -> String) -> Projection {
        self.attributes
            .iter()
            .map(|(name, _)| (rename(name), self.attr(name)))
            .collect()
    }

    /// The checked attributes this scope is bound to
    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

/// Ordered name to expression map.
///
/// Inserting an existing name replaces its expression in place, the way an
/// object spread overrides an earlier key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    entries: Vec<(String, Expr)>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or override one output
    pub fn with(mut self, name: impl Into<String>, expr: impl Into<Expr>) -> Self {
        self.insert(name.into(), expr.into());
        self
    }

    /// Add or override every output of `other`, in its order
    pub fn extend(mut self, other: Projection) -> Self {
        for (name, expr) in other.entries {
            self.insert(name, expr);
        }
        self
    }

    fn insert(&mut self, name: String, expr: Expr) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = expr,
            None => self.entries.push((name, expr)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Expr> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expr)> + '_ {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Expr)> for Projection {
    fn from_iter<I: IntoIterator<Item = (String, Expr)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Projection::new(), |acc, (n, e)| acc.with(n, e))
    }
}

impl Serialize for Projection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ordered_map::serialize(&self.entries, serializer)
    }
}

/// Deserialized projections keep repeated keys so the checker can report
/// them as duplicates.
impl<'de> Deserialize<'de> for Projection {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self {
            entries: ordered_map::deserialize(deserializer)?,
        })
    }
}

/// Result of a join callback: the predicate and the output projection
#[derive(Debug, Clone)]
pub struct JoinSpec {
    pub on: Expr,
    pub select: Projection,
}

impl JoinSpec {
    pub fn new(on: Expr, select: Projection) -> Self {
        Self { on, select }
    }
}

/// Result of an aggregate callback: group keys and aggregate outputs
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub group_by: Projection,
    pub aggregates: Projection,
}

impl Aggregation {
    /// Group by the given keys
    pub fn by(group_by: Projection) -> Self {
        Self {
            group_by,
            aggregates: Projection::new(),
        }
    }

    /// Add one aggregate output
    pub fn with(mut self, name: impl Into<String>, expr: impl Into<Expr>) -> Self {
        self.aggregates = self.aggregates.with(name, expr);
        self
    }
}

/// Options of [`Relation::select_with`](super::relation::Relation::select_with).
/// Sort keys resolve against the projected output.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub distinct: bool,
    pub order_by: Vec<SortKey>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectOptions {
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn order_by(mut self, keys: Vec<SortKey>) -> Self {
        self.order_by = keys;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}
