//! Static upper bounds on relation row counts
//!
//! `None` means unbounded. Bounds are conservative: the relation never yields
//! more rows than reported, but may yield fewer.

use crate::ir::relation::{JoinKind, Relation, RelationKind};

/// Upper bound for one node. Inputs go through the memoized
/// [`Relation::max_possible_rows`].
pub(crate) fn max_possible_rows(relation: &Relation) -> Option<u64> {
    match relation.kind() {
        RelationKind::Scan { .. } => None,
        RelationKind::Values { rows, .. } => Some(rows.len() as u64),
        RelationKind::GenerateSeries { start, stop } => {
            let span = (*stop as i128 - *start as i128).max(0);
            u64::try_from(span).ok()
        }
        RelationKind::Select { input, limit, .. } => {
            at_most(input.max_possible_rows(), *limit)
        }
        RelationKind::Filter { input, .. } | RelationKind::OrderBy { input, .. } => {
            input.max_possible_rows()
        }
        RelationKind::Limit { input, limit, .. } | RelationKind::AssertLimit { input, limit } => {
            at_most(input.max_possible_rows(), Some(*limit))
        }
        RelationKind::Aggregate {
            input, group_by, ..
        } => {
            if group_by.is_empty() {
                Some(1)
            } else {
                input.max_possible_rows()
            }
        }
        RelationKind::Union { left, right, .. } => {
            left.max_possible_rows()?.checked_add(right.max_possible_rows()?)
        }
        RelationKind::Join {
            kind, left, right, ..
        } => join_rows(*kind, left.max_possible_rows()?, right.max_possible_rows()?),
    }
}

fn at_most(bound: Option<u64>, limit: Option<u64>) -> Option<u64> {
    match (bound, limit) {
        (Some(b), Some(l)) => Some(b.min(l)),
        (None, l) => l,
        (b, None) => b,
    }
}

/// Outer joins keep unmatched rows, so an empty side does not zero the
/// bound.
fn join_rows(kind: JoinKind, left: u64, right: u64) -> Option<u64> {
    match kind {
        JoinKind::Inner => left.checked_mul(right),
        JoinKind::Left => left.checked_mul(right.max(1)),
        JoinKind::Right => left.max(1).checked_mul(right),
        JoinKind::Full => Some(left.checked_mul(right)?.max(left.checked_add(right)?)),
    }
}
