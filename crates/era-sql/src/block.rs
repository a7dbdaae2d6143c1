//! One `select` statement under construction
//!
//! Operators merge into the block produced by their input while the result
//! keeps SQL clause order semantics; otherwise the input is wrapped in a
//! derived table first.

use era_ir::AttributeSet;

use crate::dialect::SqlDialect;

#[derive(Debug, Clone)]
pub(crate) enum FromItem {
    /// A table or CTE name, already quoted
    Table(String),
    /// Anything else, rendered verbatim (aliases included)
    Other(String),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Block {
    pub distinct: bool,
    /// `(output name, sql)` pairs in output order
    pub columns: Vec<(String, String)>,
    pub from: Option<FromItem>,
    pub filters: Vec<String>,
    pub group_by: Vec<String>,
    pub grouped: bool,
    pub having: Vec<String>,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Block {
    /// Every attribute of `from`, unchanged
    pub fn passthrough(dialect: &dyn SqlDialect, attrs: &AttributeSet, from: FromItem) -> Self {
        Block {
            columns: attrs
                .iter()
                .map(|(name, _)| (name.to_string(), dialect.quote_ident(name)))
                .collect(),
            from: Some(from),
            ..Block::default()
        }
    }

    /// Columns are the from-item's own, so input references stay valid
    pub fn is_passthrough(&self, dialect: &dyn SqlDialect) -> bool {
        self.from.is_some()
            && self
                .columns
                .iter()
                .all(|(name, sql)| *sql == dialect.quote_ident(name))
    }

    fn has_clauses(&self) -> bool {
        self.distinct
            || self.grouped
            || !self.filters.is_empty()
            || !self.order_by.is_empty()
            || self.limit.is_some()
            || self.offset.is_some()
    }

    /// A plain table reference that a join can name directly
    pub fn bare_table(&self, dialect: &dyn SqlDialect) -> Option<&str> {
        match &self.from {
            Some(FromItem::Table(table)) if self.is_passthrough(dialect) && !self.has_clauses() => {
                Some(table)
            }
            _ => None,
        }
    }

    /// A `where` clause added here applies before anything else the block
    /// does
    pub fn accepts_filter(&self, dialect: &dyn SqlDialect) -> bool {
        self.is_passthrough(dialect)
            && !self.grouped
            && !self.distinct
            && self.limit.is_none()
            && self.offset.is_none()
    }

    pub fn accepts_projection(&self, dialect: &dyn SqlDialect) -> bool {
        self.accepts_filter(dialect) && self.order_by.is_empty()
    }

    pub fn render(&self, dialect: &dyn SqlDialect) -> String {
        let columns = self
            .columns
            .iter()
            .map(|(name, sql)| format!("{sql} as {}", dialect.quote_ident(name)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "select {}{columns}",
            if self.distinct { "distinct " } else { "" }
        );
        if let Some(from) = &self.from {
            sql.push_str(" from ");
            match from {
                FromItem::Table(t) | FromItem::Other(t) => sql.push_str(t),
            }
        }
        if !self.filters.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&self.filters.join(" and "));
        }
        if !self.group_by.is_empty() {
            sql.push_str(" group by ");
            sql.push_str(&self.group_by.join(", "));
        }
        if !self.having.is_empty() {
            sql.push_str(" having ");
            sql.push_str(&self.having.join(" and "));
        }
        if !self.order_by.is_empty() {
            sql.push_str(" order by ");
            sql.push_str(&self.order_by.join(", "));
        }
        match (self.limit, self.offset) {
            (Some(limit), _) => sql.push_str(&format!(" limit {limit}")),
            (None, Some(_)) if dialect.requires_limit_with_offset() => {
                sql.push_str(&format!(" limit {}", i64::MAX))
            }
            (None, _) => {}
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" offset {offset}"));
        }
        sql
    }
}
