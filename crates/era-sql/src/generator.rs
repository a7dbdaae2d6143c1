//! Relation to SQL lowering
//!
//! Every node is lowered bottom-up into a [`Block`]. Sub-relations consumed
//! more than once become common table expressions, emitted in dependency
//! order. Literal rows that a dialect cannot embed directly are passed as
//! bound parameters.

use std::collections::{HashMap, HashSet};

use era_core::Dialect;
use era_ir::{
    AttributeSet, Expr, JoinKind, Literal, NodeId, Projection, Relation, RelationKind, Row,
    SortKey, TyKind, TypeEnv, SERIES_ATTRIBUTE,
};
use serde::Serialize;

use crate::block::{Block, FromItem};
use crate::dialect::{dialect_for, SqlDialect, ValuesEncoding};
use crate::error::{SqlError, SqlResult};
use crate::expr::{literal, ExprWriter, References};

/// Hidden column carrying the total row count of an asserted relation
pub const ROW_COUNT_COLUMN: &str = "__era_row_count";

/// Error text raised by the database when an asserted limit is exceeded
pub fn limit_invariant_message(limit: u64) -> String {
    format!("Invariant *LIMIT IS BELOW {limit}* failed!")
}

/// A statement and its bound parameters, numbered from 1
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedSql {
    pub sql: String,
    pub params: Vec<Literal>,
}

/// Compile a relation for one dialect. The relation is type checked first.
pub fn generate(relation: &Relation, dialect: &dyn SqlDialect) -> SqlResult<GeneratedSql> {
    relation.check()?;

    let mut generator = Generator {
        dialect,
        shared: shared_nodes(relation),
        cte_names: HashMap::new(),
        ctes: Vec::new(),
        params: Vec::new(),
        aliases: 0,
    };
    let block = generator.lower(relation)?;
    let mut sql = block.render(dialect);

    if let RelationKind::Values { rows, .. } = relation.kind() {
        if !rows.is_empty() && dialect.parenthesize_values_statement() {
            sql = format!("({sql})");
        }
    }
    if !generator.ctes.is_empty() {
        let ctes = generator
            .ctes
            .iter()
            .map(|(name, body)| format!("{} as ({body})", dialect.quote_ident(name)))
            .collect::<Vec<_>>()
            .join(", ");
        sql = format!("with {ctes} {sql}");
    }

    log::debug!(
        "Generated {} SQL for {} node {}: {} CTE(s), {} parameter(s)",
        dialect.name(),
        relation.kind().name(),
        relation.id(),
        generator.ctes.len(),
        generator.params.len()
    );
    Ok(GeneratedSql {
        sql,
        params: generator.params,
    })
}

/// Nodes with more than one consumer. Scans are cheap to repeat and are
/// never shared.
fn shared_nodes(root: &Relation) -> HashSet<NodeId> {
    let mut consumers: HashMap<NodeId, usize> = HashMap::new();
    let mut scans = HashSet::new();
    let mut visited = HashSet::new();
    let mut stack = vec![root];
    while let Some(relation) = stack.pop() {
        if !visited.insert(relation.id()) {
            continue;
        }
        if matches!(relation.kind(), RelationKind::Scan { .. }) {
            scans.insert(relation.id());
        }
        for input in relation.inputs() {
            *consumers.entry(input.id()).or_default() += 1;
            stack.push(input);
        }
    }
    consumers
        .into_iter()
        .filter(|(id, count)| *count > 1 && !scans.contains(id))
        .map(|(id, _)| id)
        .collect()
}

struct Generator<'a> {
    dialect: &'a dyn SqlDialect,
    shared: HashSet<NodeId>,
    cte_names: HashMap<NodeId, String>,
    ctes: Vec<(String, String)>,
    params: Vec<Literal>,
    aliases: usize,
}

impl<'a> Generator<'a> {
    fn lower(&mut self, relation: &Relation) -> SqlResult<Block> {
        if let Some(name) = self.cte_names.get(&relation.id()).cloned() {
            return self.cte_reference(relation, &name);
        }
        let block = self.lower_node(relation)?;
        if !self.shared.contains(&relation.id()) {
            return Ok(block);
        }
        let name = format!("cte{}", self.ctes.len() + 1);
        log::debug!(
            "Hoisting shared {} node {} into {}",
            relation.kind().name(),
            relation.id(),
            name
        );
        self.ctes.push((name.clone(), block.render(self.dialect)));
        self.cte_names.insert(relation.id(), name.clone());
        self.cte_reference(relation, &name)
    }

    fn cte_reference(&self, relation: &Relation, name: &str) -> SqlResult<Block> {
        Ok(Block::passthrough(
            self.dialect,
            relation.check()?,
            FromItem::Table(self.dialect.quote_ident(name)),
        ))
    }

    fn unsupported(&self, feature: &str) -> SqlError {
        SqlError::Unsupported {
            dialect: self.dialect.name(),
            feature: feature.to_string(),
        }
    }

    fn lower_node(&mut self, relation: &Relation) -> SqlResult<Block> {
        let d = self.dialect;
        let attrs = relation.check()?;
        if attrs.is_empty() {
            return Err(self.unsupported("relations without attributes"));
        }

        match relation.kind() {
            RelationKind::Scan { schema, table, .. } => Ok(Block::passthrough(
                d,
                attrs,
                FromItem::Table(format!("{}.{}", d.quote_ident(schema), d.quote_ident(table))),
            )),
            RelationKind::Values { rows, .. } => self.values(rows, attrs),
            RelationKind::GenerateSeries { start, stop } => {
                if stop <= start {
                    return Ok(empty(d, attrs));
                }
                let (column, from) = d.series(*start, *stop)?;
                Ok(Block {
                    columns: vec![(SERIES_ATTRIBUTE.to_string(), column)],
                    from: Some(FromItem::Other(from)),
                    ..Block::default()
                })
            }
            RelationKind::Filter { input, predicate } => {
                let input_attrs = input.check()?;
                let block = self.lower(input)?;
                let mut block = self.merge_or_wrap(block, input_attrs, Block::accepts_filter);
                let writer = ExprWriter::new(d, TypeEnv::Single(input_attrs), References::Plain);
                block.filters.push(writer.render(predicate)?);
                Ok(block)
            }
            RelationKind::Select {
                input,
                projection,
                distinct,
                order_by,
                limit,
                offset,
            } => {
                let input_attrs = input.check()?;
                let block = self.lower(input)?;
                let mut block = self.merge_or_wrap(block, input_attrs, Block::accepts_projection);
                let writer = ExprWriter::new(d, TypeEnv::Single(input_attrs), References::Plain);
                block.columns = render_columns(&writer, projection)?;
                block.distinct = *distinct;
                let block = self.order(block, attrs, order_by)?;
                self.page(block, attrs, *limit, *offset)
            }
            RelationKind::OrderBy { input, keys } => {
                let block = self.lower(input)?;
                self.order(block, attrs, keys)
            }
            RelationKind::Limit {
                input,
                limit,
                offset,
            } => {
                let block = self.lower(input)?;
                self.page(block, attrs, Some(*limit), *offset)
            }
            RelationKind::AssertLimit { input, limit } => {
                let block = self.lower(input)?;
                self.assert_limit(block, attrs, *limit)
            }
            RelationKind::Aggregate {
                input,
                group_by,
                aggregates,
            } => {
                let input_attrs = input.check()?;
                let block = self.lower(input)?;
                let mut block = self.merge_or_wrap(block, input_attrs, Block::accepts_projection);
                let writer = ExprWriter::new(d, TypeEnv::Single(input_attrs), References::Plain);
                let mut columns = render_columns(&writer, group_by)?;
                // constants cannot be grouped on: a bare integer is a position
                block.group_by = group_by
                    .iter()
                    .zip(&columns)
                    .filter(|((_, expr), _)| !expr.is_constant())
                    .map(|(_, (_, sql))| sql.clone())
                    .collect();
                if !group_by.is_empty() && block.group_by.is_empty() {
                    // still grouped: empty input yields no groups
                    block.having.push("count(*) > 0".to_string());
                }
                columns.extend(render_columns(&writer, aggregates)?);
                block.columns = columns;
                block.grouped = true;
                Ok(block)
            }
            RelationKind::Union { kind, left, right } => {
                let left_block = self.lower(left)?;
                let mut right_block = self.lower(right)?;
                // union matches columns by position
                let names = attrs.names();
                right_block.columns.sort_by_key(|(name, _)| {
                    names.iter().position(|n| n == name).unwrap_or(usize::MAX)
                });
                let alias = self.alias();
                let from = format!(
                    "(({}) {} ({})) as {}",
                    left_block.render(d),
                    d.union_keyword(*kind),
                    right_block.render(d),
                    d.quote_ident(&alias)
                );
                Ok(Block::passthrough(d, attrs, FromItem::Other(from)))
            }
            RelationKind::Join {
                kind,
                left,
                right,
                on,
                projection,
            } => {
                let left_block = self.lower(left)?;
                let right_block = self.lower(right)?;
                let left_alias = self.alias();
                let right_alias = self.alias();
                let left_attrs = left.check()?;
                let writer = ExprWriter::new(
                    d,
                    TypeEnv::Join {
                        left: left_attrs,
                        right: right.check()?,
                    },
                    References::Join {
                        left_alias: &left_alias,
                        right_alias: &right_alias,
                        left: left_attrs,
                    },
                );
                let keyword = match kind {
                    JoinKind::Inner => "inner join",
                    JoinKind::Left => "left join",
                    JoinKind::Right => "right join",
                    JoinKind::Full => "full outer join",
                };
                let from = format!(
                    "{} {keyword} {} on {}",
                    source(d, &left_block, &left_alias),
                    source(d, &right_block, &right_alias),
                    writer.render(on)?
                );
                Ok(Block {
                    columns: render_columns(&writer, projection)?,
                    from: Some(FromItem::Other(from)),
                    ..Block::default()
                })
            }
        }
    }

    fn alias(&mut self) -> String {
        self.aliases += 1;
        format!("t{}", self.aliases)
    }

    /// Turn a block into a derived table exposing `attrs`
    fn wrap(&mut self, block: Block, attrs: &AttributeSet) -> Block {
        let alias = self.alias();
        log::debug!("Wrapping query block as derived table {alias}");
        let from = format!(
            "({}) as {}",
            block.render(self.dialect),
            self.dialect.quote_ident(&alias)
        );
        Block::passthrough(self.dialect, attrs, FromItem::Other(from))
    }

    fn merge_or_wrap(
        &mut self,
        block: Block,
        attrs: &AttributeSet,
        accepts: fn(&Block, &dyn SqlDialect) -> bool,
    ) -> Block {
        if accepts(&block, self.dialect) {
            block
        } else {
            self.wrap(block, attrs)
        }
    }

    /// Sort keys resolve against `attrs`, the block's output
    fn order(&mut self, block: Block, attrs: &AttributeSet, keys: &[SortKey]) -> SqlResult<Block> {
        let keys: Vec<SortKey> = keys
            .iter()
            .filter(|key| !key.expr.is_constant())
            .cloned()
            .collect();
        if keys.is_empty() {
            return Ok(block);
        }

        let paged = block.limit.is_some() || block.offset.is_some();
        let by_name = keys.iter().all(|key| key.expr.as_attr().is_some());
        let plain = block.is_passthrough(self.dialect) && !block.grouped && !block.distinct;
        let mut block = if paged || !(by_name || plain) {
            self.wrap(block, attrs)
        } else {
            block
        };
        let writer = ExprWriter::new(self.dialect, TypeEnv::Single(attrs), References::Plain);
        block.order_by = writer.sort_keys(&keys)?;
        Ok(block)
    }

    fn page(
        &mut self,
        block: Block,
        attrs: &AttributeSet,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> SqlResult<Block> {
        if limit.into_iter().chain(offset).any(|n| i64::try_from(n).is_err()) {
            return Err(self.unsupported("a limit or offset above the bigint range"));
        }
        if limit.is_none() && offset.is_none() {
            return Ok(block);
        }
        let mut block = if block.limit.is_some() || block.offset.is_some() {
            self.wrap(block, attrs)
        } else {
            block
        };
        block.limit = limit;
        block.offset = offset;
        Ok(block)
    }

    /// Fetch at most one row past the limit, count the rows with a window
    /// and make the database fail on a cast when the count is too high.
    fn assert_limit(&mut self, block: Block, attrs: &AttributeSet, limit: u64) -> SqlResult<Block> {
        let d = self.dialect;
        let fetch = limit
            .checked_add(1)
            .ok_or_else(|| self.unsupported("an asserted limit above the bigint range"))?;
        let block = self.page(block, attrs, Some(fetch), None)?;
        let mut counted = self.wrap(block, attrs);
        counted
            .columns
            .push((ROW_COUNT_COLUMN.to_string(), "count(*) over ()".to_string()));
        let mut checked = self.wrap(counted, attrs);
        checked.filters.push(format!(
            "cast(case when ({} > {limit}) then {} else '0' end as {}) = 0",
            d.quote_ident(ROW_COUNT_COLUMN),
            d.string_literal(&limit_invariant_message(limit)),
            d.type_name(TyKind::Int)
        ));
        Ok(checked)
    }

    fn values(&mut self, rows: &[Row], attrs: &AttributeSet) -> SqlResult<Block> {
        let d = self.dialect;
        if rows.is_empty() {
            return Ok(empty(d, attrs));
        }
        let cell = |row: &Row, name: &str| row.get(name).cloned().unwrap_or(Literal::Null);

        match d.values_encoding() {
            ValuesEncoding::Native => {
                let args: Vec<String> = (0..attrs.len()).map(|i| format!("arg_{i}")).collect();
                let tuples = rows
                    .iter()
                    .map(|row| {
                        let values = attrs
                            .iter()
                            .map(|(name, ty)| literal(d, &cell(row, name), ty.kind))
                            .collect::<SqlResult<Vec<_>>>()?;
                        Ok(format!("({})", values.join(", ")))
                    })
                    .collect::<SqlResult<Vec<_>>>()?;
                Ok(Block {
                    columns: attrs
                        .names()
                        .into_iter()
                        .zip(&args)
                        .map(|(name, arg)| (name.to_string(), arg.clone()))
                        .collect(),
                    from: Some(FromItem::Other(format!(
                        "(values {}) as vals({})",
                        tuples.join(", "),
                        args.join(", ")
                    ))),
                    ..Block::default()
                })
            }
            ValuesEncoding::JsonParameter => {
                let objects = rows
                    .iter()
                    .map(|row| {
                        attrs
                            .iter()
                            .map(|(name, ty)| {
                                Ok((name.to_string(), json_value(d, &cell(row, name), ty.kind)?))
                            })
                            .collect::<SqlResult<serde_json::Map<_, _>>>()
                            .map(serde_json::Value::Object)
                    })
                    .collect::<SqlResult<Vec<_>>>()?;
                self.params
                    .push(Literal::String(serde_json::Value::Array(objects).to_string()));
                let param = self.params.len();
                Ok(Block {
                    columns: attrs
                        .iter()
                        .map(|(name, ty)| {
                            (
                                name.to_string(),
                                format!(
                                    "cast(value[{}] as {})",
                                    d.string_literal(name),
                                    d.type_name(ty.kind)
                                ),
                            )
                        })
                        .collect(),
                    from: Some(FromItem::Other(format!(
                        "table (flatten(input => parse_json((:{param}))))"
                    ))),
                    ..Block::default()
                })
            }
            ValuesEncoding::StructArray => {
                let structs = rows
                    .iter()
                    .map(|row| {
                        let fields = attrs
                            .iter()
                            .map(|(name, ty)| {
                                Ok(format!(
                                    "{} as {}",
                                    literal(d, &cell(row, name), ty.kind)?,
                                    d.quote_ident(name)
                                ))
                            })
                            .collect::<SqlResult<Vec<_>>>()?;
                        Ok(format!("struct({})", fields.join(", ")))
                    })
                    .collect::<SqlResult<Vec<_>>>()?;
                Ok(Block::passthrough(
                    d,
                    attrs,
                    FromItem::Other(format!("unnest([{}])", structs.join(", "))),
                ))
            }
        }
    }
}

fn render_columns(writer: &ExprWriter<'_>, projection: &Projection) -> SqlResult<Vec<(String, String)>> {
    projection
        .iter()
        .map(|(name, expr): (&str, &Expr)| Ok((name.to_string(), writer.render(expr)?)))
        .collect()
}

/// A relation with the given attributes and no rows
fn empty(dialect: &dyn SqlDialect, attrs: &AttributeSet) -> Block {
    Block {
        columns: attrs
            .iter()
            .map(|(name, ty)| {
                (
                    name.to_string(),
                    format!("cast(null as {})", dialect.type_name(ty.kind)),
                )
            })
            .collect(),
        limit: Some(0),
        ..Block::default()
    }
}

/// A join input: plain tables are named directly, anything else is a
/// derived table
fn source(dialect: &dyn SqlDialect, block: &Block, alias: &str) -> String {
    match block.bare_table(dialect) {
        Some(table) => format!("{table} as {}", dialect.quote_ident(alias)),
        None => format!("({}) as {}", block.render(dialect), dialect.quote_ident(alias)),
    }
}

fn json_value(dialect: &dyn SqlDialect, value: &Literal, kind: TyKind) -> SqlResult<serde_json::Value> {
    use serde_json::Value;
    Ok(match value {
        Literal::Null => Value::Null,
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Int(i) if kind == TyKind::Float => float_json(dialect, *i as f64)?,
        Literal::Int(i) => Value::from(*i),
        Literal::Float(x) => float_json(dialect, *x)?,
        Literal::String(s) => Value::String(s.clone()),
        Literal::Timestamp(_) | Literal::Date(_) => Value::String(value.to_string()),
    })
}

fn float_json(dialect: &dyn SqlDialect, x: f64) -> SqlResult<serde_json::Value> {
    serde_json::Number::from_f64(x)
        .map(serde_json::Value::Number)
        .ok_or_else(|| SqlError::Unsupported {
            dialect: dialect.name(),
            feature: format!("non-finite float literal {x}"),
        })
}

/// SQL generation as methods on [`Relation`]
pub trait RelationSql {
    fn sql(&self, dialect: Dialect) -> SqlResult<GeneratedSql>;

    fn postgres_sql(&self) -> SqlResult<GeneratedSql> {
        self.sql(Dialect::Postgres)
    }

    fn bigquery_sql(&self) -> SqlResult<GeneratedSql> {
        self.sql(Dialect::BigQuery)
    }

    fn snowflake_sql(&self) -> SqlResult<GeneratedSql> {
        self.sql(Dialect::Snowflake)
    }

    fn redshift_sql(&self) -> SqlResult<GeneratedSql> {
        self.sql(Dialect::Redshift)
    }
}

impl RelationSql for Relation {
    fn sql(&self, dialect: Dialect) -> SqlResult<GeneratedSql> {
        generate(self, dialect_for(dialect).as_ref())
    }
}

#[cfg(test)]
#[path = "generator_test.rs"]
mod tests;
