//! SQL dialect abstraction
//!
//! A dialect decides quoting, type names, the encoding of literal rows and
//! the spelling of the handful of functions that differ between warehouses.
//! The generator itself is dialect independent.

use era_core::sql_utils::{escape_backslash_string, escape_sql_string, quote_backtick, quote_ident};
use era_core::Dialect as DialectKind;
use era_ir::{TyKind, UnionKind};
use sqlparser::ast::Statement;
use sqlparser::dialect::{
    BigQueryDialect as SqlParserBigQuery, Dialect, PostgreSqlDialect as SqlParserPostgres,
    RedshiftSqlDialect as SqlParserRedshift, SnowflakeDialect as SqlParserSnowflake,
};
use sqlparser::parser::Parser;

use crate::error::{SqlError, SqlResult};

/// How literal rows are embedded in generated SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuesEncoding {
    /// `(values (…), (…)) as vals(arg_0, …)`
    Native,
    /// One bound JSON parameter decoded with `parse_json` + `flatten`
    JsonParameter,
    /// `unnest([struct(… as x), …])`
    StructArray,
}

/// Trait for SQL dialect implementations
pub trait SqlDialect: Send + Sync {
    /// Get the underlying sqlparser dialect
    fn parser_dialect(&self) -> &dyn Dialect;

    /// Which dialect this is
    fn kind(&self) -> DialectKind;

    /// Parse SQL into AST statements
    fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        Parser::parse_sql(self.parser_dialect(), sql).map_err(|e| {
            let msg = e.to_string();
            // sqlparser reports locations as "... at Line: X, Column: Y"
            let (line, column) = parse_location_from_error(&msg);
            SqlError::ParseError {
                message: msg,
                line,
                column,
            }
        })
    }

    /// Get the dialect name
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Quote an identifier for this dialect
    fn quote_ident(&self, ident: &str) -> String {
        quote_ident(ident)
    }

    /// Quote a single-quoted string literal
    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", escape_sql_string(value))
    }

    /// Column type used in casts
    fn type_name(&self, kind: TyKind) -> &'static str;

    fn values_encoding(&self) -> ValuesEncoding {
        ValuesEncoding::Native
    }

    /// Column expression and from-item producing every integer of
    /// `[start, stop)`; `stop > start` is guaranteed by the caller.
    fn series(&self, start: i64, stop: i64) -> SqlResult<(String, String)> {
        Ok((
            self.quote_ident(era_ir::SERIES_ATTRIBUTE),
            format!(
                "generate_series({start}, {}) as {}({})",
                stop - 1,
                self.quote_ident("series"),
                self.quote_ident(era_ir::SERIES_ATTRIBUTE)
            ),
        ))
    }

    fn modulo(&self, left: &str, right: &str) -> String {
        format!("({left} % {right})")
    }

    fn log10(&self, operand: &str) -> String {
        format!("log({operand})")
    }

    fn random(&self) -> &'static str {
        "random()"
    }

    /// Median aggregate; the result keeps the operand kind
    fn median(&self, operand: &str, _kind: TyKind) -> String {
        format!("median({operand})")
    }

    /// Whether median can be used as a window function
    fn supports_windowed_median(&self) -> bool {
        true
    }

    fn union_keyword(&self, kind: UnionKind) -> &'static str {
        match kind {
            UnionKind::All => "union all",
            UnionKind::Distinct => "union",
        }
    }

    /// `offset` is only accepted together with `limit`
    fn requires_limit_with_offset(&self) -> bool {
        false
    }

    /// Whether a statement made of a single native `values` block is
    /// wrapped in parentheses
    fn parenthesize_values_statement(&self) -> bool {
        self.values_encoding() == ValuesEncoding::Native
    }
}

/// Parse line and column from sqlparser error message.
///
/// sqlparser's `ParserError` is a plain string wrapper without structured
/// location data, so "Line: N, Column: M" is extracted from the text.
fn parse_location_from_error(msg: &str) -> (usize, usize) {
    let Some(line_idx) = msg.find("Line: ") else {
        return (0, 0);
    };
    let line_start = line_idx + 6;
    let Some(comma_idx) = msg[line_start..].find(',') else {
        return (0, 0);
    };
    let Ok(line) = msg[line_start..line_start + comma_idx]
        .trim()
        .parse::<usize>()
    else {
        return (0, 0);
    };
    let Some(col_idx) = msg.find("Column: ") else {
        return (0, 0);
    };
    let col_start = col_idx + 8;
    let col_end = msg[col_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| col_start + i)
        .unwrap_or(msg.len());
    let Ok(column) = msg[col_start..col_end].trim().parse::<usize>() else {
        return (0, 0);
    };
    (line, column)
}

/// Build the dialect implementation for a configured dialect
pub fn dialect_for(kind: DialectKind) -> Box<dyn SqlDialect> {
    match kind {
        DialectKind::Postgres => Box::new(PostgresDialect::new()),
        DialectKind::BigQuery => Box::new(BigQueryDialect::new()),
        DialectKind::Snowflake => Box::new(SnowflakeDialect::new()),
        DialectKind::Redshift => Box::new(RedshiftDialect::new()),
    }
}

/// PostgreSQL dialect, also used for the embedded DuckDB executor
#[derive(Debug, Default)]
pub struct PostgresDialect {
    dialect: SqlParserPostgres,
}

impl PostgresDialect {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SqlDialect for PostgresDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn type_name(&self, kind: TyKind) -> &'static str {
        match kind {
            TyKind::Int => "bigint",
            TyKind::Float => "double precision",
            TyKind::String => "text",
            TyKind::Boolean => "boolean",
            TyKind::Timestamp => "timestamptz",
            TyKind::Date => "date",
        }
    }

    /// `percentile_disc` picks an element, so integer medians stay integers
    fn median(&self, operand: &str, kind: TyKind) -> String {
        let func = if kind == TyKind::Float {
            "percentile_cont"
        } else {
            "percentile_disc"
        };
        format!("{func}(0.5) within group (order by {operand})")
    }

    fn supports_windowed_median(&self) -> bool {
        false
    }
}

/// Google BigQuery standard SQL dialect
#[derive(Debug, Default)]
pub struct BigQueryDialect {
    dialect: SqlParserBigQuery,
}

impl BigQueryDialect {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SqlDialect for BigQueryDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn kind(&self) -> DialectKind {
        DialectKind::BigQuery
    }

    fn quote_ident(&self, ident: &str) -> String {
        quote_backtick(ident)
    }

    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", escape_backslash_string(value))
    }

    fn type_name(&self, kind: TyKind) -> &'static str {
        match kind {
            TyKind::Int => "int64",
            TyKind::Float => "float64",
            TyKind::String => "string",
            TyKind::Boolean => "bool",
            TyKind::Timestamp => "timestamp",
            TyKind::Date => "date",
        }
    }

    fn values_encoding(&self) -> ValuesEncoding {
        ValuesEncoding::StructArray
    }

    fn series(&self, start: i64, stop: i64) -> SqlResult<(String, String)> {
        let n = self.quote_ident(era_ir::SERIES_ATTRIBUTE);
        Ok((
            n.clone(),
            format!("unnest(generate_array({start}, {})) as {n}", stop - 1),
        ))
    }

    fn modulo(&self, left: &str, right: &str) -> String {
        format!("mod({left}, {right})")
    }

    fn log10(&self, operand: &str) -> String {
        format!("log10({operand})")
    }

    fn random(&self) -> &'static str {
        "rand()"
    }

    fn median(&self, operand: &str, _kind: TyKind) -> String {
        format!("approx_quantiles({operand}, 2)[offset(1)]")
    }

    fn supports_windowed_median(&self) -> bool {
        false
    }

    fn union_keyword(&self, kind: UnionKind) -> &'static str {
        match kind {
            UnionKind::All => "union all",
            UnionKind::Distinct => "union distinct",
        }
    }

    fn requires_limit_with_offset(&self) -> bool {
        true
    }
}

/// Snowflake dialect
#[derive(Debug, Default)]
pub struct SnowflakeDialect {
    dialect: SqlParserSnowflake,
}

impl SnowflakeDialect {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SqlDialect for SnowflakeDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn kind(&self) -> DialectKind {
        DialectKind::Snowflake
    }

    fn type_name(&self, kind: TyKind) -> &'static str {
        match kind {
            TyKind::Int => "integer",
            TyKind::Float => "float",
            TyKind::String => "string",
            TyKind::Boolean => "boolean",
            TyKind::Timestamp => "timestamp_tz",
            TyKind::Date => "date",
        }
    }

    fn values_encoding(&self) -> ValuesEncoding {
        ValuesEncoding::JsonParameter
    }

    /// `generator` only produces rows; `n` is numbered from `start`
    fn series(&self, start: i64, stop: i64) -> SqlResult<(String, String)> {
        let rows = stop as i128 - start as i128;
        let offset = start as i128 - 1;
        let shift = if offset < 0 {
            format!(" - {}", -offset)
        } else {
            format!(" + {offset}")
        };
        Ok((
            format!("(row_number() over (order by seq4()){shift})"),
            format!("table (generator(rowcount => {rows}))"),
        ))
    }

    fn log10(&self, operand: &str) -> String {
        format!("log(10, {operand})")
    }

    fn random(&self) -> &'static str {
        "uniform(0::float, 1::float, random())"
    }
}

/// Amazon Redshift dialect
#[derive(Debug, Default)]
pub struct RedshiftDialect {
    dialect: SqlParserRedshift,
}

impl RedshiftDialect {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SqlDialect for RedshiftDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn kind(&self) -> DialectKind {
        DialectKind::Redshift
    }

    fn type_name(&self, kind: TyKind) -> &'static str {
        match kind {
            TyKind::Int => "bigint",
            TyKind::Float => "double precision",
            TyKind::String => "varchar",
            TyKind::Boolean => "boolean",
            TyKind::Timestamp => "timestamptz",
            TyKind::Date => "date",
        }
    }

    /// `generate_series` only runs on the leader node
    fn series(&self, _start: i64, _stop: i64) -> SqlResult<(String, String)> {
        Err(SqlError::Unsupported {
            dialect: self.name(),
            feature: "generate_series (leader node only function)".to_string(),
        })
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
