//! DuckDB executor
//!
//! Relations are compiled with the Postgres generator, which DuckDB
//! understands, and decoded positionally into rows of the relation's checked
//! attributes.

use crate::error::{DbError, DbResult};
use crate::traits::Executor;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::types::{TimeUnit, Value};
use duckdb::Connection;
use era_core::DatabaseConfig;
use era_ir::{AttributeSet, Literal, Relation, Row, TyKind};
use era_sql::{generate, PostgresDialect, SqlError};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
    dialect: PostgresDialect,
}

impl DuckDbBackend {
    fn with_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            dialect: PostgresDialect::new(),
        }
    }

    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::with_connection(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::with_connection(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        Self::from_config(&DatabaseConfig {
            path: path.to_string(),
        })
    }

    pub fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        if config.is_in_memory() {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(&config.path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute batch SQL synchronously
    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Run a compiled query and decode its rows synchronously
    fn query_sync(&self, sql: &str, attrs: &AttributeSet) -> DbResult<Vec<Row>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut decoded = Row::new();
            for (i, (name, ty)) in attrs.iter().enumerate() {
                let value: Value = row.get(i)?;
                decoded.insert(name, decode(value, ty.kind)?);
            }
            out.push(decoded);
        }
        Ok(out)
    }
}

#[async_trait]
impl Executor for DuckDbBackend {
    async fn execute(&self, relation: &Relation) -> DbResult<Vec<Row>> {
        let generated = generate(relation, &self.dialect)?;
        if !generated.params.is_empty() {
            return Err(DbError::NotImplemented {
                backend: self.db_type().to_string(),
                feature: format!("{} bound parameter(s)", generated.params.len()),
            });
        }
        let attrs = relation.check().map_err(SqlError::from)?;
        log::debug!("Executing on {}: {}", self.db_type(), generated.sql);
        let rows = self.query_sync(&generated.sql, attrs)?;
        log::debug!("Fetched {} row(s)", rows.len());
        Ok(rows)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

/// Convert a DuckDB value into a literal of the attribute's kind
fn decode(value: Value, kind: TyKind) -> DbResult<Literal> {
    let int = |i: i64| match kind {
        TyKind::Float => Literal::Float(i as f64),
        _ => Literal::Int(i),
    };
    let float = |x: f64| match kind {
        // integer aggregates such as sum may come back widened
        TyKind::Int if x.fract() == 0.0 && x.abs() < i64::MAX as f64 => Literal::Int(x as i64),
        _ => Literal::Float(x),
    };

    Ok(match value {
        Value::Null => Literal::Null,
        Value::Boolean(b) => Literal::Boolean(b),
        Value::TinyInt(i) => int(i.into()),
        Value::SmallInt(i) => int(i.into()),
        Value::Int(i) => int(i.into()),
        Value::BigInt(i) => int(i),
        Value::UTinyInt(i) => int(i.into()),
        Value::USmallInt(i) => int(i.into()),
        Value::UInt(i) => int(i.into()),
        Value::UBigInt(i) => int(i64::try_from(i).map_err(|_| unreadable(&i, kind))?),
        Value::HugeInt(i) => int(i64::try_from(i).map_err(|_| unreadable(&i, kind))?),
        Value::Float(x) => float(x.into()),
        Value::Double(x) => float(x),
        Value::Decimal(d) => {
            let text = d.to_string();
            float(text.parse::<f64>().map_err(|_| unreadable(&text, kind))?)
        }
        Value::Timestamp(unit, t) => {
            let micros = match unit {
                TimeUnit::Second => t.saturating_mul(1_000_000),
                TimeUnit::Millisecond => t.saturating_mul(1_000),
                TimeUnit::Microsecond => t,
                TimeUnit::Nanosecond => t / 1_000,
            };
            let ts = DateTime::<Utc>::from_timestamp_micros(micros)
                .ok_or_else(|| unreadable(&t, kind))?;
            match kind {
                TyKind::Date => Literal::Date(ts.date_naive()),
                _ => Literal::Timestamp(ts),
            }
        }
        Value::Date32(days) => {
            let date = NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days.into())))
                .ok_or_else(|| unreadable(&days, kind))?;
            match kind {
                TyKind::Timestamp => date
                    .and_hms_opt(0, 0, 0)
                    .map(|midnight| Literal::Timestamp(midnight.and_utc()))
                    .ok_or_else(|| unreadable(&days, kind))?,
                _ => Literal::Date(date),
            }
        }
        Value::Text(s) => match kind {
            TyKind::String => Literal::String(s),
            TyKind::Int => Literal::Int(s.trim().parse().map_err(|_| unreadable(&s, kind))?),
            TyKind::Float => Literal::Float(s.trim().parse().map_err(|_| unreadable(&s, kind))?),
            TyKind::Boolean => {
                Literal::Boolean(s.trim().parse().map_err(|_| unreadable(&s, kind))?)
            }
            TyKind::Timestamp => {
                Literal::Timestamp(parse_timestamp(&s).ok_or_else(|| unreadable(&s, kind))?)
            }
            TyKind::Date => Literal::Date(
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .map_err(|_| unreadable(&s, kind))?,
            ),
        },
        other => return Err(unreadable(&other, kind)),
    })
}

fn unreadable(found: &dyn std::fmt::Debug, kind: TyKind) -> DbError {
    DbError::Internal(format!("cannot read {found:?} as {kind}"))
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|ts| ts.and_utc())
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
