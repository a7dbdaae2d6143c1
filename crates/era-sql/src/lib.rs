//! era-sql - SQL generation for era relations
//!
//! This crate lowers checked relation DAGs to a single SQL statement per
//! dialect (Postgres, BigQuery, Snowflake and Redshift) and validates
//! generated SQL with sqlparser.

pub(crate) mod block;
pub mod dialect;
pub mod error;
pub(crate) mod expr;
pub mod generator;
pub mod validator;

pub use dialect::{
    dialect_for, BigQueryDialect, PostgresDialect, RedshiftDialect, SnowflakeDialect, SqlDialect,
    ValuesEncoding,
};
pub use error::{SqlError, SqlResult};
pub use generator::{generate, limit_invariant_message, GeneratedSql, RelationSql, ROW_COUNT_COLUMN};
pub use validator::validate_sql;
