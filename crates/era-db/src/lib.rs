//! era-db - Execution layer for ERA
//!
//! This crate provides the `Executor` trait and an embedded DuckDB
//! implementation that runs relations compiled by `era-sql`.

pub mod duckdb;
pub mod error;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::Executor;
