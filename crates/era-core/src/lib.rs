//! era-core - Core library for ERA
//!
//! This crate provides the project configuration (`era.yml`), the SQL
//! dialect selector shared by the generator and the CLI, and identifier and
//! string quoting helpers used by every dialect.

pub mod config;
pub mod error;
pub mod sql_utils;

pub use config::{Config, DatabaseConfig, Dialect};
pub use error::{CoreError, CoreResult};
