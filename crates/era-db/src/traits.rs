//! Execution trait

use async_trait::async_trait;
use era_ir::{Relation, Row};

use crate::error::DbResult;

/// Runs relations against a database and returns their rows
#[async_trait]
pub trait Executor: Send + Sync {
    /// Compile and run a relation. Rows carry the relation's attributes in
    /// order, with values of the checked kinds.
    async fn execute(&self, relation: &Relation) -> DbResult<Vec<Row>>;

    /// Execute raw SQL statements (setup and fixtures)
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Get the database type name
    fn db_type(&self) -> &'static str;
}
