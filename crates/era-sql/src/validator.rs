//! Syntax checks for generated SQL

use crate::dialect::SqlDialect;
use crate::error::{SqlError, SqlResult};
use sqlparser::ast::Statement;

/// Parse SQL with the dialect's grammar and require a single query
pub fn validate_sql(sql: &str, dialect: &dyn SqlDialect) -> SqlResult<()> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(SqlError::EmptySql);
    }
    let statements = dialect.parse(sql)?;
    match statements.as_slice() {
        [Statement::Query(_)] => Ok(()),
        [_] => Err(SqlError::ValidationError(
            "expected a query, found another kind of statement".to_string(),
        )),
        other => Err(SqlError::ValidationError(format!(
            "expected exactly one statement, found {}",
            other.len()
        ))),
    }
}

#[cfg(test)]
#[path = "validator_test.rs"]
mod tests;
