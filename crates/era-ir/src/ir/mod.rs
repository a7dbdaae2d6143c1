//! Expression and relation AST

pub mod builder;
pub mod expr;
pub mod literal;
pub mod relation;
pub mod scope;
pub mod types;
