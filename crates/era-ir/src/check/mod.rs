//! Static type checker
//!
//! [`relation`] computes the ordered attribute set of each relation node,
//! bottom-up; [`expr`] infers expression types against a [`TypeEnv`].

pub mod expr;
pub(crate) mod relation;

pub use expr::TypeEnv;
