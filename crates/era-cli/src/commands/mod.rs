//! CLI command implementations

pub(crate) mod bounds;
pub(crate) mod check;
pub(crate) mod common;
pub(crate) mod compile;
pub(crate) mod run;
