//! Check command implementation

use anyhow::{Context, Result};
use era_ir::Relation;

use crate::cli::{GlobalArgs, PipelineArgs};
use crate::commands::common::load_pipeline_arg;

/// Execute the check command
pub async fn execute(args: &PipelineArgs, global: &GlobalArgs) -> Result<()> {
    let (_, relation) = load_pipeline_arg(global, &args.pipeline)?;
    println!("{}", check(&relation)?);
    Ok(())
}

/// The attribute listing of a well-typed relation
pub(crate) fn check(relation: &Relation) -> Result<String> {
    let attributes = relation
        .check()
        .context("Pipeline failed to type check")?;
    Ok(attributes.to_string())
}
