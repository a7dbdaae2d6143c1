//! Run command implementation

use anyhow::{Context, Result};
use era_db::{DuckDbBackend, Executor};
use era_ir::Relation;

use crate::cli::{GlobalArgs, PipelineArgs};
use crate::commands::common::load_pipeline_arg;

/// Execute the run command
pub async fn execute(args: &PipelineArgs, global: &GlobalArgs) -> Result<()> {
    let (project, relation) = load_pipeline_arg(global, &args.pipeline)?;
    let database = project.database();
    let db = DuckDbBackend::from_config(&database)
        .with_context(|| format!("Failed to open database: {}", database.path))?;
    print!("{}", run(&db, &relation).await?);
    Ok(())
}

/// Execute a relation and render each row as one line of JSON
pub(crate) async fn run(db: &dyn Executor, relation: &Relation) -> Result<String> {
    let rows = db
        .execute(relation)
        .await
        .context("Pipeline execution failed")?;
    let mut out = String::new();
    for row in &rows {
        out.push_str(&serde_json::to_string(row)?);
        out.push('\n');
    }
    Ok(out)
}
