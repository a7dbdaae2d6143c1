//! Bounds command implementation

use anyhow::{Context, Result};
use era_ir::Relation;

use crate::cli::{GlobalArgs, PipelineArgs};
use crate::commands::common::load_pipeline_arg;

/// Execute the bounds command
pub async fn execute(args: &PipelineArgs, global: &GlobalArgs) -> Result<()> {
    let (_, relation) = load_pipeline_arg(global, &args.pipeline)?;
    println!("{}", bounds(&relation)?);
    Ok(())
}

pub(crate) fn bounds(relation: &Relation) -> Result<String> {
    relation
        .check()
        .context("Pipeline failed to type check")?;
    Ok(match relation.max_possible_rows() {
        Some(rows) => rows.to_string(),
        None => "unbounded".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use era_ir::*;

    #[test]
    fn test_bounds() {
        let table = Relation::from_table("s", "t", [("id", Ty::nn(TyKind::Int))]);
        assert_eq!(bounds(&table).unwrap(), "unbounded");
        assert_eq!(bounds(&table.limit(5)).unwrap(), "5");
        assert_eq!(bounds(&Relation::generate_series(3, 1)).unwrap(), "0");
    }
}
