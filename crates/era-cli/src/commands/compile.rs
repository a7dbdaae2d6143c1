//! Compile command implementation

use anyhow::{Context, Result};
use era_core::Dialect;
use era_ir::Relation;
use era_sql::{dialect_for, generate, validate_sql, GeneratedSql};

use crate::cli::{CompileArgs, GlobalArgs};
use crate::commands::common::load_pipeline_arg;

/// Execute the compile command
pub async fn execute(args: &CompileArgs, global: &GlobalArgs) -> Result<()> {
    let (project, relation) = load_pipeline_arg(global, &args.pipeline)?;
    let dialect = match &args.dialect {
        Some(name) => name.parse::<Dialect>()?,
        None => project.dialect(),
    };
    let validate = args.validate || project.validate_sql();

    let generated = compile(&relation, dialect, validate)?;
    print!("{}", render(&generated));
    Ok(())
}

/// Generate SQL for one dialect, optionally parsing it back
pub(crate) fn compile(relation: &Relation, dialect: Dialect, validate: bool) -> Result<GeneratedSql> {
    let sql_dialect = dialect_for(dialect);
    let generated = generate(relation, sql_dialect.as_ref())
        .with_context(|| format!("Failed to compile pipeline for {dialect}"))?;
    if validate {
        validate_sql(&generated.sql, sql_dialect.as_ref())
            .with_context(|| format!("Generated SQL is not valid {dialect}"))?;
    }
    Ok(generated)
}

/// The statement, then one comment line per bound parameter
pub(crate) fn render(generated: &GeneratedSql) -> String {
    let mut out = format!("{}\n", generated.sql);
    for (i, param) in generated.params.iter().enumerate() {
        let value = serde_json::to_string(param).unwrap_or_else(|_| param.to_string());
        out.push_str(&format!("-- :{} = {value}\n", i + 1));
    }
    out
}
