//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// ERA - typed relational algebra compiled to warehouse SQL
#[derive(Parser, Debug)]
#[command(name = "era")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a pipeline to SQL
    Compile(CompileArgs),

    /// Type check a pipeline and print its attributes
    Check(PipelineArgs),

    /// Print the maximum number of rows a pipeline can produce
    Bounds(PipelineArgs),

    /// Execute a pipeline on DuckDB and print its rows as JSON lines
    Run(PipelineArgs),
}

/// Arguments for commands that take a single pipeline
#[derive(Args, Debug)]
pub struct PipelineArgs {
    /// Pipeline file (YAML or JSON), relative to the project directory
    pub pipeline: String,
}

/// Arguments for the compile command
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Pipeline file (YAML or JSON), relative to the project directory
    pub pipeline: String,

    /// Override SQL dialect (postgres, bigquery, snowflake, redshift)
    #[arg(short, long)]
    pub dialect: Option<String>,

    /// Parse the generated SQL with the dialect's parser
    #[arg(long)]
    pub validate: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
