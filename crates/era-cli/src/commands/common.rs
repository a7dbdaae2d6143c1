//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use era_core::{Config, CoreError, DatabaseConfig, Dialect};
use era_ir::Relation;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

/// Project directory and its configuration, if it has one
#[derive(Debug)]
pub(crate) struct Project {
    pub root: PathBuf,
    pub config: Option<Config>,
}

impl Project {
    pub fn dialect(&self) -> Dialect {
        self.config.as_ref().map(|c| c.dialect).unwrap_or_default()
    }

    pub fn validate_sql(&self) -> bool {
        self.config.as_ref().is_some_and(|c| c.validate_sql)
    }

    pub fn database(&self) -> DatabaseConfig {
        self.config
            .as_ref()
            .map(|c| c.database.clone())
            .unwrap_or_default()
    }

    /// Resolve a pipeline argument against the project directory
    pub fn pipeline_path(&self, pipeline: &str) -> PathBuf {
        self.root.join(pipeline)
    }
}

/// Load the project configuration. An explicit `--config` must exist; a
/// project directory without `era.yml` runs on defaults.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let root = PathBuf::from(&global.project_dir);
    let config = match &global.config {
        Some(path) => {
            Some(Config::load(Path::new(path)).context("Failed to load configuration file")?)
        }
        None => match Config::load_from_dir(&root) {
            Ok(config) => Some(config),
            Err(CoreError::ConfigNotFound { path }) => {
                log::debug!("No project configuration at {path}, using defaults");
                None
            }
            Err(e) => return Err(e).context("Failed to load project configuration"),
        },
    };
    Ok(Project { root, config })
}

/// Read a pipeline file. `.json` files are parsed as JSON, anything else
/// as YAML.
pub(crate) fn load_pipeline(path: &Path) -> Result<Relation> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline: {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let relation: Relation = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid pipeline JSON: {}", path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid pipeline YAML: {}", path.display()))?
    };
    log::debug!(
        "Loaded {} pipeline from {}",
        relation.kind().name(),
        path.display()
    );
    Ok(relation)
}

/// Load the project and the pipeline named on the command line
pub(crate) fn load_pipeline_arg(global: &GlobalArgs, pipeline: &str) -> Result<(Project, Relation)> {
    let project = load_project(global)?;
    let relation = load_pipeline(&project.pipeline_path(pipeline))?;
    Ok((project, relation))
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
