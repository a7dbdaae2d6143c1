//! Configuration types and parsing for era.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main project configuration from era.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// SQL dialect used when compiling pipelines
    #[serde(default)]
    pub dialect: Dialect,

    /// Database connection configuration for executing pipelines
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Parse generated SQL back with the dialect's parser before emitting it
    #[serde(default)]
    pub validate_sql: bool,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB database path (file path or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl DatabaseConfig {
    /// Whether the database lives in memory rather than in a file
    pub fn is_in_memory(&self) -> bool {
        self.path == DEFAULT_DB_PATH
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// SQL dialect targeted by a generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL (also understood by the embedded DuckDB executor)
    #[default]
    Postgres,
    /// Google BigQuery standard SQL
    BigQuery,
    /// Snowflake
    Snowflake,
    /// Amazon Redshift
    Redshift,
}

impl Dialect {
    /// Every supported dialect, in declaration order
    pub const ALL: [Dialect; 4] = [
        Dialect::Postgres,
        Dialect::BigQuery,
        Dialect::Snowflake,
        Dialect::Redshift,
    ];

    /// Lowercase dialect name as used in configuration files
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::BigQuery => "bigquery",
            Dialect::Snowflake => "snowflake",
            Dialect::Redshift => "redshift",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Dialect {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "bigquery" | "bq" => Ok(Dialect::BigQuery),
            "snowflake" => Ok(Dialect::Snowflake),
            "redshift" => Ok(Dialect::Redshift),
            _ => Err(CoreError::UnknownDialect {
                name: s.to_string(),
            }),
        }
    }
}

const DEFAULT_DB_PATH: &str = ":memory:";

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        log::debug!(
            "Loaded config '{}' from {} (dialect: {})",
            config.name,
            path.display(),
            config.dialect
        );
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for era.yml or era.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("era.yml");
        let yaml_path = dir.join("era.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty (use ':memory:' for an in-memory database)"
                    .to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
