use super::*;
use std::fs;
use tempfile::TempDir;

fn global(dir: &Path) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        project_dir: dir.display().to_string(),
        config: None,
    }
}

const SERIES_YAML: &str = "op: generate_series\nstart: 0\nstop: 3\n";

#[test]
fn test_project_without_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let project = load_project(&global(dir.path())).unwrap();

    assert!(project.config.is_none());
    assert_eq!(project.dialect(), Dialect::Postgres);
    assert!(!project.validate_sql());
    assert_eq!(project.database().path, ":memory:");
}

#[test]
fn test_project_config_is_loaded() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("era.yml"),
        "name: shop\ndialect: snowflake\nvalidate_sql: true\n",
    )
    .unwrap();
    let project = load_project(&global(dir.path())).unwrap();

    assert_eq!(project.dialect(), Dialect::Snowflake);
    assert!(project.validate_sql());
}

#[test]
fn test_invalid_project_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("era.yml"), "name: shop\nunknown: 1\n").unwrap();
    assert!(load_project(&global(dir.path())).is_err());
}

#[test]
fn test_explicit_config_must_exist() {
    let dir = TempDir::new().unwrap();
    let mut args = global(dir.path());
    args.config = Some(dir.path().join("missing.yml").display().to_string());
    let err = load_project(&args).unwrap_err();
    assert!(format!("{err:#}").contains("[E001]"));
}

#[test]
fn test_load_yaml_and_json_pipelines() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("series.yml"), SERIES_YAML).unwrap();
    fs::write(
        dir.path().join("series.json"),
        r#"{"op": "generate_series", "start": 0, "stop": 3}"#,
    )
    .unwrap();

    let (_, yaml) = load_pipeline_arg(&global(dir.path()), "series.yml").unwrap();
    let (_, json) = load_pipeline_arg(&global(dir.path()), "series.json").unwrap();
    assert_eq!(yaml.max_possible_rows(), Some(3));
    assert_eq!(json.max_possible_rows(), Some(3));
}

#[test]
fn test_missing_pipeline_reports_path() {
    let dir = TempDir::new().unwrap();
    let err = load_pipeline(&dir.path().join("nope.yml")).unwrap_err();
    assert!(err.to_string().contains("nope.yml"));
}
