use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::configs::tasks::{Command, TaskConfig};
use crate::types::{SitepipeError, SitepipeResult};

pub const PIPELINE_CONFIG_DIR: &str = ".sitepipe";
pub const PIPELINE_CONFIG_FILE: &str = "pipeline.yml";

/// Optional per-site overrides for the built-in pipeline
#[derive(Debug, Default, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PipelineConfig {
    /// External command performing each transform step, keyed by step name
    pub steps: Option<BTreeMap<String, Command>>,
    /// Additional command tasks
    pub tasks: Option<Vec<TaskConfig>>,
    pub watch: Option<WatchConfig>,
    pub serve: Option<ServeSettings>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WatchConfig {
    pub debounce_ms: Option<u64>,
    /// Replaces the default bindings when present
    pub bindings: Option<Vec<WatchBindingConfig>>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WatchBindingConfig {
    /// Glob patterns relative to the site root
    pub patterns: Vec<String>,
    pub tasks: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServeSettings {
    pub port: Option<u16>,
    pub inject_file_types: Option<Vec<String>>,
}

pub fn parse_pipeline_config(yaml_str: &str) -> SitepipeResult<PipelineConfig> {
    let config: PipelineConfig = serde_yaml::from_str(yaml_str)?;
    Ok(config)
}

pub fn pipeline_config_path(site_root: &Path) -> PathBuf {
    site_root.join(PIPELINE_CONFIG_DIR).join(PIPELINE_CONFIG_FILE)
}

/// Load the pipeline file if the site has one
pub fn load_pipeline_config(site_root: &Path) -> SitepipeResult<PipelineConfig> {
    let path = pipeline_config_path(site_root);
    if !path.exists() {
        return Ok(PipelineConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| {
        SitepipeError::Config(format!(
            "Failed to read pipeline config {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_pipeline_config(&content).map_err(|e| {
        SitepipeError::Config(format!(
            "Failed to parse pipeline config {}: {}",
            path.display(),
            e
        ))
    })
}

/// JSON schema of the pipeline file, for editor integration
pub fn pipeline_schema() -> SitepipeResult<String> {
    let schema = schemars::schema_for!(PipelineConfig);
    serde_json::to_string_pretty(&schema)
        .map_err(|e| SitepipeError::Config(format!("Failed to render schema: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_pipeline() {
        let yaml = r#"
steps:
  sass: "sass {srcDir}/sass:{dest}"
  js: ["esbuild", "{inputs}", "--outdir={dest}"]
tasks:
  - name: lint
    command: eslint src
    dependencies: [contents]
watch:
  debounceMs: 150
  bindings:
    - patterns: ["src/sass/**/*.scss"]
      tasks: [sass]
serve:
  port: 8080
"#;
        let config = parse_pipeline_config(yaml).unwrap();
        let steps = config.steps.unwrap();
        assert_eq!(steps.len(), 2);
        assert!(matches!(steps.get("js"), Some(Command::Multiple(args)) if args.len() == 3));
        let tasks = config.tasks.unwrap();
        assert_eq!(tasks[0].dependencies.as_deref(), Some(&["contents".to_string()][..]));
        let watch = config.watch.unwrap();
        assert_eq!(watch.debounce_ms, Some(150));
        assert_eq!(watch.bindings.unwrap()[0].tasks, vec!["sass"]);
        assert_eq!(config.serve.unwrap().port, Some(8080));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = load_pipeline_config(temp_dir.path()).unwrap();
        assert!(config.steps.is_none());
        assert!(config.tasks.is_none());
    }

    #[test]
    fn test_invalid_file_is_a_config_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join(PIPELINE_CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(PIPELINE_CONFIG_FILE), "unknownKey: 1\n").unwrap();
        let err = load_pipeline_config(temp_dir.path()).unwrap_err();
        assert!(matches!(err, SitepipeError::Config(_)));
    }

    #[test]
    fn test_schema_mentions_steps() {
        let schema = pipeline_schema().unwrap();
        assert!(schema.contains("\"steps\""));
        assert!(schema.contains("debounceMs"));
    }
}
