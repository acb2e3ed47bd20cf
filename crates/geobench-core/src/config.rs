//! Loading the models and queries files, plus runtime settings for a batch.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::domain::{BenchError, ModelConfig, Query, Result};

/// Default directory for experiment snapshots.
pub const DEFAULT_RESULTS_DIR: &str = "data/results";

/// Default per-run deadline in seconds.
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 300;

/// Runtime settings of one orchestrator instance.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    /// Where snapshots are written.
    pub results_dir: PathBuf,
    /// Maximum (model, query) pairs in flight. `1` runs sequentially.
    pub concurrency: usize,
    /// Per-run deadline; `None` waits forever.
    pub run_timeout: Option<Duration>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            concurrency: 1,
            run_timeout: Some(Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelsFile {
    #[serde(default)]
    models: Vec<ModelConfig>,
}

/// Parse a models YAML document (`models: [...]`), keeping disabled entries.
pub fn parse_models(yaml: &str) -> Result<Vec<ModelConfig>> {
    let file: ModelsFile = serde_yaml::from_str(yaml)?;

    let mut names = HashSet::new();
    for model in &file.models {
        if model.name.trim().is_empty() {
            return Err(BenchError::Config("model entry with empty name".to_string()));
        }
        if model.model_identifier.trim().is_empty() {
            return Err(BenchError::Config(format!(
                "model {} has an empty model_id",
                model.name
            )));
        }
        if !model.temperature.is_finite() || model.temperature < 0.0 {
            return Err(BenchError::Config(format!(
                "model {} has invalid temperature {}",
                model.name, model.temperature
            )));
        }
        if model.enabled && !names.insert(model.name.as_str()) {
            // Scores group by name, so these runs will be merged.
            warn!(model = %model.name, "duplicate enabled model name");
        }
    }
    Ok(file.models)
}

/// Parse a queries JSON array (`[{id, query|text}]`).
pub fn parse_queries(json: &str) -> Result<Vec<Query>> {
    let queries: Vec<Query> = serde_json::from_str(json)?;

    let mut ids = HashSet::new();
    for q in &queries {
        if q.id.trim().is_empty() {
            return Err(BenchError::Config("query with empty id".to_string()));
        }
        if !ids.insert(q.id.as_str()) {
            return Err(BenchError::Config(format!("duplicate query id {}", q.id)));
        }
    }
    Ok(queries)
}

/// Read and parse the models file.
pub fn load_models(path: &Path) -> Result<Vec<ModelConfig>> {
    parse_models(&read_config(path)?)
}

/// Read and parse the queries file.
pub fn load_queries(path: &Path) -> Result<Vec<Query>> {
    parse_queries(&read_config(path)?)
}

/// Only the entries that take part in a batch.
pub fn enabled_models(models: &[ModelConfig]) -> Vec<ModelConfig> {
    models.iter().filter(|m| m.enabled).cloned().collect()
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| BenchError::Config(format!("cannot read {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODELS: &str = r#"
models:
  - name: llama3
    model_id: llama3.1:8b
    temperature: 0.1
    max_iterations: 5
    enabled: true
  - name: mistral
    model_id: mistral:7b
  - name: qwen
    model_id: qwen2.5:7b
    enabled: true
"#;

    #[test]
    fn test_parses_models_and_filters_enabled() {
        let models = parse_models(MODELS).unwrap();
        assert_eq!(models.len(), 3);

        let enabled = enabled_models(&models);
        let names: Vec<_> = enabled.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["llama3", "qwen"]);
        assert_eq!(enabled[0].max_iterations, 5);
        assert_eq!(enabled[1].max_iterations, 15);
    }

    #[test]
    fn test_missing_model_id_is_fatal() {
        let err = parse_models("models:\n  - name: broken\n    enabled: true\n").unwrap_err();
        assert!(matches!(err, BenchError::Yaml(_)));
    }

    #[test]
    fn test_empty_models_document_has_no_models() {
        assert!(parse_models("{}").unwrap().is_empty());
    }

    #[test]
    fn test_negative_temperature_is_rejected() {
        let err =
            parse_models("models:\n  - name: a\n    model_id: a:1\n    temperature: -1\n")
                .unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }

    #[test]
    fn test_parses_queries_with_legacy_field() {
        let queries = parse_queries(
            r#"[{"id": "q1", "query": "Rainfall in Pune?"}, {"id": "q2", "text": "Landslide risk?"}]"#,
        )
        .unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].text, "Rainfall in Pune?");
        assert_eq!(queries[1].text, "Landslide risk?");
    }

    #[test]
    fn test_duplicate_query_ids_are_rejected() {
        let err = parse_queries(r#"[{"id": "q1", "text": "a"}, {"id": "q1", "text": "b"}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("duplicate query id q1"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_queries(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }

    #[test]
    fn test_load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.yaml");
        std::fs::write(&path, MODELS).unwrap();
        assert_eq!(load_models(&path).unwrap().len(), 3);
    }
}
