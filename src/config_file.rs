use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::errors::GateError;
use crate::types::ModelId;

fn read(path: &Path) -> Result<String, GateError> {
    fs::read_to_string(path).map_err(|source| GateError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })
}

/// Agent under test, as declared in `agent.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    pub model: ModelId,
    pub system_message: String,
}

impl AgentDefinition {
    pub fn load(path: &Path) -> Result<Self, GateError> {
        let content = read(path)?;
        serde_yaml::from_str(&content).map_err(|source| GateError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Instructions registered with the service (the system message, trimmed).
    pub fn instructions(&self) -> &str {
        self.system_message.trim()
    }

    /// Replace the agent name, e.g. with a CI-only name so the production agent is untouched.
    pub fn with_name_override(mut self, name: Option<&str>) -> Self {
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            self.name = name.to_string();
        }
        self
    }
}

fn default_safety_evaluators() -> BTreeSet<String> {
    BTreeSet::from(["violence_detection".to_string()])
}

/// Pass-rate policy inputs, as declared in `eval_thresholds.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_safety_evaluators")]
    pub safety_evaluators: BTreeSet<String>,

    #[serde(default)]
    pub pass_rate_thresholds: BTreeMap<String, f64>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            safety_evaluators: default_safety_evaluators(),
            pass_rate_thresholds: BTreeMap::new(),
        }
    }
}

impl ThresholdConfig {
    pub fn load(path: &Path) -> Result<Self, GateError> {
        let content = read(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|source| GateError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GateError> {
        for (name, &value) in &self.pass_rate_thresholds {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(GateError::InvalidThreshold {
                    name: name.clone(),
                    value,
                });
            }
        }
        Ok(())
    }

    pub fn is_safety(&self, name: &str) -> bool {
        self.safety_evaluators.contains(name)
    }

    pub fn threshold(&self, name: &str) -> Option<f64> {
        self.pass_rate_thresholds.get(name).copied()
    }
}

/// The `query` column: either a plain prompt or a list of chat messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Query {
    Text(String),
    Messages(Vec<Value>),
}

/// One line of `test_data.jsonl`. Unknown columns are kept and forwarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRow {
    pub user_input: String,
    pub query: Query,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub fn load_test_rows(path: &Path) -> Result<Vec<TestRow>, GateError> {
    let content = read(path)?;
    parse_test_rows(path, &content)
}

fn parse_test_rows(path: &Path, content: &str) -> Result<Vec<TestRow>, GateError> {
    let mut rows = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row: TestRow = serde_json::from_str(line).map_err(|e| GateError::TestData {
            path: path.to_path_buf(),
            line: idx + 1,
            reason: e.to_string(),
        })?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn agent_definition_loads_from_yaml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("agent.yaml");
        std::fs::write(
            &path,
            concat!(
                "name: azure-dev-assistant\n",
                "model: gpt-4o-mini\n",
                "system_message: |\n",
                "  You help with Azure.\n",
            ),
        )
        .unwrap();

        let agent = AgentDefinition::load(&path).unwrap();
        assert_eq!(agent.name, "azure-dev-assistant");
        assert_eq!(agent.model.as_str(), "gpt-4o-mini");
        assert_eq!(agent.instructions(), "You help with Azure.");
    }

    #[test]
    fn agent_definition_missing_field_is_yaml_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("agent.yaml");
        std::fs::write(&path, "name: only-a-name\n").unwrap();

        let err = AgentDefinition::load(&path).unwrap_err();
        assert!(matches!(err, GateError::Yaml { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn name_override_ignores_blank_values() {
        let agent = AgentDefinition {
            name: "prod-agent".to_string(),
            model: ModelId::new("gpt-4o"),
            system_message: String::new(),
        };
        assert_eq!(agent.clone().with_name_override(Some("  ")).name, "prod-agent");
        assert_eq!(agent.clone().with_name_override(None).name, "prod-agent");
        assert_eq!(agent.with_name_override(Some("ci-agent")).name, "ci-agent");
    }

    #[test]
    fn thresholds_default_safety_set_when_absent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("eval_thresholds.json");
        std::fs::write(&path, r#"{ "pass_rate_thresholds": { "coherence": 0.8 } }"#).unwrap();

        let config = ThresholdConfig::load(&path).unwrap();
        assert!(config.is_safety("violence_detection"));
        assert_eq!(config.threshold("coherence"), Some(0.8));
        assert_eq!(config.threshold("task_adherence"), None);
    }

    #[test]
    fn thresholds_explicit_empty_safety_set_is_respected() {
        let config: ThresholdConfig =
            serde_json::from_str(r#"{ "safety_evaluators": [] }"#).unwrap();
        assert!(config.safety_evaluators.is_empty());
    }

    #[test]
    fn thresholds_out_of_range_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("eval_thresholds.json");
        std::fs::write(&path, r#"{ "pass_rate_thresholds": { "coherence": 80 } }"#).unwrap();

        match ThresholdConfig::load(&path) {
            Err(GateError::InvalidThreshold { name, value }) => {
                assert_eq!(name, "coherence");
                assert_eq!(value, 80.0);
            }
            other => panic!("expected invalid threshold, got {other:?}"),
        }
    }

    #[test]
    fn missing_threshold_file_is_read_error() {
        let err = ThresholdConfig::load(Path::new("/nonexistent/eval_thresholds.json"))
            .unwrap_err();
        assert!(matches!(err, GateError::ReadConfig { .. }));
    }

    #[test]
    fn test_rows_skip_blank_lines_and_keep_extra_columns() {
        let content = concat!(
            r#"{"user_input": "How do I create a storage account?", "query": "storage"}"#,
            "\n\n   \n",
            r#"{"user_input": "Scale my app", "#,
            r#""query": [{"role": "user", "content": "scale"}], "category": "ops"}"#,
            "\n"
        );
        let rows = parse_test_rows(Path::new("rows.jsonl"), content).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].query, Query::Text("storage".to_string()));
        assert!(matches!(rows[1].query, Query::Messages(ref m) if m.len() == 1));
        assert_eq!(rows[1].extra["category"], "ops");
    }

    #[test]
    fn test_rows_report_line_number_of_bad_row() {
        let content = concat!(
            r#"{"user_input": "ok", "query": "ok"}"#,
            "\n\n",
            r#"{"user_input": "missing query"}"#,
            "\n"
        );
        match parse_test_rows(Path::new("rows.jsonl"), content) {
            Err(GateError::TestData { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected test data error, got {other:?}"),
        }
    }
}
