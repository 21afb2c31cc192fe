use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::config_file::TestRow;
use crate::types::ModelId;

pub const VIOLENCE_DETECTION: &str = "violence_detection";
pub const COHERENCE: &str = "coherence";
pub const TASK_ADHERENCE: &str = "task_adherence";

/// A judge applied server-side to every row of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestingCriterion {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub evaluator_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialization_parameters: Option<BTreeMap<String, String>>,
    pub data_mapping: BTreeMap<String, String>,
}

impl TestingCriterion {
    fn builtin(name: &str, evaluator: &str, response: &str) -> Self {
        Self {
            kind: "azure_ai_evaluator",
            name: name.to_string(),
            evaluator_name: format!("builtin.{evaluator}"),
            initialization_parameters: None,
            data_mapping: BTreeMap::from([
                ("query".to_string(), "{{item.query}}".to_string()),
                ("response".to_string(), response.to_string()),
            ]),
        }
    }

    fn judged_by(mut self, deployment: &ModelId) -> Self {
        self.initialization_parameters = Some(BTreeMap::from([(
            "deployment_name".to_string(),
            deployment.to_string(),
        )]));
        self
    }
}

/// The criteria every gate run is judged against.
pub fn default_testing_criteria(judge: &ModelId) -> Vec<TestingCriterion> {
    vec![
        TestingCriterion::builtin(VIOLENCE_DETECTION, "violence", "{{sample.output_text}}"),
        TestingCriterion::builtin(COHERENCE, "coherence", "{{sample.output_text}}")
            .judged_by(judge),
        TestingCriterion::builtin(TASK_ADHERENCE, "task_adherence", "{{sample.output_items}}")
            .judged_by(judge),
    ]
}

/// Row schema declared on the evaluation; mirrors what [`TestRow`] accepts.
pub fn item_schema() -> Value {
    json!({
        "type": "custom",
        "item_schema": {
            "type": "object",
            "properties": {
                "user_input": { "type": "string" },
                "query": { "anyOf": [{ "type": "string" }, { "type": "array" }] }
            },
            "required": ["user_input", "query"]
        },
        "include_sample_schema": true
    })
}

/// Data source for a run that calls the named agent version once per row.
///
/// Only `user_input` is sent as the user turn; the agent's registered instructions are its
/// sole system context.
pub fn target_data_source(rows: &[TestRow], agent_name: &str, agent_version: &str) -> Value {
    let content: Vec<Value> = rows.iter().map(|row| json!({ "item": row })).collect();
    json!({
        "type": "azure_ai_target_completions",
        "source": {
            "type": "file_content",
            "content": content
        },
        "input_messages": {
            "type": "template",
            "template": [{
                "type": "message",
                "role": "user",
                "content": { "type": "input_text", "text": "{{item.user_input}}" }
            }]
        },
        "target": {
            "type": "azure_ai_agent",
            "name": agent_name,
            "version": agent_version
        }
    })
}
