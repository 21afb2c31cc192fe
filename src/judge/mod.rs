//! The external evaluation service, seen through the three capabilities the gate needs:
//! submit a run, observe its status, and read back the judged rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub mod criteria;
pub mod foundry;
pub mod memory;

use crate::config_file::{AgentDefinition, TestRow};
use crate::errors::GateError;
use crate::types::{EvalId, ModelId, RunId};

/// Criterion name used when a raw result carries no usable name.
pub const UNKNOWN_CRITERION: &str = "unknown";

/// Everything needed to start one evaluation run.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub agent: AgentDefinition,
    pub judge_deployment: ModelId,
    pub rows: Vec<TestRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunHandle {
    pub eval_id: EvalId,
    pub run_id: RunId,
}

impl fmt::Display for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.eval_id, self.run_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    Running,
    Completed,
    Failed,
    Canceled,
    Other(String),
}

impl RunStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Other(raw) => raw,
        }
    }

    /// No further transitions happen after a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    /// Terminal, but without judged output to evaluate.
    pub fn is_infrastructure_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Canceled)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a submitted run as last observed.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRun {
    pub handle: RunHandle,
    pub status: RunStatus,
    pub report_url: Option<String>,
}

/// One criterion's verdict on one row, normalized from whatever shape the service sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorResult {
    pub name: String,
    pub passed: bool,
}

impl EvaluatorResult {
    pub fn new(name: impl Into<String>, passed: bool) -> Self {
        Self {
            name: name.into(),
            passed,
        }
    }

    /// Never fails: a missing or non-string name becomes [`UNKNOWN_CRITERION`]. `passed`
    /// is `true` or any non-zero number; strings, collections and `null` count as not passed.
    pub fn from_value(value: &Value) -> Self {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_CRITERION);
        let passed = match value.get("passed") {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        };
        Self::new(name, passed)
    }
}

/// One evaluated input row with its per-criterion results, in service order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputItem {
    pub id: Option<String>,
    pub results: Vec<EvaluatorResult>,
}

impl OutputItem {
    pub fn new(results: Vec<EvaluatorResult>) -> Self {
        Self { id: None, results }
    }

    pub fn from_value(value: &Value) -> Self {
        let id = value.get("id").and_then(Value::as_str).map(str::to_string);
        let results = value
            .get("results")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().map(EvaluatorResult::from_value).collect())
            .unwrap_or_default();
        Self { id, results }
    }
}

/// Capability interface to an evaluation backend.
#[async_trait::async_trait]
pub trait JudgeService: Send + Sync {
    /// Register the agent, define the evaluation and start a run over `spec.rows`.
    async fn submit(&self, spec: &RunSpec) -> Result<EvaluationRun, GateError>;

    /// Current state of a previously submitted run.
    async fn poll(&self, handle: &RunHandle) -> Result<EvaluationRun, GateError>;

    /// All judged rows of a completed run, in service order.
    async fn fetch_output(&self, handle: &RunHandle) -> Result<Vec<OutputItem>, GateError>;

    fn name(&self) -> &str;
}
