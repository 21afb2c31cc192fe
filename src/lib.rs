pub mod aggregate;
pub mod config;
pub mod config_file;
pub mod errors;
pub mod judge;
pub mod observability;
pub mod policy;
pub mod poller;
pub mod report;
pub mod runner;
pub mod types;
pub mod ui;

pub use crate::aggregate::{PassRateSummary, Tally, aggregate};
pub use crate::config::{GateConfig, PollSettings};
pub use crate::config_file::{AgentDefinition, TestRow, ThresholdConfig, load_test_rows};
pub use crate::errors::GateError;
pub use crate::judge::{
    EvaluationRun, EvaluatorResult, JudgeService, OutputItem, RunHandle, RunSpec, RunStatus,
};
pub use crate::policy::{GateDecision, evaluate};
pub use crate::poller::EvaluationRunPoller;
pub use crate::runner::{GateOutcome, GateRunner};
pub use crate::types::{EvalId, ModelId, RunId};
