use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::RunId;

#[derive(Error, Debug)]
pub enum GateError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Failed to read {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid test data at {path}:{line}: {reason}")]
    TestData {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Threshold for '{name}' must be within [0, 1], got {value}")]
    InvalidThreshold { name: String, value: f64 },

    #[error("Judge service error {status}: {body}")]
    Service { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from judge service: {0}")]
    Protocol(String),

    #[error("Evaluation run {run_id} did not reach a terminal status within {waited:?}")]
    PollTimeout { run_id: RunId, waited: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GateError {
    /// Errors raised while loading configuration, before any run is submitted.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingEnv(_)
                | Self::InvalidEnv { .. }
                | Self::ReadConfig { .. }
                | Self::Yaml { .. }
                | Self::Json { .. }
                | Self::TestData { .. }
                | Self::InvalidThreshold { .. }
        )
    }
}
