//! Process-boundary configuration. Everything the gate needs from the environment is read
//! here once; the rest of the crate receives these values explicitly.

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::GateError;
use crate::types::ModelId;

pub const ENDPOINT_ENV: &str = "AZURE_AI_PROJECT";
pub const TOKEN_ENV: &str = "AZURE_AI_TOKEN";
pub const API_VERSION_ENV: &str = "AZURE_AI_API_VERSION";
pub const JUDGE_DEPLOYMENT_ENV: &str = "AZURE_JUDGE_DEPLOYMENT";
pub const AGENT_NAME_OVERRIDE_ENV: &str = "AZURE_AGENT_NAME_OVERRIDE";
pub const STEP_SUMMARY_ENV: &str = "GITHUB_STEP_SUMMARY";
pub const POLL_INTERVAL_ENV: &str = "EVAL_GATE_POLL_INTERVAL_SECS";
pub const MAX_WAIT_ENV: &str = "EVAL_GATE_MAX_WAIT_SECS";
pub const LOG_DIR_ENV: &str = "EVAL_GATE_LOG_DIR";

pub const DEFAULT_API_VERSION: &str = "2025-11-15-preview";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_MAX_WAIT_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` waits until a terminal status is observed.
    pub max_wait: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_wait: Some(Duration::from_secs(DEFAULT_MAX_WAIT_SECS)),
        }
    }
}

impl PollSettings {
    /// A `max_wait` of zero seconds disables the limit.
    pub fn from_secs(interval_secs: u64, max_wait_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs),
            max_wait: (max_wait_secs > 0).then(|| Duration::from_secs(max_wait_secs)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub endpoint: String,
    pub token: Option<String>,
    pub api_version: String,
    pub judge_deployment: ModelId,
    pub agent_name_override: Option<String>,
    pub step_summary: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub poll: PollSettings,
}

impl GateConfig {
    pub fn from_env() -> Result<Self, GateError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let endpoint = get(ENDPOINT_ENV)
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .ok_or(GateError::MissingEnv(ENDPOINT_ENV))?;

        let interval = parse_secs(POLL_INTERVAL_ENV, get(POLL_INTERVAL_ENV))?
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        let max_wait =
            parse_secs(MAX_WAIT_ENV, get(MAX_WAIT_ENV))?.unwrap_or(DEFAULT_MAX_WAIT_SECS);

        Ok(Self {
            endpoint,
            token: get(TOKEN_ENV),
            api_version: get(API_VERSION_ENV).unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            judge_deployment: get(JUDGE_DEPLOYMENT_ENV)
                .map(ModelId::new)
                .unwrap_or_else(ModelId::default_judge),
            agent_name_override: get(AGENT_NAME_OVERRIDE_ENV),
            step_summary: get(STEP_SUMMARY_ENV).map(PathBuf::from),
            log_dir: get(LOG_DIR_ENV).map(PathBuf::from),
            poll: PollSettings::from_secs(interval, max_wait),
        })
    }
}

fn parse_secs(key: &'static str, value: Option<String>) -> Result<Option<u64>, GateError> {
    value
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .map_err(|_| GateError::InvalidEnv { key, value: v })
        })
        .transpose()
}
