//! Threshold policy: turns pass rates into a merge/block decision.

use serde::Serialize;

use crate::aggregate::PassRateSummary;
use crate::config_file::ThresholdConfig;

/// What a criterion has to meet. Safety takes precedence over a configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Requirement {
    Safety,
    Threshold(f64),
    Informational,
}

impl Requirement {
    pub fn for_criterion(name: &str, config: &ThresholdConfig) -> Self {
        if config.is_safety(name) {
            Self::Safety
        } else if let Some(threshold) = config.threshold(name) {
            Self::Threshold(threshold)
        } else {
            Self::Informational
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Pass,
    Fail,
    Info,
}

impl VerdictStatus {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Info => "INFO",
        }
    }
}

/// One criterion judged against its requirement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionVerdict {
    pub name: String,
    pub rate: f64,
    pub requirement: Requirement,
    pub status: VerdictStatus,
}

impl CriterionVerdict {
    pub fn judge(name: &str, rate: f64, config: &ThresholdConfig) -> Self {
        let requirement = Requirement::for_criterion(name, config);
        let status = match requirement {
            Requirement::Safety if rate == 1.0 => VerdictStatus::Pass,
            Requirement::Safety => VerdictStatus::Fail,
            Requirement::Threshold(t) if rate >= t => VerdictStatus::Pass,
            Requirement::Threshold(_) => VerdictStatus::Fail,
            Requirement::Informational => VerdictStatus::Info,
        };
        Self {
            name: name.to_string(),
            rate,
            requirement,
            status,
        }
    }

    /// Human-readable reason, present only for failing criteria.
    pub fn failure_message(&self) -> Option<String> {
        if self.status != VerdictStatus::Fail {
            return None;
        }
        Some(match self.requirement {
            Requirement::Safety => format!(
                "Safety block: {} {} (must be 100%)",
                self.name,
                percent(self.rate)
            ),
            Requirement::Threshold(t) => format!(
                "{}: {} below threshold {}",
                self.name,
                percent(self.rate),
                percent(t)
            ),
            Requirement::Informational => return None,
        })
    }
}

/// Render a rate as a whole percentage, e.g. `0.9` as `90%`.
pub fn percent(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

/// Every criterion in name order.
pub fn verdicts(summary: &PassRateSummary, config: &ThresholdConfig) -> Vec<CriterionVerdict> {
    summary
        .iter()
        .map(|(name, rate)| CriterionVerdict::judge(name, rate, config))
        .collect()
}

/// The gate's binary outcome. Built once by [`evaluate`] and never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateDecision {
    passed: bool,
    failures: Vec<String>,
}

impl GateDecision {
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Failure messages in criterion-name order.
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

/// Apply the threshold policy. Never fails; criteria without configuration are informational.
pub fn evaluate(summary: &PassRateSummary, config: &ThresholdConfig) -> GateDecision {
    let failures: Vec<String> = verdicts(summary, config)
        .iter()
        .filter_map(CriterionVerdict::failure_message)
        .collect();
    GateDecision {
        passed: failures.is_empty(),
        failures,
    }
}
