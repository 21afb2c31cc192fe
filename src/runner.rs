use log::{debug, warn};
use serde_json::json;
use std::process::ExitCode;

use crate::aggregate::{PassRateSummary, aggregate};
use crate::config_file::ThresholdConfig;
use crate::errors::GateError;
use crate::judge::{EvaluationRun, JudgeService, RunSpec};
use crate::observability::DecisionLog;
use crate::policy::{GateDecision, evaluate};
use crate::poller::EvaluationRunPoller;
use crate::report::{StepSummary, console_report, markdown_table, report_link};
use crate::ui;

/// How one gate invocation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Passed {
        summary: PassRateSummary,
        decision: GateDecision,
    },
    QualityFailure {
        summary: PassRateSummary,
        decision: GateDecision,
    },
    /// The service could not produce judged output; no pass rates were computed.
    InfrastructureFailure { reason: String },
}

impl GateOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }

    /// `0` only when every required criterion passed.
    pub fn code(&self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    pub fn decision(&self) -> Option<&GateDecision> {
        match self {
            Self::Passed { decision, .. } | Self::QualityFailure { decision, .. } => Some(decision),
            Self::InfrastructureFailure { .. } => None,
        }
    }
}

/// Submit, wait, aggregate, decide, report.
pub struct GateRunner<'a, J: JudgeService + ?Sized> {
    judge: &'a J,
    poller: EvaluationRunPoller,
    step_summary: StepSummary,
    decision_log: Option<DecisionLog>,
}

impl<'a, J: JudgeService + ?Sized> GateRunner<'a, J> {
    pub fn new(judge: &'a J, poller: EvaluationRunPoller) -> Self {
        Self {
            judge,
            poller,
            step_summary: StepSummary::disabled(),
            decision_log: None,
        }
    }

    pub fn with_step_summary(mut self, step_summary: StepSummary) -> Self {
        self.step_summary = step_summary;
        self
    }

    pub fn with_decision_log(mut self, log: Option<DecisionLog>) -> Self {
        self.decision_log = log;
        self
    }

    // Step-summary and decision-log writes are advisory; a failure there never changes
    // the gate decision.
    fn append_summary(&self, text: &str) {
        if let Err(e) = self.step_summary.append(text) {
            warn!("failed to append step summary: {e}");
            ui::warn(format!("Could not write step summary: {e}"));
        }
    }

    fn record(&self, run: Option<&EvaluationRun>, outcome: &GateOutcome) {
        let Some(log) = &self.decision_log else {
            return;
        };
        let (pass_rates, infrastructure_error) = match outcome {
            GateOutcome::Passed { summary, .. } | GateOutcome::QualityFailure { summary, .. } => {
                (Some(summary), None)
            }
            GateOutcome::InfrastructureFailure { reason } => (None, Some(reason.as_str())),
        };
        let event = json!({
            "judge": self.judge.name(),
            "run": run.map(|r| r.handle.to_string()),
            "status": run.map(|r| r.status.to_string()),
            "passed": outcome.is_success(),
            "pass_rates": pass_rates,
            "failures": outcome.decision().map(GateDecision::failures),
            "infrastructure_error": infrastructure_error,
        });
        if let Err(e) = log.append(&event) {
            warn!("failed to append decision log {}: {e}", log.path().display());
        }
    }

    /// Errors from the service are returned after a decision-log entry is written.
    pub async fn run(
        &self,
        spec: &RunSpec,
        thresholds: &ThresholdConfig,
    ) -> Result<GateOutcome, GateError> {
        let result = self.run_stages(spec, thresholds).await;
        if let Err(e) = &result {
            let outcome = GateOutcome::InfrastructureFailure {
                reason: e.to_string(),
            };
            self.record(None, &outcome);
        }
        result
    }

    async fn run_stages(
        &self,
        spec: &RunSpec,
        thresholds: &ThresholdConfig,
    ) -> Result<GateOutcome, GateError> {
        let submitted = self.judge.submit(spec).await?;
        debug!("submitted run {} via {}", submitted.handle, self.judge.name());

        let run = match self.poller.wait(self.judge, submitted).await {
            Ok(run) => run,
            Err(GateError::PollTimeout { run_id, waited }) => {
                let reason = format!(
                    "Eval run {run_id} still not finished after {}s (infrastructure error).",
                    waited.as_secs()
                );
                ui::error(&reason);
                let outcome = GateOutcome::InfrastructureFailure { reason };
                self.record(None, &outcome);
                return Ok(outcome);
            }
            Err(e) => return Err(e),
        };

        if let Some(url) = &run.report_url {
            ui::info(format!("\nFoundry portal: {url}"));
            self.append_summary(&report_link(url));
        }

        if run.status.is_infrastructure_failure() {
            let reason = format!("Eval run {} (infrastructure error).", run.status);
            ui::error(&reason);
            let outcome = GateOutcome::InfrastructureFailure { reason };
            self.record(Some(&run), &outcome);
            return Ok(outcome);
        }

        let items = self.judge.fetch_output(&run.handle).await?;
        ui::info(format!("\n{} rows evaluated.", items.len()));

        let summary = aggregate(&items);
        let decision = evaluate(&summary, thresholds);

        ui::section_title("Results:");
        for line in console_report(&summary, thresholds) {
            ui::report_line(&line);
        }
        self.append_summary(&format!("\n{}", markdown_table(&summary, thresholds)));

        let outcome = if decision.passed() {
            ui::gate_passed();
            GateOutcome::Passed { summary, decision }
        } else {
            ui::failure_list(decision.failures());
            GateOutcome::QualityFailure { summary, decision }
        };
        self.record(Some(&run), &outcome);
        Ok(outcome)
    }
}
