use std::collections::VecDeque;
use std::sync::Mutex;

use super::{EvaluationRun, JudgeService, OutputItem, RunHandle, RunSpec, RunStatus};
use crate::errors::GateError;
use crate::types::{EvalId, RunId};

/// In-process judge that replays a fixed status sequence and returns canned rows.
///
/// The run starts in `initial`; each `poll` pops the next scripted status, repeating the
/// last one once the script is exhausted.
pub struct InMemoryJudge {
    handle: RunHandle,
    initial: RunStatus,
    script: Mutex<VecDeque<RunStatus>>,
    last: Mutex<RunStatus>,
    output: Vec<OutputItem>,
    report_url: Option<String>,
    polls: Mutex<usize>,
    fetches: Mutex<usize>,
    submitted: Mutex<Option<RunSpec>>,
}

impl InMemoryJudge {
    pub fn new(initial: RunStatus, script: Vec<RunStatus>, output: Vec<OutputItem>) -> Self {
        Self {
            handle: RunHandle {
                eval_id: EvalId::new("eval_local"),
                run_id: RunId::new("run_local"),
            },
            last: Mutex::new(initial.clone()),
            initial,
            script: Mutex::new(script.into()),
            output,
            report_url: None,
            polls: Mutex::new(0),
            fetches: Mutex::new(0),
            submitted: Mutex::new(None),
        }
    }

    /// A run that is already complete when submitted.
    pub fn completed(output: Vec<OutputItem>) -> Self {
        Self::new(RunStatus::Completed, Vec::new(), output)
    }

    pub fn with_report_url(mut self, url: impl Into<String>) -> Self {
        self.report_url = Some(url.into());
        self
    }

    pub fn poll_count(&self) -> usize {
        *self.polls.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn submitted(&self) -> Option<RunSpec> {
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn snapshot(&self, status: RunStatus) -> EvaluationRun {
        EvaluationRun {
            handle: self.handle.clone(),
            report_url: status.is_terminal().then(|| self.report_url.clone()).flatten(),
            status,
        }
    }

    fn check_handle(&self, handle: &RunHandle) -> Result<(), GateError> {
        if handle != &self.handle {
            return Err(GateError::Service {
                status: 404,
                body: format!("unknown run {handle}"),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl JudgeService for InMemoryJudge {
    async fn submit(&self, spec: &RunSpec) -> Result<EvaluationRun, GateError> {
        *self.submitted.lock().unwrap_or_else(|e| e.into_inner()) = Some(spec.clone());
        Ok(self.snapshot(self.initial.clone()))
    }

    async fn poll(&self, handle: &RunHandle) -> Result<EvaluationRun, GateError> {
        self.check_handle(handle)?;
        *self.polls.lock().unwrap_or_else(|e| e.into_inner()) += 1;

        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(next) = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            *last = next;
        }
        Ok(self.snapshot(last.clone()))
    }

    async fn fetch_output(&self, handle: &RunHandle) -> Result<Vec<OutputItem>, GateError> {
        self.check_handle(handle)?;
        *self.fetches.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(self.output.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
