use log::debug;
use tokio::time::{Instant, sleep};

use crate::config::PollSettings;
use crate::errors::GateError;
use crate::judge::{EvaluationRun, JudgeService};
use crate::ui;

/// Drives a submitted run to a terminal status with a fixed delay between queries.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRunPoller {
    settings: PollSettings,
}

impl EvaluationRunPoller {
    pub fn new(settings: PollSettings) -> Self {
        Self { settings }
    }

    /// Return the first snapshot whose status is terminal (`completed`, `failed`, `canceled`).
    ///
    /// An already-terminal `run` is returned without querying. Errors from the service are
    /// returned as-is; there are no retries. Exceeding `max_wait` yields
    /// [`GateError::PollTimeout`].
    pub async fn wait<J>(
        &self,
        judge: &J,
        mut run: EvaluationRun,
    ) -> Result<EvaluationRun, GateError>
    where
        J: JudgeService + ?Sized,
    {
        let started = Instant::now();
        while !run.status.is_terminal() {
            if let Some(max_wait) = self.settings.max_wait {
                if started.elapsed() >= max_wait {
                    return Err(GateError::PollTimeout {
                        run_id: run.handle.run_id.clone(),
                        waited: started.elapsed(),
                    });
                }
            }
            sleep(self.settings.interval).await;
            run = judge.poll(&run.handle).await?;
            debug!("run {} status {}", run.handle, run.status);
            ui::poll_status(run.status.as_str());
        }
        Ok(run)
    }
}
