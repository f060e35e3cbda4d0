//! Background runs with pollable status and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::error::AnalysisError;
use super::runner::AnalysisRunner;
use super::types::{AnalysisEvent, AnalysisOutcome, AnalysisRequest, RunStatus};
use crate::pipeline::scoring::ReasoningOracle;

/// Handle to a run started with `AnalysisRunner::spawn`.
///
/// Dropping the handle does not cancel the run.
pub struct RunHandle {
    status: watch::Receiver<RunStatus>,
    cancel: Arc<AtomicBool>,
    task: JoinHandle<Result<AnalysisOutcome, AnalysisError>>,
}

impl RunHandle {
    /// Current status.
    pub fn status(&self) -> RunStatus {
        self.status.borrow().clone()
    }

    /// Receiver for status changes.
    pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.status.clone()
    }

    /// Request cancellation. In-flight oracle calls finish; nothing new starts
    /// and no evaluation is stored.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Wait for the run to finish.
    pub async fn wait(self) -> Result<AnalysisOutcome, AnalysisError> {
        self.task.await?
    }
}

impl<O: ReasoningOracle + 'static> AnalysisRunner<O> {
    /// Start a run on the tokio runtime and return immediately.
    pub fn spawn(self: &Arc<Self>, request: AnalysisRequest) -> RunHandle {
        let (tx, rx) = watch::channel(RunStatus::Queued);
        let cancel = Arc::new(AtomicBool::new(false));

        let runner = Arc::clone(self);
        let flag = Arc::clone(&cancel);
        let task = tokio::spawn(async move {
            let progress = |event: AnalysisEvent| {
                if let Some(status) = RunStatus::after(&event) {
                    tx.send_replace(status);
                }
            };
            let result = runner.run(request, flag, Some(&progress)).await;

            let final_status = match &result {
                Ok(_) => RunStatus::Completed,
                Err(AnalysisError::Cancelled) => RunStatus::Cancelled,
                Err(e) => RunStatus::Failed {
                    error: e.to_string(),
                },
            };
            tx.send_replace(final_status);
            result
        });

        RunHandle {
            status: rx,
            cancel,
            task,
        }
    }
}
