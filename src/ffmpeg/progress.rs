use crate::error::JobError;
use std::time::Duration;

/// Messages sent from the worker thread to the UI thread during a run.
#[derive(Debug)]
pub enum RunEvent {
    /// A line for the log pane.
    Log(String),
    /// Step `index` (0-based) of `total` is about to launch.
    StepStarted { index: usize, total: usize },
    /// The run is over and its scratch files have been removed.
    Finished(Result<RunSummary, JobError>),
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: usize,
    pub failed_optional_steps: usize,
    pub elapsed: Duration,
}

/// Lifecycle of the single conversion the UI may have in flight.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running {
        step: usize,
        total: usize,
    },
    Succeeded,
    Failed(String),
}

impl RunState {
    pub fn is_busy(&self) -> bool {
        matches!(self, RunState::Running { .. })
    }

    /// Fold a worker event into the state.
    pub fn apply(&mut self, event: &RunEvent) {
        match event {
            RunEvent::Log(_) => {}
            RunEvent::StepStarted { index, total } => {
                *self = RunState::Running {
                    step: index + 1,
                    total: *total,
                };
            }
            RunEvent::Finished(Ok(_)) => *self = RunState::Succeeded,
            RunEvent::Finished(Err(e)) => *self = RunState::Failed(e.to_string()),
        }
    }

    pub fn message(&self) -> String {
        match self {
            RunState::Idle => "Ready".to_string(),
            RunState::Running { step: 0, .. } => "Preparing...".to_string(),
            RunState::Running { step, total } => format!("Running step {}/{}...", step, total),
            RunState::Succeeded => "Done".to_string(),
            RunState::Failed(message) => format!("Failed: {}", message),
        }
    }
}
