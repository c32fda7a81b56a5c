//! Worker state definitions.

use std::fmt;

/// Worker operational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Consume loop not started yet.
    Idle,
    /// Waiting for the next job.
    Consuming,
    /// Running a job.
    Processing,
    /// Queue closed and drained, loop exited.
    Stopped,
}

impl WorkerState {
    /// Check if the consume loop is alive.
    pub fn is_running(&self) -> bool {
        matches!(self, WorkerState::Consuming | WorkerState::Processing)
    }

    /// Check if the worker is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Stopped)
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Consuming => "consuming",
            WorkerState::Processing => "processing",
            WorkerState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
