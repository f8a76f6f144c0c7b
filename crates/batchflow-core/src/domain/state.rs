//! Job lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::events::{FailureCategory, LogicalTick};

/// Lifecycle state of a job.
///
/// Pending -> Running -> Completed | Failed. Nothing ever moves backwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobState {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "Pending",
            JobState::Running => "Running",
            JobState::Completed => "Completed",
            JobState::Failed => "Failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduler-owned status of one job. Ticks are 0 until the matching
/// transition happens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    pub started_tick: LogicalTick,
    pub finished_tick: LogicalTick,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureCategory>,
}

impl JobStatus {
    pub fn pending() -> Self {
        Self::default()
    }
}
