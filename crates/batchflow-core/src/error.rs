use thiserror::Error;

use crate::domain::{JobId, JobState, LogicalTick};

/// Contract violations raised by the orchestration core.
///
/// Every variant means a logic or data-integrity defect (an illegal state
/// transition, a corrupted event log, a cyclic graph). Callers abort the
/// current operation on these; nothing is retried or corrected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchFlowError {
    #[error("dependency cycle detected: {}", join_ids(cycle))]
    CycleDetected { cycle: Vec<JobId> },

    #[error("job not found: {0}")]
    UnknownJob(JobId),

    #[error("cannot {operation} job {job_id}: expected state {expected:?}, found {actual:?}")]
    InvalidTransition {
        job_id: JobId,
        operation: &'static str,
        expected: JobState,
        actual: JobState,
    },

    #[error("replay determinism violation: regenerated tick {regenerated} does not match recorded tick {recorded}")]
    ReplayTickMismatch {
        regenerated: LogicalTick,
        recorded: LogicalTick,
    },

    #[error("malformed event log at line {line}: {reason}")]
    MalformedEventLog { line: usize, reason: String },

    #[error("malformed event record: {0}")]
    MalformedEvent(String),

    #[error("invalid job id {0:?}: expected 64 lowercase hex characters")]
    InvalidJobId(String),
}

fn join_ids(ids: &[JobId]) -> String {
    ids.iter()
        .map(JobId::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
