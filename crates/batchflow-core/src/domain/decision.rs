//! Decision model: what happens to a job after a failed attempt.
//!
//! `RetryDecision` is the value; `Decider` is the seam that produces it.

use serde::{Deserialize, Serialize};

use super::events::{LogicalTick, RetryReason};
use super::outcome::JobResult;
use crate::retry::{JobRetryState, RetryPolicy, RetryableState, evaluate_retry};

/// Outcome of a retry evaluation.
///
/// `earliest_retry_tick` is meaningful only when `should_retry` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RetryDecision {
    pub reason: RetryReason,
    pub should_retry: bool,
    pub earliest_retry_tick: LogicalTick,
}

impl RetryDecision {
    pub fn allow(earliest_retry_tick: LogicalTick) -> Self {
        Self {
            reason: RetryReason::PolicyAllowed,
            should_retry: true,
            earliest_retry_tick,
        }
    }

    pub fn deny() -> Self {
        Self {
            reason: RetryReason::PolicyDenied,
            should_retry: false,
            earliest_retry_tick: 0,
        }
    }
}

/// Decides whether a failed job gets another attempt.
///
/// Deciders are pure: same inputs, same decision, no side effects.
/// Applying the decision (deferring or failing the job) is the runner's job.
pub trait Decider: Send + Sync {
    fn decide(
        &self,
        policy: &RetryPolicy,
        retry_state: &JobRetryState,
        result: &JobResult,
        current_tick: LogicalTick,
    ) -> RetryDecision;
}

/// Default decider: the declared policy and nothing else. The engine's
/// result is never inspected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyDecider;

impl Decider for PolicyDecider {
    fn decide(
        &self,
        policy: &RetryPolicy,
        retry_state: &JobRetryState,
        _result: &JobResult,
        current_tick: LogicalTick,
    ) -> RetryDecision {
        evaluate_retry(policy, retry_state, RetryableState::Failed, current_tick)
    }
}
