//! Retry evaluation.
//!
//! A decision is a function of the policy, the attempt history, the state
//! being evaluated and the current tick. Nothing about the engine or its
//! error message is consulted.

use super::{JobRetryState, RetryPolicy, RetryableState};
use crate::domain::{JobState, LogicalTick, RetryDecision};

/// Decide whether a job gets another attempt.
///
/// Denied when the state is not covered by the policy, or when one more
/// attempt would exceed `max_attempts`. Otherwise allowed, no earlier than
/// `last_attempt_tick + retry_delay_ticks`.
pub fn evaluate_retry(
    policy: &RetryPolicy,
    retry_state: &JobRetryState,
    failure_state: RetryableState,
    _current_tick: LogicalTick,
) -> RetryDecision {
    if !policy.retries_on(failure_state) {
        return RetryDecision::deny();
    }
    if retry_state.next_attempt_number() > policy.max_attempts {
        return RetryDecision::deny();
    }
    RetryDecision::allow(
        retry_state
            .last_attempt_tick
            .saturating_add(policy.retry_delay_ticks),
    )
}

/// Has the policy delay elapsed since the last attempt?
pub fn is_retry_time_reached(
    retry_state: &JobRetryState,
    retry_delay_ticks: LogicalTick,
    current_tick: LogicalTick,
) -> bool {
    current_tick >= retry_state.last_attempt_tick.saturating_add(retry_delay_ticks)
}

/// Map a lifecycle state to the retry vocabulary, if it has a counterpart.
pub fn retryable_state(state: JobState) -> Option<RetryableState> {
    match state {
        JobState::Failed => Some(RetryableState::Failed),
        JobState::Pending | JobState::Running | JobState::Completed => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RetryReason;
    use rstest::rstest;

    fn after_attempts(n: u32, last_tick: LogicalTick) -> JobRetryState {
        let mut state = JobRetryState::new();
        for _ in 0..n {
            state.record_attempt(last_tick);
        }
        state
    }

    #[test]
    fn boundary_at_two_attempts() {
        let policy = RetryPolicy::retry_on_failure(2, 0);
        let mut state = JobRetryState::new();
        let mut decisions = Vec::new();

        for tick in 1..=3 {
            state.record_attempt(tick);
            let decision = evaluate_retry(&policy, &state, RetryableState::Failed, tick);
            decisions.push(decision.should_retry);
            if !decision.should_retry {
                break;
            }
        }

        assert_eq!(decisions, vec![true, false]);
        assert!(state.attempt_count <= policy.max_attempts);
    }

    #[rstest]
    #[case::first_failure(1, true)]
    #[case::at_limit(2, false)]
    #[case::beyond_limit(3, false)]
    fn max_attempts_two(#[case] attempts: u32, #[case] allowed: bool) {
        let policy = RetryPolicy::retry_on_failure(2, 0);
        let decision = evaluate_retry(
            &policy,
            &after_attempts(attempts, 5),
            RetryableState::Failed,
            5,
        );
        assert_eq!(decision.should_retry, allowed);
        let expected = if allowed {
            RetryReason::PolicyAllowed
        } else {
            RetryReason::PolicyDenied
        };
        assert_eq!(decision.reason, expected);
    }

    #[test]
    fn state_not_in_policy_is_denied() {
        let decision = evaluate_retry(
            &RetryPolicy::no_retry(),
            &JobRetryState::new(),
            RetryableState::Failed,
            0,
        );
        assert_eq!(decision, RetryDecision::deny());
    }

    #[test]
    fn earliest_tick_adds_delay() {
        let policy = RetryPolicy::retry_on_failure(5, 3);
        let state = after_attempts(1, 10);
        let decision = evaluate_retry(&policy, &state, RetryableState::Failed, 11);
        assert_eq!(decision, RetryDecision::allow(13));

        assert!(!is_retry_time_reached(&state, 3, 12));
        assert!(is_retry_time_reached(&state, 3, 13));
    }

    #[rstest]
    #[case(JobState::Pending, None)]
    #[case(JobState::Running, None)]
    #[case(JobState::Completed, None)]
    #[case(JobState::Failed, Some(RetryableState::Failed))]
    fn state_mapping(#[case] state: JobState, #[case] expected: Option<RetryableState>) {
        assert_eq!(retryable_state(state), expected);
    }
}
