//! Retry policy: declarative, no adaptive behavior.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::LogicalTick;

/// Job states that can trigger a retry evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RetryableState {
    Failed,
}

impl RetryableState {
    pub fn as_str(self) -> &'static str {
        match self {
            RetryableState::Failed => "Failed",
        }
    }
}

impl FromStr for RetryableState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Failed" => Ok(RetryableState::Failed),
            other => Err(format!("unknown retryable state {other:?}")),
        }
    }
}

/// Retry policy for one job.
///
/// `max_attempts` counts the original execution, so 1 means "never retry".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(default)]
    pub retry_on_states: BTreeSet<RetryableState>,
    #[serde(default)]
    pub retry_delay_ticks: LogicalTick,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        retry_on_states: BTreeSet<RetryableState>,
        retry_delay_ticks: LogicalTick,
    ) -> Self {
        Self {
            max_attempts,
            retry_on_states,
            retry_delay_ticks,
        }
    }

    pub fn no_retry() -> Self {
        Self::new(1, BTreeSet::new(), 0)
    }

    pub fn retry_on_failure(max_attempts: u32, retry_delay_ticks: LogicalTick) -> Self {
        Self::new(
            max_attempts,
            BTreeSet::from([RetryableState::Failed]),
            retry_delay_ticks,
        )
    }

    pub fn retries_on(&self, state: RetryableState) -> bool {
        self.retry_on_states.contains(&state)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retry()
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryPolicy{{max_attempts={}, retry_delay_ticks={}, retry_on_states=[",
            self.max_attempts, self.retry_delay_ticks
        )?;
        for (i, state) in self.retry_on_states.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(state.as_str())?;
        }
        f.write_str("]}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_retry_is_single_attempt() {
        let policy = RetryPolicy::no_retry();
        assert_eq!(policy.max_attempts, 1);
        assert!(!policy.retries_on(RetryableState::Failed));
        assert_eq!(RetryPolicy::default(), policy);
    }

    #[test]
    fn display_lists_states() {
        let policy = RetryPolicy::retry_on_failure(3, 2);
        assert_eq!(
            policy.to_string(),
            "RetryPolicy{max_attempts=3, retry_delay_ticks=2, retry_on_states=[Failed]}"
        );
        assert_eq!(
            RetryPolicy::no_retry().to_string(),
            "RetryPolicy{max_attempts=1, retry_delay_ticks=0, retry_on_states=[]}"
        );
    }

    #[test]
    fn deserializes_with_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 2}"#).unwrap();
        assert_eq!(policy, RetryPolicy::new(2, BTreeSet::new(), 0));
    }
}
