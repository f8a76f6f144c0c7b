//! Runner configuration.

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Execution limits and defaults for a run.
///
/// Every field has a default, so `{}` is a valid configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Upper bound on jobs executed in one batch. Values below 1 are
    /// treated as 1.
    pub max_parallel_jobs: usize,

    /// Policy for jobs the workflow declares none for.
    pub default_retry_policy: RetryPolicy,
}

impl RunnerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_max_parallel_jobs(mut self, max_parallel_jobs: usize) -> Self {
        self.max_parallel_jobs = max_parallel_jobs;
        self
    }

    pub fn with_default_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_retry_policy = policy;
        self
    }

    /// `max_parallel_jobs` with the minimum of 1 applied.
    pub fn parallelism(&self) -> usize {
        self.max_parallel_jobs.max(1)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_parallel_jobs: 4,
            default_retry_policy: RetryPolicy::no_retry(),
        }
    }
}
