//! Retry module: declarative policies, attempt tracking and the evaluator.

mod attempts;
mod evaluator;
mod policy;

pub use attempts::JobRetryState;
pub use evaluator::{evaluate_retry, is_retry_time_reached, retryable_state};
pub use policy::{RetryPolicy, RetryableState};
