//! Event-sourced replay: the log codec and the executor that rebuilds a run.

mod executor;
mod log;

pub use executor::BatchFlowReplayExecutor;
pub use log::ReplayLog;
