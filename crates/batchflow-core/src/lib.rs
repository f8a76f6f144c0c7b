//! batchflow-core
//!
//! Deterministic orchestration of media-processing workflows.
//!
//! A workflow is a DAG of jobs whose ids are content hashes of their
//! definitions. The scheduler advances jobs through
//! `Pending -> Running -> Completed | Failed` and stamps every transition
//! with a logical tick, so a recorded event log can be replayed into the
//! exact same final state.
//!
//! # Modules
//! - **domain**: ids, definitions, events, states, results, errors
//! - **graph**: `JobGraphBuilder` and the frozen, acyclic `JobGraph`
//! - **clock** / **scheduler**: logical time and the job state machine
//! - **retry**: policies, attempt tracking and the retry evaluator
//! - **replay**: the event-log codec and the replay executor
//! - **preset**: versioned JSON workflow definitions, validation, compile
//! - **ports** / **impls**: execution adapters and event sinks
//! - **app**: `RunnerBuilder` and the async `Runner`

pub mod app;
pub mod clock;
pub mod domain;
pub mod error;
pub mod graph;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod preset;
pub mod replay;
pub mod retry;
pub mod scheduler;

pub use app::{RunReport, Runner, RunnerBuilder, RunnerConfig};
pub use clock::LogicalClock;
pub use domain::{
    ArtifactId, BatchFlowEvent, EventRecord, JobDefinition, JobId, JobState, JobStatus, LogicalTick,
    compute_job_id,
};
pub use error::BatchFlowError;
pub use graph::{JobDependency, JobGraph, JobGraphBuilder, JobNode};
pub use observability::SchedulerCounts;
pub use preset::{BatchFlowPreset, WorkflowPlan};
pub use replay::{BatchFlowReplayExecutor, ReplayLog};
pub use retry::RetryPolicy;
pub use scheduler::BatchFlowScheduler;
