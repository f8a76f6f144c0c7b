//! Presets: declarative, versioned workflow definitions.
//!
//! A preset is loaded from JSON, validated into an `ErrorList`, and compiled
//! into a `WorkflowPlan` (graph plus per-job retry policies) for the runner.

pub mod compile;
pub mod model;
pub mod validate;
pub mod version;

pub use self::compile::WorkflowPlan;
pub use self::model::{BatchFlowPreset, PresetDependency, PresetJobDefinition, PresetRetryPolicy};
pub use self::version::PresetVersion;

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("invalid preset json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate job name: {0}")]
    DuplicateJob(String),

    #[error("duplicate retry policy for job: {0}")]
    DuplicateRetryPolicy(String),

    #[error("invalid preset version: {0:?}")]
    InvalidVersion(String),
}
