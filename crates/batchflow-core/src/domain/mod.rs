//! Domain model (ids, definitions, events, states, results, decisions, errors).

pub mod decision;
pub mod definition;
pub mod errors;
pub mod events;
pub mod ids;
pub mod outcome;
pub mod state;

pub use decision::{Decider, PolicyDecider, RetryDecision};
pub use definition::{JOB_ID_SCHEME, JobDefinition, compute_job_id};
pub use errors::{ErrorCode, ErrorContext, ErrorList, ErrorSeverity, FlowError, FlowResult};
pub use events::{
    BatchFlowEvent, EventData, EventKind, EventRecord, FailureCategory, LogicalTick, RetryReason,
};
pub use ids::{ArtifactId, JOB_ID_LEN, JobId};
pub use outcome::{JobResult, JobResultStatus};
pub use state::{JobState, JobStatus};
