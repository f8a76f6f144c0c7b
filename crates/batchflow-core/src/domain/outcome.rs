//! Adapter results.
//!
//! Architecture-agnostic: this is only the shape of what an engine reports
//! back. Turning it into state transitions is the runner's job.

use serde::{Deserialize, Serialize};

use super::events::FailureCategory;
use super::ids::ArtifactId;

/// Classification of a single execution.
///
/// Serialized as SCREAMING_SNAKE_CASE (SUCCESS / ENGINE_FAILURE / INVALID_INPUT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobResultStatus {
    Success,
    EngineFailure,
    InvalidInput,
}

/// What an adapter returns for one `execute` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub status: JobResultStatus,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub engine_message: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_artifacts: Vec<ArtifactId>,
}

impl JobResult {
    pub fn success() -> Self {
        Self {
            status: JobResultStatus::Success,
            engine_message: String::new(),
            output_artifacts: Vec::new(),
        }
    }

    pub fn engine_failure(message: impl Into<String>) -> Self {
        Self {
            status: JobResultStatus::EngineFailure,
            engine_message: message.into(),
            output_artifacts: Vec::new(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            status: JobResultStatus::InvalidInput,
            engine_message: message.into(),
            output_artifacts: Vec::new(),
        }
    }

    pub fn with_artifact(mut self, artifact: ArtifactId) -> Self {
        self.output_artifacts.push(artifact);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == JobResultStatus::Success
    }

    /// Category recorded when this result ends in `mark_failed`.
    /// `None` for a success.
    pub fn failure_category(&self) -> Option<FailureCategory> {
        match self.status {
            JobResultStatus::Success => None,
            JobResultStatus::EngineFailure => Some(FailureCategory::EngineError),
            JobResultStatus::InvalidInput => Some(FailureCategory::ValidationFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_required_names() {
        let s = serde_json::to_string(&JobResultStatus::EngineFailure).unwrap();
        assert_eq!(s, "\"ENGINE_FAILURE\"");
        let s = serde_json::to_string(&JobResultStatus::InvalidInput).unwrap();
        assert_eq!(s, "\"INVALID_INPUT\"");
    }

    #[test]
    fn failure_category_mapping() {
        assert_eq!(JobResult::success().failure_category(), None);
        assert_eq!(
            JobResult::engine_failure("boom").failure_category(),
            Some(FailureCategory::EngineError)
        );
        assert_eq!(
            JobResult::invalid_input("bad").failure_category(),
            Some(FailureCategory::ValidationFailed)
        );
    }

    #[test]
    fn result_roundtrip_json() {
        let r = JobResult::success().with_artifact(ArtifactId::new("out.wav"));
        let s = serde_json::to_string(&r).unwrap();
        let back: JobResult = serde_json::from_str(&s).unwrap();
        assert_eq!(back, r);
        assert!(!s.contains("engine_message"));
    }
}
