use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::domain::{JobDefinition, JobId, compute_job_id};

/// A job as the graph and the adapters see it.
///
/// Equality, ordering and hashing use the id only.
#[derive(Debug, Clone)]
pub struct JobNode {
    id: JobId,
    engine_name: String,
    api_operation: String,
    parameters_blob: Vec<u8>,
}

impl JobNode {
    /// Build a node whose id is computed from the definition.
    pub fn from_definition(definition: &JobDefinition) -> Self {
        Self {
            id: compute_job_id(definition),
            engine_name: definition.engine_identifier().to_string(),
            api_operation: definition.api_operation().to_string(),
            parameters_blob: definition.parameters_blob().to_vec(),
        }
    }

    /// Build a node with a precomputed id. The caller vouches that `id`
    /// belongs to the rest of the fields.
    pub fn with_id(
        id: JobId,
        engine_name: impl Into<String>,
        api_operation: impl Into<String>,
        parameters_blob: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id,
            engine_name: engine_name.into(),
            api_operation: api_operation.into(),
            parameters_blob: parameters_blob.into(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    pub fn api_operation(&self) -> &str {
        &self.api_operation
    }

    pub fn parameters_blob(&self) -> &[u8] {
        &self.parameters_blob
    }
}

impl PartialEq for JobNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for JobNode {}

impl PartialOrd for JobNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for JobNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for JobNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for JobNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobNode{{id={}, engine={}}}", self.id, self.engine_name)
    }
}

/// `from` must be Completed before `to` may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobDependency {
    pub from: JobId,
    pub to: JobId,
}

impl JobDependency {
    pub fn new(from: JobId, to: JobId) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for JobDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_identity_ignores_payload() {
        let id = JobId::from_digest([7; 32]);
        let a = JobNode::with_id(id, "engine.audio", "prepare", b"x".to_vec());
        let b = JobNode::with_id(id, "engine.video", "render", b"y".to_vec());
        assert_eq!(a, b);
    }

    #[test]
    fn node_from_definition_copies_fields() {
        let def = JobDefinition::new("engine.meta", "plan_repair", "{}", vec![], vec![]);
        let node = JobNode::from_definition(&def);
        assert_eq!(node.id(), JobId::from(&def));
        assert_eq!(node.engine_name(), "engine.meta");
        assert_eq!(node.api_operation(), "plan_repair");
        assert_eq!(node.parameters_blob(), b"{}");
    }
}
