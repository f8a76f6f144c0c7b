//! Job definitions and content-addressed identity.
//!
//! Canonical encoding (scheme `batchflow.jobid.sha256.v1`):
//!
//! ```text
//! engine_identifier|api_operation|parameters_blob|[in_1,in_2,...]|[out_1,...]
//! ```
//!
//! Artifact lists are sorted before encoding, so insertion order never leaks
//! into identity. Changing this layout changes every `JobId`; bump
//! `JOB_ID_SCHEME` if it ever has to change.

use sha2::{Digest, Sha256};

use super::ids::{ArtifactId, JOB_ID_LEN, JobId};

/// Version tag of the canonical encoding + hash combination.
pub const JOB_ID_SCHEME: &str = "batchflow.jobid.sha256.v1";

const FIELD_DELIMITER: u8 = b'|';

/// Everything that determines a job's identity.
///
/// Immutable once built. Artifact lists are kept sorted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobDefinition {
    engine_identifier: String,
    api_operation: String,
    parameters_blob: Vec<u8>,
    input_artifacts: Vec<ArtifactId>,
    output_artifacts: Vec<ArtifactId>,
}

impl JobDefinition {
    pub fn new(
        engine_identifier: impl Into<String>,
        api_operation: impl Into<String>,
        parameters_blob: impl Into<Vec<u8>>,
        mut input_artifacts: Vec<ArtifactId>,
        mut output_artifacts: Vec<ArtifactId>,
    ) -> Self {
        input_artifacts.sort();
        output_artifacts.sort();
        Self {
            engine_identifier: engine_identifier.into(),
            api_operation: api_operation.into(),
            parameters_blob: parameters_blob.into(),
            input_artifacts,
            output_artifacts,
        }
    }

    pub fn engine_identifier(&self) -> &str {
        &self.engine_identifier
    }

    pub fn api_operation(&self) -> &str {
        &self.api_operation
    }

    pub fn parameters_blob(&self) -> &[u8] {
        &self.parameters_blob
    }

    pub fn input_artifacts(&self) -> &[ArtifactId] {
        &self.input_artifacts
    }

    pub fn output_artifacts(&self) -> &[ArtifactId] {
        &self.output_artifacts
    }

    /// Canonical byte encoding that is hashed into the `JobId`.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.engine_identifier.len() + self.api_operation.len() + self.parameters_blob.len() + 16,
        );
        out.extend_from_slice(self.engine_identifier.as_bytes());
        out.push(FIELD_DELIMITER);
        out.extend_from_slice(self.api_operation.as_bytes());
        out.push(FIELD_DELIMITER);
        out.extend_from_slice(&self.parameters_blob);
        out.push(FIELD_DELIMITER);
        encode_artifacts(&mut out, &self.input_artifacts);
        out.push(FIELD_DELIMITER);
        encode_artifacts(&mut out, &self.output_artifacts);
        out
    }
}

fn encode_artifacts(out: &mut Vec<u8>, artifacts: &[ArtifactId]) {
    out.push(b'[');
    for (i, artifact) in artifacts.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        out.extend_from_slice(artifact.as_str().as_bytes());
    }
    out.push(b']');
}

/// Compute the content-addressed id of a job definition.
///
/// Pure and total: no I/O, no clock, no global state.
pub fn compute_job_id(definition: &JobDefinition) -> JobId {
    JobId::from_digest(sha256(&definition.canonical_bytes()))
}

fn sha256(bytes: &[u8]) -> [u8; JOB_ID_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

impl From<&JobDefinition> for JobId {
    fn from(definition: &JobDefinition) -> Self {
        compute_job_id(definition)
    }
}
