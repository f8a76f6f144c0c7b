//! Preset documents: declarative workflow definitions.
//!
//! Pure data. A preset names its jobs; names are resolved to content
//! addressed `JobId`s only when it is compiled.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::PresetError;
use super::version::PresetVersion;
use crate::domain::{ArtifactId, JobDefinition};
use crate::retry::{RetryPolicy, RetryableState};

/// One job of a preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetJobDefinition {
    pub job_name: String,
    pub engine_identifier: String,
    pub api_operation: String,
    /// Canonical parameter text, passed to the engine unchanged.
    #[serde(default)]
    pub parameters_blob: String,
    #[serde(default)]
    pub input_artifacts: Vec<String>,
    #[serde(default)]
    pub output_artifacts: Vec<String>,
}

impl PresetJobDefinition {
    pub fn new(
        job_name: impl Into<String>,
        engine_identifier: impl Into<String>,
        api_operation: impl Into<String>,
        parameters_blob: impl Into<String>,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            engine_identifier: engine_identifier.into(),
            api_operation: api_operation.into(),
            parameters_blob: parameters_blob.into(),
            input_artifacts: Vec::new(),
            output_artifacts: Vec::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: &[&str]) -> Self {
        self.input_artifacts = inputs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_outputs(mut self, outputs: &[&str]) -> Self {
        self.output_artifacts = outputs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// The identity-bearing part of this job. The name is not part of it.
    pub fn to_job_definition(&self) -> JobDefinition {
        JobDefinition::new(
            self.engine_identifier.as_str(),
            self.api_operation.as_str(),
            self.parameters_blob.as_bytes(),
            self.input_artifacts.iter().map(|a| ArtifactId::new(a.as_str())).collect(),
            self.output_artifacts.iter().map(|a| ArtifactId::new(a.as_str())).collect(),
        )
    }
}

/// `from_job` must complete before `to_job` starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PresetDependency {
    pub from_job: String,
    pub to_job: String,
}

impl PresetDependency {
    pub fn new(from_job: impl Into<String>, to_job: impl Into<String>) -> Self {
        Self {
            from_job: from_job.into(),
            to_job: to_job.into(),
        }
    }
}

/// Retry policy of one job, with states spelled as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetRetryPolicy {
    pub job_name: String,
    pub max_attempts: u32,
    #[serde(default)]
    pub retry_delay_ticks: u64,
    #[serde(default)]
    pub retry_on_states: BTreeSet<String>,
}

impl PresetRetryPolicy {
    pub fn new(job_name: impl Into<String>, max_attempts: u32, retry_delay_ticks: u64) -> Self {
        Self {
            job_name: job_name.into(),
            max_attempts,
            retry_delay_ticks,
            retry_on_states: BTreeSet::from(["Failed".to_string()]),
        }
    }

    /// Runtime form. Unknown state names are dropped; `validate` reports them.
    pub fn to_runtime_policy(&self) -> RetryPolicy {
        let states = self
            .retry_on_states
            .iter()
            .filter_map(|s| s.parse::<RetryableState>().ok())
            .collect();
        RetryPolicy::new(self.max_attempts, states, self.retry_delay_ticks)
    }
}

/// Wire form. Collections are lists so that duplicates can be detected.
#[derive(Serialize, Deserialize)]
struct PresetDocument {
    version: PresetVersion,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    jobs: Vec<PresetJobDefinition>,
    #[serde(default)]
    dependencies: Vec<PresetDependency>,
    #[serde(default)]
    retry_policies: Vec<PresetRetryPolicy>,
}

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFlowPreset {
    version: PresetVersion,
    name: String,
    description: String,
    jobs: BTreeMap<String, PresetJobDefinition>,
    dependencies: BTreeSet<PresetDependency>,
    retry_policies: BTreeMap<String, PresetRetryPolicy>,
}

impl BatchFlowPreset {
    pub fn new(version: PresetVersion, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            description: description.into(),
            jobs: BTreeMap::new(),
            dependencies: BTreeSet::new(),
            retry_policies: BTreeMap::new(),
        }
    }

    pub fn version(&self) -> PresetVersion {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Jobs by name.
    pub fn jobs(&self) -> &BTreeMap<String, PresetJobDefinition> {
        &self.jobs
    }

    pub fn dependencies(&self) -> &BTreeSet<PresetDependency> {
        &self.dependencies
    }

    /// Retry policies by job name.
    pub fn retry_policies(&self) -> &BTreeMap<String, PresetRetryPolicy> {
        &self.retry_policies
    }

    /// Add a job; a job with the same name is replaced.
    pub fn add_job(&mut self, job: PresetJobDefinition) {
        self.jobs.insert(job.job_name.clone(), job);
    }

    pub fn add_dependency(&mut self, dependency: PresetDependency) {
        self.dependencies.insert(dependency);
    }

    /// Add a retry policy; an existing policy for the same job is replaced.
    pub fn add_retry_policy(&mut self, policy: PresetRetryPolicy) {
        self.retry_policies.insert(policy.job_name.clone(), policy);
    }

    pub fn to_json(&self) -> Result<String, PresetError> {
        let document = PresetDocument {
            version: self.version,
            name: self.name.clone(),
            description: self.description.clone(),
            jobs: self.jobs.values().cloned().collect(),
            dependencies: self.dependencies.iter().cloned().collect(),
            retry_policies: self.retry_policies.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Parse a preset. Two jobs (or two retry policies) with the same name
    /// are rejected rather than silently merged.
    pub fn from_json(json: &str) -> Result<Self, PresetError> {
        let document: PresetDocument = serde_json::from_str(json)?;
        let mut preset = Self::new(document.version, document.name, document.description);
        for job in document.jobs {
            if preset.jobs.contains_key(&job.job_name) {
                return Err(PresetError::DuplicateJob(job.job_name));
            }
            preset.add_job(job);
        }
        for dependency in document.dependencies {
            preset.add_dependency(dependency);
        }
        for policy in document.retry_policies {
            if preset.retry_policies.contains_key(&policy.job_name) {
                return Err(PresetError::DuplicateRetryPolicy(policy.job_name));
            }
            preset.add_retry_policy(policy);
        }
        Ok(preset)
    }

    /// Human-readable differences from `self` to `other`, in a fixed order:
    /// metadata, jobs, dependencies, retry policies.
    pub fn diff(&self, other: &BatchFlowPreset) -> Vec<String> {
        let mut changes = Vec::new();
        if self.version != other.version {
            changes.push(format!("version: {} -> {}", self.version, other.version));
        }
        if self.name != other.name {
            changes.push(format!("name: {:?} -> {:?}", self.name, other.name));
        }
        if self.description != other.description {
            changes.push("description changed".to_string());
        }
        diff_maps("job", &self.jobs, &other.jobs, &mut changes);
        for removed in self.dependencies.difference(&other.dependencies) {
            changes.push(format!("dependency removed: {} -> {}", removed.from_job, removed.to_job));
        }
        for added in other.dependencies.difference(&self.dependencies) {
            changes.push(format!("dependency added: {} -> {}", added.from_job, added.to_job));
        }
        diff_maps("retry policy", &self.retry_policies, &other.retry_policies, &mut changes);
        changes
    }
}

fn diff_maps<V: PartialEq>(
    label: &str,
    before: &BTreeMap<String, V>,
    after: &BTreeMap<String, V>,
    changes: &mut Vec<String>,
) {
    for (name, old) in before {
        match after.get(name) {
            None => changes.push(format!("{label} removed: {name}")),
            Some(new) if new != old => changes.push(format!("{label} changed: {name}")),
            Some(_) => {}
        }
    }
    for name in after.keys() {
        if !before.contains_key(name) {
            changes.push(format!("{label} added: {name}"));
        }
    }
}
