//! Turning a validated preset into something the runner can execute.

use std::collections::BTreeMap;

use tracing::info;

use super::model::BatchFlowPreset;
use crate::domain::{ErrorCode, ErrorContext, ErrorList, ErrorSeverity, FlowError, JobId};
use crate::graph::{JobDependency, JobGraph, JobGraphBuilder, JobNode};
use crate::retry::RetryPolicy;

/// A compiled preset: the frozen graph, the name of every job, and the
/// retry policy of every job that declared one.
#[derive(Debug, Clone)]
pub struct WorkflowPlan {
    pub graph: JobGraph,
    pub job_ids: BTreeMap<String, JobId>,
    pub retry_policies: BTreeMap<JobId, RetryPolicy>,
}

impl WorkflowPlan {
    pub fn job_id(&self, name: &str) -> Option<JobId> {
        self.job_ids.get(name).copied()
    }

    pub fn job_name(&self, id: &JobId) -> Option<&str> {
        self.job_ids
            .iter()
            .find(|(_, candidate)| *candidate == id)
            .map(|(name, _)| name.as_str())
    }

    pub fn retry_policy_for<'a>(&'a self, id: &JobId, default: &'a RetryPolicy) -> &'a RetryPolicy {
        self.retry_policies.get(id).unwrap_or(default)
    }
}

impl BatchFlowPreset {
    /// Validate, then build the graph. Any validation error aborts the
    /// compile; the graph is never built from a partial preset.
    pub fn compile(&self) -> Result<WorkflowPlan, ErrorList> {
        self.validate().into_result()?;

        let mut builder = JobGraphBuilder::new();
        let mut job_ids = BTreeMap::new();
        for (name, job) in self.jobs() {
            let id = builder.add_node(JobNode::from_definition(&job.to_job_definition()));
            job_ids.insert(name.clone(), id);
        }
        for dep in self.dependencies() {
            // validate() proved both ends exist.
            if let (Some(from), Some(to)) = (job_ids.get(&dep.from_job), job_ids.get(&dep.to_job)) {
                builder.add_dependency(JobDependency::new(*from, *to));
            }
        }

        let graph = builder.finalize().map_err(|err| {
            ErrorList::single(
                FlowError::new(ErrorCode::ValidationFailed, ErrorSeverity::Error, err.to_string())
                    .with_context(ErrorContext::new("compile_preset", "dependencies")),
            )
        })?;

        let retry_policies = self
            .retry_policies()
            .iter()
            .filter_map(|(name, policy)| job_ids.get(name).map(|id| (*id, policy.to_runtime_policy())))
            .collect();

        info!(preset = self.name(), jobs = job_ids.len(), "preset compiled");
        Ok(WorkflowPlan {
            graph,
            job_ids,
            retry_policies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::model::{PresetDependency, PresetJobDefinition, PresetRetryPolicy};
    use crate::preset::version::PresetVersion;

    fn preset() -> BatchFlowPreset {
        let mut preset = BatchFlowPreset::new(PresetVersion::current(), "plan", "");
        preset.add_job(PresetJobDefinition::new("decode", "batchflow.passthrough", "noop", "{\"n\":1}"));
        preset.add_job(PresetJobDefinition::new("encode", "batchflow.passthrough", "noop", "{\"n\":2}"));
        preset.add_dependency(PresetDependency::new("decode", "encode"));
        preset.add_retry_policy(PresetRetryPolicy::new("encode", 3, 2));
        preset
    }

    #[test]
    fn compiles_graph_and_policies() {
        let plan = preset().compile().unwrap();
        let decode = plan.job_id("decode").unwrap();
        let encode = plan.job_id("encode").unwrap();

        assert_eq!(plan.graph.node_count(), 2);
        assert_eq!(plan.graph.get_dependencies(&encode), &[decode]);
        assert_eq!(plan.job_name(&encode), Some("encode"));
        assert_eq!(plan.retry_policies[&encode], RetryPolicy::retry_on_failure(3, 2));

        let fallback = RetryPolicy::no_retry();
        assert_eq!(plan.retry_policy_for(&decode, &fallback), &fallback);
    }

    #[test]
    fn job_ids_do_not_depend_on_names() {
        let plan = preset().compile().unwrap();
        let mut renamed = BatchFlowPreset::new(PresetVersion::current(), "other", "");
        renamed.add_job(PresetJobDefinition::new("x", "batchflow.passthrough", "noop", "{\"n\":1}"));
        let other = renamed.compile().unwrap();
        assert_eq!(other.job_id("x"), plan.job_id("decode"));
    }

    #[test]
    fn invalid_preset_does_not_compile() {
        let mut bad = preset();
        bad.add_dependency(PresetDependency::new("encode", "decode"));
        let errors = bad.compile().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.errors()[0].message.starts_with("dependency cycle"));
    }
}
