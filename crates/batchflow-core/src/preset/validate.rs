//! Structural checks on a preset before it is compiled.
//!
//! Every problem is reported, not just the first one. The result is an
//! `ErrorList`, so the report is ordered the same way on every run.

use std::collections::{BTreeMap, BTreeSet};

use super::model::{BatchFlowPreset, PresetJobDefinition};
use super::version::PresetVersion;
use crate::domain::{ArtifactId, ErrorCode, ErrorContext, ErrorList, ErrorSeverity, FlowError, JobId};
use crate::retry::RetryableState;

const OPERATION: &str = "validate_preset";

fn invalid(section: &str, message: String) -> FlowError {
    FlowError::new(ErrorCode::ValidationFailed, ErrorSeverity::Error, message)
        .with_context(ErrorContext::new(OPERATION, section))
}

impl BatchFlowPreset {
    /// Collect every structural problem of this preset.
    pub fn validate(&self) -> ErrorList {
        let mut errors = ErrorList::new();
        validate_header(self, &mut errors);
        validate_jobs(self, &mut errors);
        validate_dependencies(self, &mut errors);
        validate_retry_policies(self, &mut errors);
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

fn validate_header(preset: &BatchFlowPreset, errors: &mut ErrorList) {
    let current = PresetVersion::current();
    if !preset.version().is_compatible_with(&current) {
        errors.push(
            FlowError::new(
                ErrorCode::ValidationFailed,
                ErrorSeverity::Error,
                format!("unsupported preset version {} (expected {}.x.x)", preset.version(), current.major),
            )
            .with_context(ErrorContext::new(OPERATION, "version").with_param("version", preset.version().to_string())),
        );
    }
    if preset.name().trim().is_empty() {
        errors.push(invalid("name", "preset name is empty".to_string()));
    }
}

fn job_error(job: &PresetJobDefinition, message: String) -> FlowError {
    FlowError::new(ErrorCode::ValidationFailed, ErrorSeverity::Error, message)
        .with_context(ErrorContext::new(OPERATION, "jobs").with_param("job_name", job.job_name.clone()))
}

fn validate_jobs(preset: &BatchFlowPreset, errors: &mut ErrorList) {
    // JobId -> first job name that produced it.
    let mut identities: BTreeMap<JobId, &str> = BTreeMap::new();

    for job in preset.jobs().values() {
        if job.job_name.trim().is_empty() {
            errors.push(job_error(job, "job name is empty".to_string()));
        }
        for (field, value) in [
            ("engine_identifier", &job.engine_identifier),
            ("api_operation", &job.api_operation),
        ] {
            if value.is_empty() {
                errors.push(job_error(job, format!("{field} is empty")));
            } else if value.contains('|') {
                errors.push(job_error(job, format!("{field} {value:?} contains '|'")));
            }
        }
        for artifact in job.input_artifacts.iter().chain(&job.output_artifacts) {
            if artifact.is_empty() || ArtifactId::new(artifact.as_str()).has_reserved_chars() {
                errors.push(job_error(job, format!("artifact id {artifact:?} is empty or contains a reserved character")));
            }
        }

        let id = JobId::from(&job.to_job_definition());
        if let Some(first) = identities.get(&id) {
            errors.push(job_error(
                job,
                format!("job {:?} has the same definition as {:?} ({})", job.job_name, first, id.short()),
            ));
        } else {
            identities.insert(id, job.job_name.as_str());
        }
    }
}

fn validate_dependencies(preset: &BatchFlowPreset, errors: &mut ErrorList) {
    let jobs = preset.jobs();
    for dep in preset.dependencies() {
        let context = || {
            ErrorContext::new(OPERATION, "dependencies")
                .with_param("from_job", dep.from_job.clone())
                .with_param("to_job", dep.to_job.clone())
        };
        for name in [&dep.from_job, &dep.to_job] {
            if !jobs.contains_key(name) {
                errors.push(
                    FlowError::new(
                        ErrorCode::ValidationFailed,
                        ErrorSeverity::Error,
                        format!("dependency references unknown job {name:?}"),
                    )
                    .with_context(context()),
                );
            }
        }
        if dep.from_job == dep.to_job {
            errors.push(
                FlowError::new(
                    ErrorCode::ValidationFailed,
                    ErrorSeverity::Error,
                    format!("job {:?} depends on itself", dep.from_job),
                )
                .with_context(context()),
            );
        }
    }

    let cyclic = jobs_on_cycles(preset);
    if !cyclic.is_empty() {
        let names: Vec<&str> = cyclic.iter().map(String::as_str).collect();
        errors.push(
            FlowError::new(
                ErrorCode::ValidationFailed,
                ErrorSeverity::Error,
                format!("dependency cycle among jobs [{}]", names.join(",")),
            )
            .with_context(ErrorContext::new(OPERATION, "dependencies")),
        );
    }
}

/// Jobs that can reach themselves through dependency edges. Jobs that only
/// sit upstream or downstream of a cycle are not included. Self-dependencies
/// are reported separately and skipped here.
fn jobs_on_cycles(preset: &BatchFlowPreset) -> BTreeSet<String> {
    let jobs = preset.jobs();
    let mut outgoing: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for dep in preset.dependencies() {
        let (from, to) = (dep.from_job.as_str(), dep.to_job.as_str());
        if from == to || !jobs.contains_key(from) || !jobs.contains_key(to) {
            continue;
        }
        outgoing.entry(from).or_default().push(to);
    }

    jobs.keys()
        .filter(|name| reaches_itself(name, &outgoing))
        .cloned()
        .collect()
}

fn reaches_itself(start: &str, outgoing: &BTreeMap<&str, Vec<&str>>) -> bool {
    let successors = |name: &str| outgoing.get(name).map(Vec::as_slice).unwrap_or(&[]).to_vec();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut stack = successors(start);
    while let Some(name) = stack.pop() {
        if name == start {
            return true;
        }
        if seen.insert(name) {
            stack.extend(successors(name));
        }
    }
    false
}

fn validate_retry_policies(preset: &BatchFlowPreset, errors: &mut ErrorList) {
    for (name, policy) in preset.retry_policies() {
        let context = || ErrorContext::new(OPERATION, "retry_policies").with_param("job_name", name.clone());
        if !preset.jobs().contains_key(name) {
            errors.push(
                FlowError::new(
                    ErrorCode::ValidationFailed,
                    ErrorSeverity::Error,
                    format!("retry policy for unknown job {name:?}"),
                )
                .with_context(context()),
            );
        }
        if policy.max_attempts == 0 {
            errors.push(
                FlowError::new(ErrorCode::ValidationFailed, ErrorSeverity::Error, "max_attempts must be at least 1")
                    .with_context(context()),
            );
        }
        for state in &policy.retry_on_states {
            if state.parse::<RetryableState>().is_err() {
                errors.push(
                    FlowError::new(
                        ErrorCode::ValidationFailed,
                        ErrorSeverity::Error,
                        format!("unknown retry state {state:?}"),
                    )
                    .with_context(context()),
                );
            }
        }
    }
}
