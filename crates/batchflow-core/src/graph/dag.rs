//! Finalized, immutable job graph.
//!
//! Design:
//! - Forward index: job -> jobs it waits for (`get_dependencies`)
//! - Reverse index: job -> jobs waiting for it (`get_dependents`)
//! - Both are built once from the same edge set and never change.

use std::collections::{BTreeMap, BTreeSet};

use super::node::{JobDependency, JobNode};
use crate::domain::JobId;

/// An acyclic job graph. Only `JobGraphBuilder::finalize` creates one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobGraph {
    nodes: BTreeMap<JobId, JobNode>,
    dependencies: Vec<JobDependency>,
    /// to -> [from]
    dependency_map: BTreeMap<JobId, Vec<JobId>>,
    /// from -> [to]
    dependent_map: BTreeMap<JobId, Vec<JobId>>,
}

impl JobGraph {
    pub(super) fn from_parts(
        nodes: BTreeMap<JobId, JobNode>,
        dependencies: BTreeSet<JobDependency>,
    ) -> Self {
        let mut dependency_map: BTreeMap<JobId, Vec<JobId>> = BTreeMap::new();
        let mut dependent_map: BTreeMap<JobId, Vec<JobId>> = BTreeMap::new();
        // BTreeSet iterates in (from, to) order, so every list below is sorted.
        for dep in &dependencies {
            dependent_map.entry(dep.from).or_default().push(dep.to);
            dependency_map.entry(dep.to).or_default().push(dep.from);
        }
        for list in dependency_map.values_mut() {
            list.sort();
        }
        Self {
            nodes,
            dependencies: dependencies.into_iter().collect(),
            dependency_map,
            dependent_map,
        }
    }

    /// Nodes in `JobId` order.
    pub fn nodes(&self) -> impl Iterator<Item = &JobNode> {
        self.nodes.values()
    }

    /// Dependencies in `(from, to)` order.
    pub fn dependencies(&self) -> &[JobDependency] {
        &self.dependencies
    }

    /// Jobs that must complete before `id` may start, in `JobId` order.
    pub fn get_dependencies(&self, id: &JobId) -> &[JobId] {
        self.dependency_map.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Jobs waiting for `id`, in `JobId` order.
    pub fn get_dependents(&self, id: &JobId) -> &[JobId] {
        self.dependent_map.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_node(&self, id: &JobId) -> Option<&JobNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn job_ids(&self) -> impl Iterator<Item = JobId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
