//! Mutable construction phase of a job graph.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use super::dag::JobGraph;
use super::node::{JobDependency, JobNode};
use crate::domain::{JobDefinition, JobId};
use crate::error::BatchFlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not seen yet.
    White,
    /// On the current DFS path.
    Gray,
    /// Fully explored.
    Black,
}

/// Collects nodes and dependencies, then proves acyclicity in `finalize`.
///
/// Storage is ordered and set-like: inserting the same node or edge twice is
/// a no-op, and the order of `add_*` calls never shows in the result.
#[derive(Debug, Clone, Default)]
pub struct JobGraphBuilder {
    nodes: BTreeMap<JobId, JobNode>,
    dependencies: BTreeSet<JobDependency>,
}

impl JobGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. A node whose id is already present is ignored.
    pub fn add_node(&mut self, node: JobNode) -> JobId {
        let id = node.id();
        self.nodes.entry(id).or_insert(node);
        id
    }

    /// Add a job from its definition and return its computed id.
    pub fn add_job_definition(&mut self, definition: &JobDefinition) -> JobId {
        self.add_node(JobNode::from_definition(definition))
    }

    /// Declare that `dependency.from` must complete before `dependency.to`.
    ///
    /// Endpoints are not required to be nodes; a dangling endpoint just never
    /// becomes satisfied.
    pub fn add_dependency(&mut self, dependency: JobDependency) {
        self.dependencies.insert(dependency);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Check for cycles and freeze the graph.
    pub fn finalize(self) -> Result<JobGraph, BatchFlowError> {
        if let Some(cycle) = self.find_cycle() {
            debug!(length = cycle.len().saturating_sub(1), "dependency cycle rejected");
            return Err(BatchFlowError::CycleDetected { cycle });
        }
        info!(
            nodes = self.nodes.len(),
            dependencies = self.dependencies.len(),
            "job graph finalized"
        );
        Ok(JobGraph::from_parts(self.nodes, self.dependencies))
    }

    /// Three-color DFS over every id that is a node or an edge endpoint.
    /// Returns the cycle as a path that starts and ends on the same id.
    fn find_cycle(&self) -> Option<Vec<JobId>> {
        let mut edges: BTreeMap<JobId, Vec<JobId>> = BTreeMap::new();
        let mut color: BTreeMap<JobId, Color> = self
            .nodes
            .keys()
            .map(|id| (*id, Color::White))
            .collect();
        for dep in &self.dependencies {
            edges.entry(dep.from).or_default().push(dep.to);
            color.entry(dep.from).or_insert(Color::White);
            color.entry(dep.to).or_insert(Color::White);
        }

        let roots: Vec<JobId> = color.keys().copied().collect();
        for root in roots {
            if color.get(&root) != Some(&Color::White) {
                continue;
            }
            color.insert(root, Color::Gray);
            let mut stack: Vec<(JobId, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let children = edges.get(&node).map(Vec::as_slice).unwrap_or(&[]);
                if let Some(&child) = children.get(frame.1) {
                    frame.1 += 1;
                    match color.get(&child).copied().unwrap_or(Color::White) {
                        Color::White => {
                            color.insert(child, Color::Gray);
                            stack.push((child, 0));
                        }
                        Color::Gray => {
                            let start = stack
                                .iter()
                                .position(|(id, _)| *id == child)
                                .unwrap_or(0);
                            let mut cycle: Vec<JobId> =
                                stack[start..].iter().map(|(id, _)| *id).collect();
                            cycle.push(child);
                            return Some(cycle);
                        }
                        Color::Black => {}
                    }
                } else {
                    color.insert(node, Color::Black);
                    stack.pop();
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn id(n: u8) -> JobId {
        JobId::from_digest([n; 32])
    }

    fn node(n: u8) -> JobNode {
        JobNode::with_id(id(n), "batchflow.passthrough", "noop", b"{}".to_vec())
    }

    fn build(nodes: &[u8], edges: &[(u8, u8)]) -> Result<JobGraph, BatchFlowError> {
        let mut builder = JobGraphBuilder::new();
        for n in nodes {
            builder.add_node(node(*n));
        }
        for (from, to) in edges {
            builder.add_dependency(JobDependency::new(id(*from), id(*to)));
        }
        builder.finalize()
    }

    #[rstest]
    #[case::self_loop(&[(1, 1)], vec![1, 1])]
    #[case::two_cycle(&[(1, 2), (2, 1)], vec![1, 2, 1])]
    #[case::three_cycle(&[(1, 2), (2, 3), (3, 1)], vec![1, 2, 3, 1])]
    #[case::cycle_behind_tail(&[(1, 2), (2, 3), (3, 2)], vec![2, 3, 2])]
    fn cycles_are_rejected_with_path(#[case] edges: &[(u8, u8)], #[case] expected: Vec<u8>) {
        let err = build(&[1, 2, 3], edges).unwrap_err();
        let expected: Vec<JobId> = expected.into_iter().map(id).collect();
        assert_eq!(err, BatchFlowError::CycleDetected { cycle: expected });
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::chain(&[(1, 2), (2, 3)])]
    #[case::diamond(&[(1, 2), (1, 3), (2, 4), (3, 4)])]
    #[case::forest(&[(1, 2), (3, 4)])]
    fn acyclic_graphs_finalize(#[case] edges: &[(u8, u8)]) {
        assert!(build(&[1, 2, 3, 4], edges).is_ok());
    }

    #[test]
    fn cycle_through_unknown_ids_is_still_found() {
        let err = build(&[], &[(8, 9), (9, 8)]).unwrap_err();
        assert!(matches!(err, BatchFlowError::CycleDetected { .. }));
    }

    #[test]
    fn duplicates_collapse() {
        let mut builder = JobGraphBuilder::new();
        builder.add_node(node(1));
        builder.add_node(node(1));
        builder.add_node(node(2));
        builder.add_dependency(JobDependency::new(id(1), id(2)));
        builder.add_dependency(JobDependency::new(id(1), id(2)));
        assert_eq!(builder.node_count(), 2);
        assert_eq!(builder.dependency_count(), 1);
    }

    #[test]
    fn add_job_definition_returns_computed_id() {
        let def = JobDefinition::new("engine.audio", "prepare", "{}", vec![], vec![]);
        let mut builder = JobGraphBuilder::new();
        assert_eq!(builder.add_job_definition(&def), JobId::from(&def));
    }
}
