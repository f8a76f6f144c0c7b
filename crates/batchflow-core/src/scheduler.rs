//! Scheduler: per-job lifecycle bound to one finalized graph.
//!
//! The scheduler owns the logical clock of its run. Live transitions advance
//! it exactly once; the `replay_*` variants take the tick from a recorded
//! event and never touch it.
//!
//! State machine:
//! - Pending -> Running (`start_job`)
//! - Running -> Completed (`mark_completed`)
//! - Running -> Failed (`mark_failed`)
//!
//! Anything else is a contract violation and leaves state untouched.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::clock::LogicalClock;
use crate::domain::{FailureCategory, JobId, JobState, JobStatus, LogicalTick, RetryReason};
use crate::error::BatchFlowError;
use crate::graph::JobGraph;
use crate::observability::SchedulerCounts;

#[derive(Debug, Clone)]
pub struct BatchFlowScheduler<'g> {
    graph: &'g JobGraph,
    clock: LogicalClock,
    statuses: BTreeMap<JobId, JobStatus>,
}

impl<'g> BatchFlowScheduler<'g> {
    /// Scheduler with a fresh clock; every node starts Pending.
    pub fn new(graph: &'g JobGraph) -> Self {
        Self::with_clock(graph, LogicalClock::new())
    }

    /// Scheduler driving an existing clock (used by replay).
    pub fn with_clock(graph: &'g JobGraph, clock: LogicalClock) -> Self {
        let statuses = graph
            .job_ids()
            .map(|id| (id, JobStatus::pending()))
            .collect();
        Self {
            graph,
            clock,
            statuses,
        }
    }

    pub fn graph(&self) -> &'g JobGraph {
        self.graph
    }

    pub fn clock(&self) -> &LogicalClock {
        &self.clock
    }

    pub fn into_clock(self) -> LogicalClock {
        self.clock
    }

    /// Pending jobs whose dependencies are all Completed, in `JobId` order.
    pub fn next_ready_jobs(&self) -> Vec<JobId> {
        self.statuses
            .iter()
            .filter(|(id, status)| {
                status.state == JobState::Pending && self.dependencies_satisfied(id)
            })
            .map(|(id, _)| *id)
            .collect()
    }

    fn dependencies_satisfied(&self, id: &JobId) -> bool {
        self.graph.get_dependencies(id).iter().all(|dep| {
            self.statuses
                .get(dep)
                .is_some_and(|s| s.state == JobState::Completed)
        })
    }

    pub fn start_job(&mut self, job_id: JobId) -> Result<LogicalTick, BatchFlowError> {
        self.check(job_id, "start", JobState::Pending)?;
        let tick = self.clock.on_job_started(job_id);
        self.apply_start(job_id, tick);
        Ok(tick)
    }

    pub fn mark_completed(&mut self, job_id: JobId) -> Result<LogicalTick, BatchFlowError> {
        self.check(job_id, "complete", JobState::Running)?;
        let tick = self.clock.on_job_completed(job_id);
        self.apply_finish(job_id, JobState::Completed, None, tick);
        Ok(tick)
    }

    pub fn mark_failed(
        &mut self,
        job_id: JobId,
        category: FailureCategory,
    ) -> Result<LogicalTick, BatchFlowError> {
        self.check(job_id, "fail", JobState::Running)?;
        let tick = self.clock.on_job_failed(job_id, category);
        self.apply_finish(job_id, JobState::Failed, Some(category), tick);
        Ok(tick)
    }

    /// Record a retry decision for a job. Advances the clock; the job's
    /// status is unchanged.
    pub fn record_retry_decision(
        &mut self,
        job_id: JobId,
        reason: RetryReason,
    ) -> Result<LogicalTick, BatchFlowError> {
        if !self.statuses.contains_key(&job_id) {
            return Err(BatchFlowError::UnknownJob(job_id));
        }
        Ok(self.clock.on_retry_decision(job_id, reason))
    }

    pub fn replay_start_job(
        &mut self,
        job_id: JobId,
        tick: LogicalTick,
    ) -> Result<(), BatchFlowError> {
        self.check(job_id, "start", JobState::Pending)?;
        self.apply_start(job_id, tick);
        Ok(())
    }

    pub fn replay_mark_completed(
        &mut self,
        job_id: JobId,
        tick: LogicalTick,
    ) -> Result<(), BatchFlowError> {
        self.check(job_id, "complete", JobState::Running)?;
        self.apply_finish(job_id, JobState::Completed, None, tick);
        Ok(())
    }

    pub fn replay_mark_failed(
        &mut self,
        job_id: JobId,
        category: FailureCategory,
        tick: LogicalTick,
    ) -> Result<(), BatchFlowError> {
        self.check(job_id, "fail", JobState::Running)?;
        self.apply_finish(job_id, JobState::Failed, Some(category), tick);
        Ok(())
    }

    fn check(
        &self,
        job_id: JobId,
        operation: &'static str,
        expected: JobState,
    ) -> Result<(), BatchFlowError> {
        let status = self
            .statuses
            .get(&job_id)
            .ok_or(BatchFlowError::UnknownJob(job_id))?;
        if status.state != expected {
            return Err(BatchFlowError::InvalidTransition {
                job_id,
                operation,
                expected,
                actual: status.state,
            });
        }
        Ok(())
    }

    fn apply_start(&mut self, job_id: JobId, tick: LogicalTick) {
        if let Some(status) = self.statuses.get_mut(&job_id) {
            status.state = JobState::Running;
            status.started_tick = tick;
            debug!(job_id = %job_id.short(), tick, "job started");
        }
    }

    fn apply_finish(
        &mut self,
        job_id: JobId,
        state: JobState,
        failure: Option<FailureCategory>,
        tick: LogicalTick,
    ) {
        if let Some(status) = self.statuses.get_mut(&job_id) {
            status.state = state;
            status.finished_tick = tick;
            status.failure = failure;
            debug!(job_id = %job_id.short(), tick, state = %state, "job finished");
        }
    }

    pub fn get_job_status(&self, job_id: &JobId) -> Result<&JobStatus, BatchFlowError> {
        self.statuses
            .get(job_id)
            .ok_or(BatchFlowError::UnknownJob(*job_id))
    }

    /// Every job's status, ordered by `JobId`.
    pub fn get_all_statuses(&self) -> &BTreeMap<JobId, JobStatus> {
        &self.statuses
    }

    pub fn has_running_jobs(&self) -> bool {
        self.statuses.values().any(|s| s.state == JobState::Running)
    }

    pub fn all_jobs_finished(&self) -> bool {
        self.statuses.values().all(|s| s.state.is_terminal())
    }

    fn count(&self, state: JobState) -> usize {
        self.statuses.values().filter(|s| s.state == state).count()
    }

    pub fn count_pending(&self) -> usize {
        self.count(JobState::Pending)
    }

    pub fn count_running(&self) -> usize {
        self.count(JobState::Running)
    }

    pub fn count_completed(&self) -> usize {
        self.count(JobState::Completed)
    }

    pub fn count_failed(&self) -> usize {
        self.count(JobState::Failed)
    }

    pub fn counts(&self) -> SchedulerCounts {
        SchedulerCounts {
            pending: self.count_pending(),
            running: self.count_running(),
            completed: self.count_completed(),
            failed: self.count_failed(),
        }
    }

    /// Pending jobs that can never become ready: a dependency Failed, is not
    /// a node of the graph, or is itself blocked. Reported in `JobId` order.
    pub fn blocked_jobs(&self) -> Vec<JobId> {
        let mut blocked: BTreeSet<JobId> = BTreeSet::new();
        loop {
            let mut changed = false;
            for (id, status) in &self.statuses {
                if status.state != JobState::Pending || blocked.contains(id) {
                    continue;
                }
                let doomed = self.graph.get_dependencies(id).iter().any(|dep| {
                    blocked.contains(dep)
                        || self
                            .statuses
                            .get(dep)
                            .is_none_or(|s| s.state == JobState::Failed)
                });
                if doomed {
                    blocked.insert(*id);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        blocked.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{JobDependency, JobGraphBuilder, JobNode};

    fn id(n: u8) -> JobId {
        JobId::from_digest([n; 32])
    }

    fn graph(nodes: &[u8], edges: &[(u8, u8)]) -> JobGraph {
        let mut builder = JobGraphBuilder::new();
        for n in nodes {
            builder.add_node(JobNode::with_id(id(*n), "batchflow.passthrough", "noop", b"{}".to_vec()));
        }
        for (from, to) in edges {
            builder.add_dependency(JobDependency::new(id(*from), id(*to)));
        }
        builder.finalize().unwrap()
    }

    #[test]
    fn readiness_follows_completion() {
        let g = graph(&[1, 2], &[(1, 2)]);
        let mut s = BatchFlowScheduler::new(&g);

        assert_eq!(s.next_ready_jobs(), vec![id(1)]);
        s.start_job(id(1)).unwrap();
        assert!(s.next_ready_jobs().is_empty());
        s.mark_completed(id(1)).unwrap();
        assert_eq!(s.next_ready_jobs(), vec![id(2)]);
    }

    #[test]
    fn ready_jobs_are_sorted() {
        let g = graph(&[9, 3, 5], &[]);
        let s = BatchFlowScheduler::new(&g);
        assert_eq!(s.next_ready_jobs(), vec![id(3), id(5), id(9)]);
    }

    #[test]
    fn transitions_record_ticks() {
        let g = graph(&[1, 2], &[]);
        let mut s = BatchFlowScheduler::new(&g);

        assert_eq!(s.start_job(id(1)).unwrap(), 1);
        assert_eq!(s.start_job(id(2)).unwrap(), 2);
        assert_eq!(s.mark_failed(id(2), FailureCategory::EngineError).unwrap(), 3);
        assert_eq!(s.mark_completed(id(1)).unwrap(), 4);

        let one = s.get_job_status(&id(1)).unwrap();
        assert_eq!((one.state, one.started_tick, one.finished_tick), (JobState::Completed, 1, 4));
        let two = s.get_job_status(&id(2)).unwrap();
        assert_eq!(two.failure, Some(FailureCategory::EngineError));
        assert!(s.all_jobs_finished());
        assert_eq!(s.clock().current_tick(), 4);
    }

    #[test]
    fn illegal_transitions_are_rejected_without_side_effects() {
        let g = graph(&[1], &[]);
        let mut s = BatchFlowScheduler::new(&g);

        let err = s.mark_completed(id(1)).unwrap_err();
        assert_eq!(
            err,
            BatchFlowError::InvalidTransition {
                job_id: id(1),
                operation: "complete",
                expected: JobState::Running,
                actual: JobState::Pending,
            }
        );
        s.start_job(id(1)).unwrap();
        assert!(s.start_job(id(1)).is_err());
        assert_eq!(s.clock().current_tick(), 1);
    }

    #[test]
    fn unknown_job_is_an_error() {
        let g = graph(&[1], &[]);
        let mut s = BatchFlowScheduler::new(&g);
        assert_eq!(s.start_job(id(7)), Err(BatchFlowError::UnknownJob(id(7))));
        assert!(s.get_job_status(&id(7)).is_err());
        assert!(s.record_retry_decision(id(7), RetryReason::PolicyDenied).is_err());
    }

    #[test]
    fn retry_decision_only_moves_the_clock() {
        let g = graph(&[1], &[]);
        let mut s = BatchFlowScheduler::new(&g);
        s.start_job(id(1)).unwrap();
        let before = *s.get_job_status(&id(1)).unwrap();

        assert_eq!(s.record_retry_decision(id(1), RetryReason::PolicyAllowed).unwrap(), 2);
        assert_eq!(*s.get_job_status(&id(1)).unwrap(), before);
    }

    #[test]
    fn replay_transitions_leave_clock_alone() {
        let g = graph(&[1], &[]);
        let mut s = BatchFlowScheduler::new(&g);
        s.replay_start_job(id(1), 10).unwrap();
        s.replay_mark_failed(id(1), FailureCategory::ValidationFailed, 11).unwrap();

        assert_eq!(s.clock().current_tick(), 0);
        let status = s.get_job_status(&id(1)).unwrap();
        assert_eq!((status.started_tick, status.finished_tick), (10, 11));
        assert!(s.replay_mark_completed(id(1), 12).is_err());
    }

    #[test]
    fn failed_dependency_blocks_transitively() {
        let g = graph(&[1, 2, 3, 4], &[(1, 2), (2, 3), (9, 4)]);
        let mut s = BatchFlowScheduler::new(&g);
        s.start_job(id(1)).unwrap();
        s.mark_failed(id(1), FailureCategory::EngineError).unwrap();

        assert!(s.next_ready_jobs().is_empty());
        assert_eq!(s.blocked_jobs(), vec![id(2), id(3), id(4)]);
        assert_eq!(
            s.counts(),
            SchedulerCounts { pending: 3, running: 0, completed: 0, failed: 1 }
        );
        assert!(!s.has_running_jobs());
        assert!(!s.all_jobs_finished());
    }
}
