//! Runner: the orchestration loop.
//!
//! # Flow (one iteration)
//! 1. Batch = due retries, then ready jobs, each in `JobId` order, capped at
//!    `max_parallel_jobs`
//! 2. Start the new jobs one by one through the scheduler
//! 3. Execute the whole batch concurrently on spawned tokio tasks
//! 4. Apply results in `JobId` order: complete, or ask the decider and
//!    either defer a retry or fail the job
//! 5. Forward the new events to the sink
//!
//! Only step 3 is concurrent. Every clock advance happens on this task, so
//! the event order does not depend on which adapter finishes first.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::app::config::RunnerConfig;
use crate::app::registry::AdapterRegistry;
use crate::domain::{
    Decider, EventRecord, FailureCategory, JobId, JobResult, JobState, JobStatus, LogicalTick,
};
use crate::error::BatchFlowError;
use crate::graph::JobGraph;
use crate::observability::SchedulerCounts;
use crate::ports::EventSink;
use crate::preset::WorkflowPlan;
use crate::retry::{JobRetryState, RetryPolicy};
use crate::scheduler::BatchFlowScheduler;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error(transparent)]
    Core(#[from] BatchFlowError),
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub statuses: BTreeMap<JobId, JobStatus>,
    pub final_tick: LogicalTick,
    pub events: Vec<EventRecord>,
    /// Last adapter result per executed job.
    pub results: BTreeMap<JobId, JobResult>,
    /// Pending jobs that could never start.
    pub blocked: Vec<JobId>,
    pub counts: SchedulerCounts,
}

impl RunReport {
    /// Did every job complete?
    pub fn is_success(&self) -> bool {
        self.statuses.values().all(|s| s.state == JobState::Completed)
    }
}

pub struct Runner {
    registry: AdapterRegistry,
    config: RunnerConfig,
    decider: Arc<dyn Decider>,
}

impl Runner {
    pub(crate) fn new(
        registry: AdapterRegistry,
        config: RunnerConfig,
        decider: Arc<dyn Decider>,
    ) -> Self {
        Self {
            registry,
            config,
            decider,
        }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run a compiled workflow.
    pub async fn run_plan(
        &self,
        plan: &WorkflowPlan,
        sink: &mut dyn EventSink,
    ) -> Result<RunReport, RunnerError> {
        self.run(&plan.graph, &plan.retry_policies, sink).await
    }

    /// Drive `graph` to completion. Jobs without an entry in `policies` use
    /// the configured default policy.
    ///
    /// `retry_delay_ticks` orders a retry against other work; it is not a
    /// guaranteed gap. Logical time only advances with events, so once
    /// deferred retries are all that is left, the earliest of them run at the
    /// current tick even if their `earliest_retry_tick` lies ahead.
    ///
    /// A panicking adapter fails its own job with `EngineFailure`; the rest of
    /// the batch is still awaited and settled.
    pub async fn run(
        &self,
        graph: &JobGraph,
        policies: &BTreeMap<JobId, RetryPolicy>,
        sink: &mut dyn EventSink,
    ) -> Result<RunReport, RunnerError> {
        let mut scheduler = BatchFlowScheduler::new(graph);
        let mut retry_states: BTreeMap<JobId, JobRetryState> = BTreeMap::new();
        let mut deferred: BTreeMap<JobId, LogicalTick> = BTreeMap::new();
        let mut results: BTreeMap<JobId, JobResult> = BTreeMap::new();
        let mut emitted = 0usize;
        let parallelism = self.config.parallelism();

        info!(jobs = graph.node_count(), parallelism, "run started");

        loop {
            let now = scheduler.clock().current_tick();
            let ready = scheduler.next_ready_jobs();
            let mut retries: Vec<JobId> = deferred
                .iter()
                .filter(|(_, earliest)| **earliest <= now)
                .map(|(id, _)| *id)
                .collect();
            if retries.is_empty() && ready.is_empty() {
                // Logical time only moves with events, so an idle wait would
                // never end: run the earliest deferred retries now.
                let Some(earliest) = deferred.values().min().copied() else {
                    break;
                };
                retries = deferred
                    .iter()
                    .filter(|(_, t)| **t == earliest)
                    .map(|(id, _)| *id)
                    .collect();
            }

            let batch: Vec<(JobId, bool)> = retries
                .into_iter()
                .map(|id| (id, true))
                .chain(ready.into_iter().map(|id| (id, false)))
                .take(parallelism)
                .collect();

            let outcome = self
                .run_batch(
                    &mut scheduler,
                    &mut retry_states,
                    &mut deferred,
                    &mut results,
                    policies,
                    batch,
                )
                .await;
            // Events already on the clock reach the sink even when the batch
            // stopped on an error.
            let history = scheduler.clock().event_history();
            for record in &history[emitted..] {
                sink.emit(record);
            }
            emitted = history.len();
            outcome?;
        }

        let blocked = scheduler.blocked_jobs();
        if !blocked.is_empty() {
            warn!(count = blocked.len(), "jobs blocked by failed or missing dependencies");
        }
        let counts = scheduler.counts();
        let final_tick = scheduler.clock().current_tick();
        info!(final_tick, %counts, "run finished");

        Ok(RunReport {
            statuses: scheduler.get_all_statuses().clone(),
            final_tick,
            events: scheduler.clock().event_history().to_vec(),
            results,
            blocked,
            counts,
        })
    }

    /// Start, execute and settle one batch. `batch` holds `(job, is_retry)`.
    async fn run_batch(
        &self,
        scheduler: &mut BatchFlowScheduler<'_>,
        retry_states: &mut BTreeMap<JobId, JobRetryState>,
        deferred: &mut BTreeMap<JobId, LogicalTick>,
        results: &mut BTreeMap<JobId, JobResult>,
        policies: &BTreeMap<JobId, RetryPolicy>,
        batch: Vec<(JobId, bool)>,
    ) -> Result<(), BatchFlowError> {
        let graph = scheduler.graph();
        let mut handles = Vec::with_capacity(batch.len());
        for (job_id, is_retry) in batch {
            let node = graph
                .get_node(&job_id)
                .cloned()
                .ok_or(BatchFlowError::UnknownJob(job_id))?;
            if is_retry {
                deferred.remove(&job_id);
            } else {
                scheduler.start_job(job_id)?;
            }
            let tick = scheduler.clock().current_tick();
            retry_states.entry(job_id).or_default().record_attempt(tick);

            let adapter = self.registry.get(node.engine_name());
            debug!(job_id = %job_id.short(), engine = node.engine_name(), is_retry, "dispatching job");
            let handle = tokio::spawn(async move {
                match adapter {
                    Some(adapter) => adapter.execute(&node).await,
                    None => JobResult::invalid_input(format!(
                        "no adapter registered for engine {:?}",
                        node.engine_name()
                    )),
                }
            });
            handles.push((job_id, handle));
        }

        // Every handle is awaited. A panicking adapter fails its own job only.
        let mut outcomes: BTreeMap<JobId, JobResult> = BTreeMap::new();
        for (job_id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(err) => {
                    warn!(job_id = %job_id.short(), error = %err, "adapter task did not finish");
                    JobResult::engine_failure(format!("adapter task panicked: {err}"))
                }
            };
            outcomes.insert(job_id, result);
        }

        for (job_id, result) in outcomes {
            self.apply_result(scheduler, retry_states, deferred, policies, job_id, &result)?;
            results.insert(job_id, result);
        }
        Ok(())
    }

    fn apply_result(
        &self,
        scheduler: &mut BatchFlowScheduler<'_>,
        retry_states: &BTreeMap<JobId, JobRetryState>,
        deferred: &mut BTreeMap<JobId, LogicalTick>,
        policies: &BTreeMap<JobId, RetryPolicy>,
        job_id: JobId,
        result: &JobResult,
    ) -> Result<(), BatchFlowError> {
        if result.is_success() {
            scheduler.mark_completed(job_id)?;
            return Ok(());
        }

        let policy = policies
            .get(&job_id)
            .unwrap_or(&self.config.default_retry_policy);
        let retry_state = retry_states.get(&job_id).copied().unwrap_or_default();
        let now = scheduler.clock().current_tick();
        let decision = self.decider.decide(policy, &retry_state, result, now);
        scheduler.record_retry_decision(job_id, decision.reason)?;

        if decision.should_retry {
            warn!(
                job_id = %job_id.short(),
                attempt = retry_state.attempt_count,
                earliest = decision.earliest_retry_tick,
                "job failed, retry scheduled"
            );
            deferred.insert(job_id, decision.earliest_retry_tick);
        } else {
            let category = result
                .failure_category()
                .unwrap_or(FailureCategory::EngineError);
            warn!(
                job_id = %job_id.short(),
                attempts = retry_state.attempt_count,
                category = category.as_str(),
                message = %result.engine_message,
                "job failed"
            );
            scheduler.mark_failed(job_id, category)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::app::RunnerBuilder;
    use crate::domain::{BatchFlowEvent, EventKind, JobDefinition, RetryReason};
    use crate::graph::{JobDependency, JobGraphBuilder, JobNode};
    use crate::impls::PassthroughAdapter;
    use crate::ports::{ExecutionAdapter, NoopEventSink};
    use crate::replay::{BatchFlowReplayExecutor, ReplayLog};

    /// Fails the first `failures` calls, then succeeds.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ExecutionAdapter for Flaky {
        fn engine(&self) -> &'static str {
            "test.flaky"
        }

        fn adapter_id(&self) -> &'static str {
            "test.flaky.v1"
        }

        async fn execute(&self, _node: &JobNode) -> JobResult {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                JobResult::engine_failure("transient")
            } else {
                JobResult::success()
            }
        }
    }

    struct Boom;

    #[async_trait]
    impl ExecutionAdapter for Boom {
        fn engine(&self) -> &'static str {
            "test.boom"
        }

        fn adapter_id(&self) -> &'static str {
            "test.boom.v1"
        }

        async fn execute(&self, _node: &JobNode) -> JobResult {
            panic!("adapter blew up");
        }
    }

    fn passthrough(name: &str) -> JobDefinition {
        JobDefinition::new("batchflow.passthrough", "noop", format!("{{\"name\":\"{name}\"}}"), vec![], vec![])
    }

    fn linear(defs: &[JobDefinition]) -> (JobGraph, Vec<JobId>) {
        let mut builder = JobGraphBuilder::new();
        let ids: Vec<JobId> = defs.iter().map(|d| builder.add_job_definition(d)).collect();
        for pair in ids.windows(2) {
            builder.add_dependency(JobDependency::new(pair[0], pair[1]));
        }
        (builder.finalize().unwrap(), ids)
    }

    fn runner() -> Runner {
        RunnerBuilder::new().with_builtin_adapters().build().unwrap()
    }

    #[tokio::test]
    async fn linear_workflow_completes_in_order() {
        let defs: Vec<_> = ["a", "b", "c"].iter().map(|n| passthrough(n)).collect();
        let (graph, ids) = linear(&defs);
        let mut log = ReplayLog::new();

        let report = runner().run(&graph, &BTreeMap::new(), &mut log).await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.final_tick, 6);
        assert_eq!(log.events(), report.events.as_slice());
        let started: Vec<JobId> = report
            .events
            .iter()
            .filter(|e| e.kind() == EventKind::JobStarted)
            .map(|e| e.job_id)
            .collect();
        assert_eq!(started, ids);
    }

    #[tokio::test]
    async fn retry_then_success() {
        let mut builder = JobGraphBuilder::new();
        let id = builder.add_node(JobNode::with_id(JobId::from_digest([1; 32]), "test.flaky", "op", b"{}".to_vec()));
        let graph = builder.finalize().unwrap();
        let runner = RunnerBuilder::new().register(Flaky::new(1)).unwrap().build().unwrap();
        let policies = BTreeMap::from([(id, RetryPolicy::retry_on_failure(2, 0))]);

        let report = runner.run(&graph, &policies, &mut NoopEventSink).await.unwrap();

        let events: Vec<BatchFlowEvent> = report.events.iter().map(|e| e.event).collect();
        assert_eq!(
            events,
            vec![
                BatchFlowEvent::JobStarted,
                BatchFlowEvent::RetryDecision(RetryReason::PolicyAllowed),
                BatchFlowEvent::JobCompleted,
            ]
        );
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn retries_stop_at_max_attempts() {
        let mut builder = JobGraphBuilder::new();
        let id = builder.add_node(JobNode::with_id(JobId::from_digest([1; 32]), "test.flaky", "op", b"{}".to_vec()));
        let graph = builder.finalize().unwrap();
        let runner = RunnerBuilder::new().register(Flaky::new(10)).unwrap().build().unwrap();
        let policies = BTreeMap::from([(id, RetryPolicy::retry_on_failure(2, 3))]);

        let report = runner.run(&graph, &policies, &mut NoopEventSink).await.unwrap();

        let decisions: Vec<_> = report
            .events
            .iter()
            .filter_map(|e| match e.event {
                BatchFlowEvent::RetryDecision(reason) => Some(reason),
                _ => None,
            })
            .collect();
        assert_eq!(decisions, vec![RetryReason::PolicyAllowed, RetryReason::PolicyDenied]);
        // Nothing else is runnable, so the retry runs at tick 2 although the
        // delay put its earliest tick at 4.
        assert_eq!(report.final_tick, 4);
        let status = report.statuses[&id];
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.failure, Some(FailureCategory::EngineError));
    }

    #[tokio::test]
    async fn missing_adapter_fails_validation_and_blocks_dependents() {
        let defs = vec![
            JobDefinition::new("engine.unknown", "noop", "{}", vec![], vec![]),
            passthrough("after"),
        ];
        let (graph, ids) = linear(&defs);

        let report = runner().run(&graph, &BTreeMap::new(), &mut NoopEventSink).await.unwrap();

        assert_eq!(report.statuses[&ids[0]].failure, Some(FailureCategory::ValidationFailed));
        assert_eq!(report.blocked, vec![ids[1]]);
        assert_eq!(report.counts, SchedulerCounts { pending: 1, running: 0, completed: 0, failed: 1 });
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn same_inputs_same_log_and_replayable() {
        let defs: Vec<_> = ["p", "q", "r", "s", "t"].iter().map(|n| passthrough(n)).collect();
        let mut builder = JobGraphBuilder::new();
        for def in &defs {
            builder.add_job_definition(def);
        }
        let graph = builder.finalize().unwrap();

        let first = runner().run(&graph, &BTreeMap::new(), &mut NoopEventSink).await.unwrap();
        let second = runner().run(&graph, &BTreeMap::new(), &mut NoopEventSink).await.unwrap();
        assert_eq!(first, second);

        let replay = BatchFlowReplayExecutor::replay(&graph, &first.events).unwrap();
        assert!(replay.verify_replay_correctness(&first.statuses));
        assert_eq!(replay.final_tick(), first.final_tick);
    }

    #[tokio::test]
    async fn parallelism_does_not_change_outcome() {
        let defs: Vec<_> = ["a", "b", "c", "d"].iter().map(|n| passthrough(n)).collect();
        let mut builder = JobGraphBuilder::new();
        let ids: Vec<_> = defs.iter().map(|d| builder.add_job_definition(d)).collect();
        builder.add_dependency(JobDependency::new(ids[0], ids[3]));
        let graph = builder.finalize().unwrap();

        let mut states = Vec::new();
        for parallel in [1, 2, 8] {
            let runner = RunnerBuilder::new()
                .register(PassthroughAdapter)
                .unwrap()
                .config(RunnerConfig::default().with_max_parallel_jobs(parallel))
                .build()
                .unwrap();
            let report = runner.run(&graph, &BTreeMap::new(), &mut NoopEventSink).await.unwrap();
            assert_eq!(report.final_tick, 8);
            states.push(report.statuses.values().map(|s| s.state).collect::<Vec<_>>());
        }
        assert!(states.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn panicking_adapter_fails_only_its_own_job() {
        let mut builder = JobGraphBuilder::new();
        let boom = builder.add_node(JobNode::with_id(JobId::from_digest([1; 32]), "test.boom", "op", b"{}".to_vec()));
        let calm = builder.add_job_definition(&passthrough("calm"));
        let graph = builder.finalize().unwrap();
        let runner = RunnerBuilder::new()
            .register(Boom)
            .unwrap()
            .register(PassthroughAdapter)
            .unwrap()
            .config(RunnerConfig::default().with_max_parallel_jobs(2))
            .build()
            .unwrap();
        let mut log = ReplayLog::new();

        let report = runner.run(&graph, &BTreeMap::new(), &mut log).await.unwrap();

        assert_eq!(report.statuses[&boom].state, JobState::Failed);
        assert_eq!(report.statuses[&boom].failure, Some(FailureCategory::EngineError));
        assert!(report.results[&boom].engine_message.starts_with("adapter task panicked"));
        assert_eq!(report.statuses[&calm].state, JobState::Completed);
        assert_eq!(log.events(), report.events.as_slice());

        let replay = BatchFlowReplayExecutor::replay(&graph, log.events()).unwrap();
        assert!(replay.verify_replay_correctness(&report.statuses));
        assert_eq!(replay.final_tick(), report.final_tick);
    }
}
