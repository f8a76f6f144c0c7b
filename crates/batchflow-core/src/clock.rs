//! Logical clock: the only source of time in an orchestration run.
//!
//! Every recorded event advances the tick by exactly one, so an event's tick
//! is also its 1-based position in the history. No wall clock is consulted.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::domain::{BatchFlowEvent, EventRecord, FailureCategory, JobId, LogicalTick, RetryReason};
use crate::error::BatchFlowError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicalClock {
    current_tick: LogicalTick,
    event_history: Vec<EventRecord>,
    job_ticks: BTreeMap<JobId, Vec<LogicalTick>>,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tick(&self) -> LogicalTick {
        self.current_tick
    }

    pub fn on_job_started(&mut self, job_id: JobId) -> LogicalTick {
        self.advance_and_record(job_id, BatchFlowEvent::JobStarted)
    }

    pub fn on_job_completed(&mut self, job_id: JobId) -> LogicalTick {
        self.advance_and_record(job_id, BatchFlowEvent::JobCompleted)
    }

    pub fn on_job_failed(&mut self, job_id: JobId, category: FailureCategory) -> LogicalTick {
        self.advance_and_record(job_id, BatchFlowEvent::JobFailed(category))
    }

    pub fn on_retry_decision(&mut self, job_id: JobId, reason: RetryReason) -> LogicalTick {
        self.advance_and_record(job_id, BatchFlowEvent::RetryDecision(reason))
    }

    fn advance_and_record(&mut self, job_id: JobId, event: BatchFlowEvent) -> LogicalTick {
        self.current_tick += 1;
        let record = EventRecord::new(self.current_tick, job_id, event);
        debug!(tick = record.tick, job_id = %job_id.short(), kind = %record.kind(), "event recorded");
        self.push(record);
        self.current_tick
    }

    fn push(&mut self, record: EventRecord) {
        self.job_ticks.entry(record.job_id).or_default().push(record.tick);
        self.event_history.push(record);
    }

    pub fn event_history(&self) -> &[EventRecord] {
        &self.event_history
    }

    /// Events of one job, in tick order.
    pub fn get_job_events(&self, job_id: &JobId) -> Vec<EventRecord> {
        self.event_history
            .iter()
            .filter(|e| e.job_id == *job_id)
            .copied()
            .collect()
    }

    /// Ticks at which `job_id` had events.
    pub fn job_ticks(&self, job_id: &JobId) -> &[LogicalTick] {
        self.job_ticks.get(job_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn event_count(&self) -> usize {
        self.event_history.len()
    }

    pub fn has_events(&self) -> bool {
        !self.event_history.is_empty()
    }

    pub fn reset(&mut self) {
        self.current_tick = 0;
        self.event_history.clear();
        self.job_ticks.clear();
    }

    /// Rebuild a clock from a recorded history.
    ///
    /// Each event's tick is re-derived by advancing a fresh clock; the first
    /// event whose recorded tick differs aborts the replay.
    pub fn replay_from_events(events: &[EventRecord]) -> Result<Self, BatchFlowError> {
        let mut clock = Self::new();
        for event in events {
            let regenerated = clock.current_tick + 1;
            if regenerated != event.tick {
                warn!(regenerated, recorded = event.tick, "replay tick mismatch");
                return Err(BatchFlowError::ReplayTickMismatch {
                    regenerated,
                    recorded: event.tick,
                });
            }
            clock.current_tick = regenerated;
            clock.push(*event);
        }
        Ok(clock)
    }
}

impl fmt::Display for LogicalClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LogicalClock{{tick={}, events={}}}",
            self.current_tick,
            self.event_history.len()
        )
    }
}
