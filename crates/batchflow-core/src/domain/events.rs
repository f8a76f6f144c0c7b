//! Orchestration events and their text form.
//!
//! One `EventRecord` is appended per logical tick. The text rendering is part
//! of the replay-log format and must stay byte-stable:
//!
//! ```text
//! Event{tick=3, type=JobFailed, job=<64 hex>, data=Failure:EngineError}
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ids::JobId;
use crate::error::BatchFlowError;

/// Discrete logical time. Origin is 0, the first recorded event is tick 1.
pub type LogicalTick = u64;

/// Why a retry decision was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RetryReason {
    PolicyAllowed,
    PolicyDenied,
}

impl RetryReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RetryReason::PolicyAllowed => "PolicyAllowed",
            RetryReason::PolicyDenied => "PolicyDenied",
        }
    }
}

impl FromStr for RetryReason {
    type Err = BatchFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PolicyAllowed" => Ok(RetryReason::PolicyAllowed),
            "PolicyDenied" => Ok(RetryReason::PolicyDenied),
            other => Err(BatchFlowError::MalformedEvent(format!(
                "unknown retry reason {other:?}"
            ))),
        }
    }
}

/// Classification attached to a `JobFailed` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FailureCategory {
    EngineError,
    ValidationFailed,
    DependencyFailed,
}

impl FailureCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureCategory::EngineError => "EngineError",
            FailureCategory::ValidationFailed => "ValidationFailed",
            FailureCategory::DependencyFailed => "DependencyFailed",
        }
    }
}

impl FromStr for FailureCategory {
    type Err = BatchFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EngineError" => Ok(FailureCategory::EngineError),
            "ValidationFailed" => Ok(FailureCategory::ValidationFailed),
            "DependencyFailed" => Ok(FailureCategory::DependencyFailed),
            other => Err(BatchFlowError::MalformedEvent(format!(
                "unknown failure category {other:?}"
            ))),
        }
    }
}

/// An orchestration event. The payload is carried by the variant, so a
/// failure without a category (or a start with one) cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchFlowEvent {
    JobStarted,
    JobCompleted,
    JobFailed(FailureCategory),
    RetryDecision(RetryReason),
}

impl BatchFlowEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            BatchFlowEvent::JobStarted => EventKind::JobStarted,
            BatchFlowEvent::JobCompleted => EventKind::JobCompleted,
            BatchFlowEvent::JobFailed(_) => EventKind::JobFailed,
            BatchFlowEvent::RetryDecision(_) => EventKind::RetryDecision,
        }
    }

    pub fn data(&self) -> EventData {
        match *self {
            BatchFlowEvent::JobStarted | BatchFlowEvent::JobCompleted => EventData::None,
            BatchFlowEvent::JobFailed(category) => EventData::Failure(category),
            BatchFlowEvent::RetryDecision(reason) => EventData::Retry(reason),
        }
    }

    /// Rebuild an event from its tag and payload, rejecting mismatches.
    pub fn from_parts(kind: EventKind, data: EventData) -> Result<Self, BatchFlowError> {
        match (kind, data) {
            (EventKind::JobStarted, EventData::None) => Ok(BatchFlowEvent::JobStarted),
            (EventKind::JobCompleted, EventData::None) => Ok(BatchFlowEvent::JobCompleted),
            (EventKind::JobFailed, EventData::Failure(c)) => Ok(BatchFlowEvent::JobFailed(c)),
            (EventKind::RetryDecision, EventData::Retry(r)) => Ok(BatchFlowEvent::RetryDecision(r)),
            (kind, data) => Err(BatchFlowError::MalformedEvent(format!(
                "payload {data} is not valid for event type {kind}"
            ))),
        }
    }
}

/// Fieldless tag of a `BatchFlowEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    JobStarted,
    JobCompleted,
    JobFailed,
    RetryDecision,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::JobStarted => "JobStarted",
            EventKind::JobCompleted => "JobCompleted",
            EventKind::JobFailed => "JobFailed",
            EventKind::RetryDecision => "RetryDecision",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = BatchFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JobStarted" => Ok(EventKind::JobStarted),
            "JobCompleted" => Ok(EventKind::JobCompleted),
            "JobFailed" => Ok(EventKind::JobFailed),
            "RetryDecision" => Ok(EventKind::RetryDecision),
            other => Err(BatchFlowError::MalformedEvent(format!(
                "unknown event type {other:?}"
            ))),
        }
    }
}

/// Payload view of a `BatchFlowEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventData {
    None,
    Retry(RetryReason),
    Failure(FailureCategory),
}

impl fmt::Display for EventData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventData::None => f.write_str("None"),
            EventData::Retry(reason) => write!(f, "Retry:{}", reason.as_str()),
            EventData::Failure(category) => write!(f, "Failure:{}", category.as_str()),
        }
    }
}

impl FromStr for EventData {
    type Err = BatchFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "None" {
            return Ok(EventData::None);
        }
        if let Some(reason) = s.strip_prefix("Retry:") {
            return Ok(EventData::Retry(reason.parse()?));
        }
        if let Some(category) = s.strip_prefix("Failure:") {
            return Ok(EventData::Failure(category.parse()?));
        }
        Err(BatchFlowError::MalformedEvent(format!(
            "unknown event data {s:?}"
        )))
    }
}

/// A single entry of the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventRecord {
    pub tick: LogicalTick,
    pub job_id: JobId,
    pub event: BatchFlowEvent,
}

impl EventRecord {
    pub fn new(tick: LogicalTick, job_id: JobId, event: BatchFlowEvent) -> Self {
        Self { tick, job_id, event }
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    pub fn data(&self) -> EventData {
        self.event.data()
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event{{tick={}, type={}, job={}, data={}}}",
            self.tick,
            self.kind(),
            self.job_id,
            self.data()
        )
    }
}

impl FromStr for EventRecord {
    type Err = BatchFlowError;

    /// Strict inverse of `Display`: field order, separators and spelling
    /// must match exactly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix("Event{")
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| BatchFlowError::MalformedEvent(format!("not an event record: {s:?}")))?;

        let mut fields = body.split(", ");
        let tick = field(&mut fields, "tick")?;
        let kind = field(&mut fields, "type")?;
        let job = field(&mut fields, "job")?;
        let data = field(&mut fields, "data")?;
        if let Some(extra) = fields.next() {
            return Err(BatchFlowError::MalformedEvent(format!(
                "unexpected trailing field {extra:?}"
            )));
        }

        let tick: LogicalTick = tick
            .parse()
            .map_err(|_| BatchFlowError::MalformedEvent(format!("invalid tick {tick:?}")))?;
        let event = BatchFlowEvent::from_parts(kind.parse()?, data.parse()?)?;
        Ok(EventRecord::new(tick, job.parse()?, event))
    }
}

fn field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    key: &str,
) -> Result<&'a str, BatchFlowError> {
    let raw = fields
        .next()
        .ok_or_else(|| BatchFlowError::MalformedEvent(format!("missing field {key:?}")))?;
    raw.strip_prefix(key)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or_else(|| {
            BatchFlowError::MalformedEvent(format!("expected field {key:?}, found {raw:?}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn job() -> JobId {
        JobId::from_digest([0xab; 32])
    }

    #[rstest]
    #[case::started(BatchFlowEvent::JobStarted, "type=JobStarted", "data=None")]
    #[case::completed(BatchFlowEvent::JobCompleted, "type=JobCompleted", "data=None")]
    #[case::failed(
        BatchFlowEvent::JobFailed(FailureCategory::EngineError),
        "type=JobFailed",
        "data=Failure:EngineError"
    )]
    #[case::retry(
        BatchFlowEvent::RetryDecision(RetryReason::PolicyAllowed),
        "type=RetryDecision",
        "data=Retry:PolicyAllowed"
    )]
    fn display_uses_log_format(
        #[case] event: BatchFlowEvent,
        #[case] kind: &str,
        #[case] data: &str,
    ) {
        let record = EventRecord::new(7, job(), event);
        let expected = format!("Event{{tick=7, {kind}, job={}, {data}}}", "ab".repeat(32));
        assert_eq!(record.to_string(), expected);
        assert_eq!(expected.parse::<EventRecord>().unwrap(), record);
    }

    #[test]
    fn kind_and_data_views() {
        let event = BatchFlowEvent::JobFailed(FailureCategory::DependencyFailed);
        assert_eq!(event.kind(), EventKind::JobFailed);
        assert_eq!(event.data(), EventData::Failure(FailureCategory::DependencyFailed));
        assert_eq!(BatchFlowEvent::JobStarted.data(), EventData::None);
    }

    #[rstest]
    #[case::started_with_payload(EventKind::JobStarted, EventData::Retry(RetryReason::PolicyDenied))]
    #[case::failed_without_category(EventKind::JobFailed, EventData::None)]
    #[case::retry_with_failure(EventKind::RetryDecision, EventData::Failure(FailureCategory::EngineError))]
    fn mismatched_payload_is_rejected(#[case] kind: EventKind, #[case] data: EventData) {
        assert!(BatchFlowEvent::from_parts(kind, data).is_err());
    }

    #[rstest]
    #[case::missing_brace("Event{tick=1, type=JobStarted, job=00, data=None")]
    #[case::bad_tick("Event{tick=x, type=JobStarted, job=00, data=None}")]
    #[case::reordered("Event{type=JobStarted, tick=1, job=00, data=None}")]
    #[case::unknown_type("Event{tick=1, type=JobPaused, job=00, data=None}")]
    #[case::short_job("Event{tick=1, type=JobStarted, job=00, data=None}")]
    #[case::extra_field("Event{tick=1, type=JobStarted, job=00, data=None, x=1}")]
    fn parse_rejects_malformed(#[case] line: &str) {
        assert!(line.parse::<EventRecord>().is_err());
    }
}
