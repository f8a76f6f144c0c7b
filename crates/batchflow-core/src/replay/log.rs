//! Line-oriented event log.
//!
//! One `EventRecord` per line in its `Display` form, `\n` terminated.
//! Parsing is strict: every non-blank line must be a well-formed record.

use crate::domain::EventRecord;
use crate::error::BatchFlowError;
use crate::ports::EventSink;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayLog {
    events: Vec<EventRecord>,
}

impl ReplayLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<EventRecord>) -> Self {
        Self { events }
    }

    pub fn record(&mut self, record: EventRecord) {
        self.events.push(record);
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn into_events(self) -> Vec<EventRecord> {
        self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&event.to_string());
            out.push('\n');
        }
        out
    }

    /// Parse a serialized log. Blank lines are skipped; errors carry the
    /// 1-based line number.
    pub fn deserialize(text: &str) -> Result<Self, BatchFlowError> {
        let mut events = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let record = line
                .parse::<EventRecord>()
                .map_err(|err| BatchFlowError::MalformedEventLog {
                    line: index + 1,
                    reason: err.to_string(),
                })?;
            events.push(record);
        }
        Ok(Self { events })
    }
}

impl EventSink for ReplayLog {
    fn emit(&mut self, record: &EventRecord) {
        self.record(*record);
    }
}
