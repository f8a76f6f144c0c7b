//! EventSink port - 記録されたイベントの送り先
//!
//! # 実装
//! - `replay::ReplayLog`: 保持して後でリプレイ
//! - `NoopEventSink`: 何もしない

use crate::domain::EventRecord;

/// Receives every event of a run, in tick order.
///
/// Implementations: `replay::ReplayLog` (keeps them for later replay) and
/// `NoopEventSink`.
pub trait EventSink: Send {
    fn emit(&mut self, record: &EventRecord);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&mut self, _record: &EventRecord) {}
}
