//! Ports: the seams between the orchestration core and the outside.
//!
//! - `ExecutionAdapter`: how a job reaches an engine
//! - `EventSink`: where recorded events are delivered

pub mod adapter;
pub mod event_sink;

pub use self::adapter::{ExecutionAdapter, check_structure, validate_structure};
pub use self::event_sink::{EventSink, NoopEventSink};
