//! Event sink system for observability.
//!
//! The orchestrator emits `run.*` and `stage.*` events and batch prediction
//! emits `prediction.*` events. Sinks are passed in explicitly; there is no
//! process-global sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
