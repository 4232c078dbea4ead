//! Event sink system for observability.
//!
//! The orchestrator reports every step transition through an [`EventSink`].
//! Sinks are passed explicitly; there is no process-wide default.

mod sink;

pub use sink::{CollectingEventSink, EventSeverity, EventSink, LoggingEventSink, NoOpEventSink};
