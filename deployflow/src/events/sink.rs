//! Event sink trait and implementations.

use parking_lot::RwLock;
use tracing::{error, info, warn};

/// Trait for sinks receiving pipeline events.
///
/// Event types are dotted names such as `step.started` or
/// `pipeline.failed`. Emitting must never fail or panic.
pub trait EventSink: Send + Sync {
    /// Emits an event without blocking.
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn try_emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// Severity a logging sink assigns to an event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSeverity {
    /// Normal progress.
    Info,
    /// Non-fatal problem.
    Warn,
    /// Fatal problem.
    Error,
}

impl EventSeverity {
    /// Classifies an event type.
    ///
    /// Only `pipeline.failed` is an error. A failed step is always followed
    /// by it, so step-level failures stay at warn.
    #[must_use]
    pub fn of(event_type: &str) -> Self {
        if event_type == "pipeline.failed" {
            Self::Error
        } else if event_type.ends_with(".failed") || event_type.ends_with(".warning") {
            Self::Warn
        } else {
            Self::Info
        }
    }
}

/// An event sink that logs events through `tracing`.
///
/// The level follows [`EventSeverity::of`], so a failed run surfaces as a
/// single ERROR line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventSink;

impl LoggingEventSink {
    /// Creates a new logging event sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LoggingEventSink {
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        let step = data
            .as_ref()
            .and_then(|d| d.get("step"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("-");
        let detail = data
            .as_ref()
            .and_then(|d| d.get("message").or_else(|| d.get("error")))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("");

        match EventSeverity::of(event_type) {
            EventSeverity::Info => info!(event_type, step, event_data = ?data, "{detail}"),
            EventSeverity::Warn => warn!(event_type, step, event_data = ?data, "{detail}"),
            EventSeverity::Error => error!(event_type, step, event_data = ?data, "{detail}"),
        }
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<(String, Option<serde_json::Value>)>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Option<serde_json::Value>)> {
        self.events.read().clone()
    }

    /// Returns the collected event types in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<(String, Option<serde_json::Value>)> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_sink() {
        NoOpEventSink.try_emit("test", Some(serde_json::json!({"x": 1})));
    }

    #[test]
    fn test_logging_sink() {
        let sink = LoggingEventSink::new();
        sink.try_emit("step.started", Some(serde_json::json!({"step": "build"})));
        sink.try_emit("step.failed", Some(serde_json::json!({"step": "build", "error": "exit 1"})));
        sink.try_emit("step.warning", None);
    }

    #[test]
    fn test_severity() {
        assert_eq!(EventSeverity::of("pipeline.failed"), EventSeverity::Error);
        assert_eq!(EventSeverity::of("step.failed"), EventSeverity::Warn);
        assert_eq!(EventSeverity::of("step.warning"), EventSeverity::Warn);
        assert_eq!(EventSeverity::of("step.completed"), EventSeverity::Info);
    }

    #[test]
    fn test_collecting_sink_filter() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.try_emit("step.started", None);
        sink.try_emit("step.completed", None);
        sink.try_emit("pipeline.completed", None);

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events_of_type("step.").len(), 2);
        assert_eq!(
            sink.event_types(),
            vec!["step.started", "step.completed", "pipeline.completed"]
        );
    }
}
