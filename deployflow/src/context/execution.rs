//! Execution context handed to each stage.

use super::DeploymentRequest;
use crate::config::DeployConfig;
use crate::events::{EventSink, NoOpEventSink};
use crate::exec::CommandRunner;
use crate::http::HttpTransport;
use std::sync::Arc;
use uuid::Uuid;

/// Everything a stage may read or invoke.
///
/// Cloning is cheap; all members are shared. The request and config are
/// read-only for the whole run.
#[derive(Clone)]
pub struct StageContext {
    run_id: Uuid,
    request: Arc<DeploymentRequest>,
    config: Arc<DeployConfig>,
    runner: Arc<dyn CommandRunner>,
    http: Arc<dyn HttpTransport>,
    event_sink: Arc<dyn EventSink>,
}

impl StageContext {
    /// Creates a new stage context with a fresh run id and no event sink.
    #[must_use]
    pub fn new(
        request: DeploymentRequest,
        config: DeployConfig,
        runner: Arc<dyn CommandRunner>,
        http: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            request: Arc::new(request),
            config: Arc::new(config),
            runner,
            http,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Unique id of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The deployment request.
    #[must_use]
    pub fn request(&self) -> &DeploymentRequest {
        &self.request
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// The command runner.
    #[must_use]
    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// The HTTP transport.
    #[must_use]
    pub fn http(&self) -> &dyn HttpTransport {
        self.http.as_ref()
    }

    /// Emits an event, tagging it with the run id.
    pub fn try_emit_event(&self, event_type: &str, data: Option<serde_json::Value>) {
        let mut payload = data.unwrap_or_else(|| serde_json::json!({}));
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
        }
        self.event_sink.try_emit(event_type, Some(payload));
    }
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("run_id", &self.run_id)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}
