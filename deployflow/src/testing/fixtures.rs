//! Test fixtures for pipeline testing.

use std::sync::Arc;

use super::mocks::{RecordingTransport, ScriptedCommandRunner};
use crate::config::{DeployConfig, SettleStrategy};
use crate::context::{DeploymentRequest, StageContext};
use crate::events::CollectingEventSink;
use crate::notify::{notifier_for, Notifier};
use crate::pipeline::{DeploymentPipeline, RunReport};

/// Scripted runner, recording transport and collecting sink wired into
/// stage contexts.
///
/// The default config skips the settle pause so tests do not sleep.
#[derive(Debug)]
pub struct TestHarness {
    /// Command runner shared by every context built here.
    pub runner: Arc<ScriptedCommandRunner>,
    /// HTTP transport shared by every context built here.
    pub transport: Arc<RecordingTransport>,
    /// Event sink shared by every context built here.
    pub sink: Arc<CollectingEventSink>,
    /// Config handed to new contexts.
    pub config: DeployConfig,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Creates a harness with the default config and no settle pause.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runner: Arc::new(ScriptedCommandRunner::new()),
            transport: Arc::new(RecordingTransport::new()),
            sink: Arc::new(CollectingEventSink::new()),
            config: DeployConfig::default().with_settle(SettleStrategy::Fixed { seconds: 0 }),
        }
    }

    /// Replaces the config.
    #[must_use]
    pub fn with_config(mut self, f: impl FnOnce(DeployConfig) -> DeployConfig) -> Self {
        self.config = f(self.config);
        self
    }

    /// Replaces the transport.
    #[must_use]
    pub fn with_transport(mut self, transport: RecordingTransport) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Builds a request against the current config.
    #[must_use]
    pub fn request(&self, environment: &str, version: &str) -> DeploymentRequest {
        DeploymentRequest::new(Some(environment), Some(version), &self.config)
    }

    /// Builds a stage context for `environment` and `version`.
    #[must_use]
    pub fn context(&self, environment: &str, version: &str) -> StageContext {
        StageContext::new(
            self.request(environment, version),
            self.config.clone(),
            self.runner.clone(),
            self.transport.clone(),
        )
        .with_event_sink(self.sink.clone())
    }

    /// The notifier the configured webhook selects, posting through the
    /// recording transport.
    #[must_use]
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        notifier_for(self.config.webhook_url.as_deref(), self.transport.clone())
    }

    /// Runs the standard pipeline.
    pub async fn run(&self, environment: &str, version: &str) -> RunReport {
        DeploymentPipeline::standard(self.notifier())
            .run(&self.context(environment, version))
            .await
    }
}
