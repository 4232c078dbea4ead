//! Sequential deployment pipeline with a single failure guard.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use super::{FailureRecord, RunReport};
use crate::config::DeployConfig;
use crate::context::{DeploymentRequest, StageContext};
use crate::core::PipelinePhase;
use crate::errors::{DeployResult, StepFailure};
use crate::events::LoggingEventSink;
use crate::exec::{CommandRunner, DryRunCommandRunner, SystemCommandRunner};
use crate::http::{DryRunTransport, HttpTransport, ReqwestTransport};
use crate::notify::{notifier_for, NotificationEvent, Notifier};
use crate::observability::SpanTimer;
use crate::stages::{
    BuildStage, CleanupStage, DeployStage, HealthCheckStage, PrerequisiteStage, PushStage,
    SmokeTestStage, Stage, StageResult,
};

/// Runs stages in order and sends one notification at the end.
///
/// The first fatal stage failure stops the run; no later stage executes.
/// Best-effort stages are logged and skipped over.
pub struct DeploymentPipeline {
    stages: Vec<Arc<dyn Stage>>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for DeploymentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentPipeline")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

impl DeploymentPipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            stages: Vec::new(),
            notifier,
        }
    }

    /// The seven deployment steps: prerequisites, build, push, deploy,
    /// health check, smoke test, cleanup.
    #[must_use]
    pub fn standard(notifier: Arc<dyn Notifier>) -> Self {
        Self::new(notifier)
            .with_stage(PrerequisiteStage)
            .with_stage(BuildStage)
            .with_stage(PushStage)
            .with_stage(DeployStage)
            .with_stage(HealthCheckStage)
            .with_stage(SmokeTestStage)
            .with_stage(CleanupStage)
    }

    /// Appends a stage.
    #[must_use]
    pub fn with_stage(self, stage: impl Stage + 'static) -> Self {
        self.with_shared_stage(Arc::new(stage))
    }

    /// Appends a shared stage.
    #[must_use]
    pub fn with_shared_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage and reports the outcome.
    ///
    /// Never returns an error: a failing stage is recorded in the report and
    /// turned into an error notification here, in one place. The failure is
    /// logged once, through the `pipeline.failed` event.
    pub async fn run(&self, ctx: &StageContext) -> RunReport {
        let request = ctx.request();
        let app = ctx.config().app_name.as_str();
        let mut report = RunReport::start(ctx.run_id(), request.clone());

        info!(
            run_id = %ctx.run_id(),
            environment = request.environment(),
            version = request.version(),
            namespace = request.namespace(),
            image = request.full_image_name(),
            "starting deployment"
        );

        match self.execute_steps(ctx, &mut report).await {
            Ok(()) => {
                report.advance(PipelinePhase::NotifiedSuccess);
                self.deliver(NotificationEvent::success(app, request), &mut report)
                    .await;
                report.finish();
                info!(duration_ms = report.duration_ms(), "deployment succeeded");
                ctx.try_emit_event(
                    "pipeline.completed",
                    Some(serde_json::json!({
                        "message": "deployment succeeded",
                        "duration_ms": report.duration_ms(),
                    })),
                );
            }
            Err(failure) => {
                report.failed_step = Some(failure.step.clone());
                report.error = Some(failure.source.to_string());
                report.advance(PipelinePhase::NotifiedFailure);
                self.deliver(NotificationEvent::error(app, request, &failure.step), &mut report)
                    .await;
                report.advance(PipelinePhase::Terminated);
                report.finish();
                ctx.try_emit_event(
                    "pipeline.failed",
                    Some(serde_json::json!({
                        "step": failure.step,
                        "error": failure.to_string(),
                        "kind": failure.source.kind(),
                        "details": failure.source.to_dict(),
                    })),
                );
            }
        }

        report
    }

    async fn execute_steps(&self, ctx: &StageContext, report: &mut RunReport) -> Result<(), StepFailure> {
        for stage in &self.stages {
            let name = stage.name();
            report.advance(stage.phase());

            let started_at = Utc::now();
            let timer = SpanTimer::start(name);
            ctx.try_emit_event(
                "step.started",
                Some(serde_json::json!({ "step": name, "phase": stage.phase() })),
            );

            let outcome = stage
                .execute(ctx)
                .instrument(info_span!("step", step = name))
                .await;
            let duration_ms = timer.finish();

            match outcome {
                Ok(output) => {
                    for warning in &output.warnings {
                        ctx.try_emit_event(
                            "step.warning",
                            Some(serde_json::json!({ "step": name, "message": warning })),
                        );
                    }
                    ctx.try_emit_event(
                        "step.completed",
                        Some(serde_json::json!({
                            "step": name,
                            "status": output.status,
                            "duration_ms": duration_ms,
                        })),
                    );
                    report.steps.push(StageResult::from_output(name, started_at, output));
                }
                Err(err) => {
                    let mode = stage.failure_mode();
                    report.steps.push(StageResult::failed(name, started_at, err.to_string()));
                    report.failures.push(FailureRecord::from_error(name, &err, mode));

                    if mode.is_fatal() {
                        ctx.try_emit_event(
                            "step.failed",
                            Some(serde_json::json!({
                                "step": name,
                                "error": err.to_string(),
                                "kind": err.kind(),
                                "duration_ms": duration_ms,
                            })),
                        );
                        return Err(StepFailure::new(name, err));
                    }

                    warn!(step = name, error = %err, "non-fatal step failed, continuing");
                    ctx.try_emit_event(
                        "step.warning",
                        Some(serde_json::json!({
                            "step": name,
                            "message": format!("{name} failed: {err}"),
                            "kind": err.kind(),
                        })),
                    );
                }
            }
        }
        Ok(())
    }

    async fn deliver(&self, event: NotificationEvent, report: &mut RunReport) {
        report.notification = Some(event.status);
        if let Err(err) = self.notifier.notify(&event).await {
            warn!(status = %event.status, error = %err, "notification not delivered");
            report.notification_error = Some(err.to_string());
        }
    }
}

/// Runs the standard pipeline against the real tools.
///
/// `environment` defaults to `staging` and `version` to `latest`. With
/// `config.dry_run` set, commands and HTTP requests are logged instead of
/// executed. Errors only come from setting up the HTTP client; step
/// failures are reported through [`RunReport`].
pub async fn run(
    environment: Option<&str>,
    version: Option<&str>,
    config: DeployConfig,
) -> DeployResult<RunReport> {
    let (runner, transport): (Arc<dyn CommandRunner>, Arc<dyn HttpTransport>) = if config.dry_run {
        (Arc::new(DryRunCommandRunner::new()), Arc::new(DryRunTransport::new()))
    } else {
        (Arc::new(SystemCommandRunner::new()), Arc::new(ReqwestTransport::new()?))
    };

    let notifier = notifier_for(config.webhook_url.as_deref(), transport.clone());
    let request = DeploymentRequest::new(environment, version, &config);
    let ctx = StageContext::new(request, config, runner, transport)
        .with_event_sink(Arc::new(LoggingEventSink::new()));

    Ok(DeploymentPipeline::standard(notifier).run(&ctx).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StageOutput, StageStatus};
    use crate::events::EventSeverity;
    use crate::exec::CommandOutput;
    use crate::notify::NotificationStatus;
    use crate::pipeline::FailureMode;
    use crate::testing::{
        assert_run_failed_at, assert_run_succeeded, assert_steps, RecordingNotifier, ScriptedStage,
        TestHarness,
    };

    #[test]
    fn test_standard_order() {
        let pipeline = DeploymentPipeline::standard(Arc::new(RecordingNotifier::new()));
        assert_eq!(
            pipeline.stage_names(),
            vec!["prerequisites", "build", "push", "deploy", "health_check", "smoke_test", "cleanup"]
        );
    }

    #[tokio::test]
    async fn test_fatal_failure_stops_run() {
        let harness = TestHarness::new();
        let notifier = Arc::new(RecordingNotifier::new());
        let first = Arc::new(ScriptedStage::failing("build", PipelinePhase::Building, "boom"));
        let second = Arc::new(ScriptedStage::succeeding("push", PipelinePhase::Pushing));

        let report = DeploymentPipeline::new(notifier.clone())
            .with_shared_stage(first.clone())
            .with_shared_stage(second.clone())
            .run(&harness.context("dev", "1"))
            .await;

        assert_run_failed_at(&report, "build");
        assert_eq!(second.call_count(), 0);
        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, NotificationStatus::Error);
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_best_effort_failure_continues() {
        let harness = TestHarness::new();
        let notifier = Arc::new(RecordingNotifier::new());
        let flaky = ScriptedStage::failing("cleanup", PipelinePhase::CleaningUp, "forbidden")
            .with_failure_mode(FailureMode::BestEffort);

        let report = DeploymentPipeline::new(notifier.clone())
            .with_stage(ScriptedStage::succeeding("smoke_test", PipelinePhase::SmokeTesting))
            .with_stage(flaky)
            .run(&harness.context("dev", "1"))
            .await;

        assert!(report.is_success());
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].recoverable);
        assert_eq!(report.step("cleanup").map(|s| s.status), Some(StageStatus::Fail));
        assert_eq!(notifier.events()[0].status, NotificationStatus::Success);
        assert!(harness.sink.event_types().contains(&"step.warning".to_string()));
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_change_outcome() {
        let harness = TestHarness::new();
        let notifier = Arc::new(RecordingNotifier::failing());

        let report = DeploymentPipeline::new(notifier.clone())
            .with_stage(ScriptedStage::succeeding("prerequisites", PipelinePhase::CheckingPrereqs))
            .run(&harness.context("dev", "1"))
            .await;

        assert_eq!(report.exit_code(), 0);
        assert!(report.notification_error.is_some());
        assert_eq!(notifier.events().len(), 1);
    }

    #[tokio::test]
    async fn test_step_events_in_order() {
        let harness = TestHarness::new();
        let stage = ScriptedStage::succeeding("prerequisites", PipelinePhase::CheckingPrereqs)
            .with_output(StageOutput::warn("optional tool 'helm' not found"));

        DeploymentPipeline::new(Arc::new(RecordingNotifier::new()))
            .with_stage(stage)
            .run(&harness.context("dev", "1"))
            .await;

        assert_eq!(
            harness.sink.event_types(),
            vec!["step.started", "step.warning", "step.completed", "pipeline.completed"]
        );
    }

    #[tokio::test]
    async fn test_standard_success_path() {
        let harness = TestHarness::new();
        let report = harness.run("production", "v2.3.1").await;

        assert_run_succeeded(&report);
        assert_steps(
            &report,
            &["prerequisites", "build", "push", "deploy", "health_check", "smoke_test", "cleanup"],
        );
        assert_eq!(report.notification, Some(NotificationStatus::Success));
    }

    #[tokio::test]
    async fn test_fatal_failure_has_one_error_event() {
        let harness = TestHarness::new();
        harness
            .runner
            .respond("docker", &["build"], CommandOutput::failure(2, "no Dockerfile"));

        let report = harness.run("dev", "1").await;
        assert_run_failed_at(&report, "build");

        let errors: Vec<_> = harness
            .sink
            .events()
            .into_iter()
            .filter(|(t, _)| EventSeverity::of(t) == EventSeverity::Error)
            .collect();
        assert_eq!(errors.len(), 1);

        let (event_type, data) = &errors[0];
        assert_eq!(event_type, "pipeline.failed");
        let details = &data.as_ref().unwrap()["details"];
        assert_eq!(details["type"], "CommandFailure");
        assert_eq!(details["exit_code"], 2);
        assert!(details["command"].as_str().unwrap().starts_with("docker build"));
    }
}
