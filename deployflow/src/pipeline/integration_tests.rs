//! End-to-end runs of the standard pipeline against scripted tools.

#[cfg(test)]
mod tests {
    use crate::core::{PipelinePhase, StageStatus};
    use crate::exec::CommandOutput;
    use crate::notify::NotificationStatus;
    use crate::testing::{
        assert_phase_history_valid, assert_run_failed_at, assert_run_succeeded,
        assert_step_status, assert_steps, RecordingTransport, TestHarness,
    };
    use pretty_assertions::assert_eq;

    const WEBHOOK: &str = "https://hooks.example.com/services/T000/B000/XXXX";

    fn with_webhook() -> TestHarness {
        TestHarness::new().with_config(|c| c.with_webhook(WEBHOOK))
    }

    fn webhook_texts(harness: &TestHarness) -> Vec<String> {
        harness
            .transport
            .posts()
            .into_iter()
            .filter(|(url, _)| url == WEBHOOK)
            .filter_map(|(_, body)| body["text"].as_str().map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn test_successful_production_deploy() {
        let harness = with_webhook();
        let report = harness.run("production", "v2.3.1").await;

        assert_run_succeeded(&report);
        assert_eq!(report.exit_code(), 0);

        let texts = webhook_texts(&harness);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("v2.3.1"));
        assert!(texts[0].contains("production"));
        assert!(texts[0].contains("succeeded"));

        let runner = &harness.runner;
        assert!(runner.was_called(
            "docker",
            &["build", "-t", "localhost:5000/test-automation:v2.3.1"]
        ));
        assert!(runner.was_called("docker", &["push", "localhost:5000/test-automation:v2.3.1"]));
        assert!(runner.was_called(
            "kubectl",
            &["apply", "-f", "k8s/production/deployment/", "-n", "test-automation-production"]
        ));
    }

    #[tokio::test]
    async fn test_build_failure_stops_before_push() {
        let harness = with_webhook();
        harness
            .runner
            .respond("docker", &["build"], CommandOutput::failure(1, "Dockerfile not found"));

        let report = harness.run("production", "v2.3.1").await;

        assert_run_failed_at(&report, "build");
        assert_ne!(report.exit_code(), 0);
        assert!(!harness.runner.was_called("docker", &["push"]));
        assert!(!harness.runner.was_called("kubectl", &[]));

        let texts = webhook_texts(&harness);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("build"));
        assert_eq!(report.notification, Some(NotificationStatus::Error));
    }

    #[tokio::test]
    async fn test_missing_cluster_cli_aborts_immediately() {
        let harness = with_webhook();
        harness.runner.remove_tool("kubectl");

        let report = harness.run("staging", "latest").await;

        assert_run_failed_at(&report, "prerequisites");
        assert_steps(&report, &["prerequisites"]);
        assert!(harness.runner.calls().is_empty());
        assert_eq!(webhook_texts(&harness).len(), 1);
        assert_eq!(report.failures[0].error_type, "MissingTool");
    }

    #[tokio::test]
    async fn test_missing_optional_tool_only_warns() {
        let harness = TestHarness::new();
        harness.runner.remove_tool("helm");

        let report = harness.run("staging", "latest").await;

        assert_run_succeeded(&report);
        assert_step_status(&report, "prerequisites", StageStatus::Warn);
        assert!(!harness.sink.events_of_type("step.warning").is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_failure_still_succeeds() {
        let harness = with_webhook();
        harness
            .runner
            .respond("kubectl", &["get", "replicasets"], CommandOutput::failure(1, "forbidden"));

        let report = harness.run("dev", "1.0.0").await;

        assert_run_succeeded(&report);
        assert_step_status(&report, "cleanup", StageStatus::Fail);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].recoverable);
        assert!(webhook_texts(&harness)[0].contains("succeeded"));
    }

    #[tokio::test]
    async fn test_no_webhook_sends_nothing() {
        let harness = TestHarness::new();
        harness
            .runner
            .respond("docker", &["push"], CommandOutput::failure(1, "denied"));

        let report = harness.run("dev", "1").await;

        assert_run_failed_at(&report, "push");
        assert!(harness.transport.posts().is_empty());
    }

    #[tokio::test]
    async fn test_webhook_rejection_is_not_escalated() {
        let harness = with_webhook().with_transport(RecordingTransport::new().with_post_status(500));

        let report = harness.run("dev", "1").await;

        assert_run_succeeded(&report);
        assert!(report.notification_error.is_some());
        assert_eq!(harness.transport.posts().len(), 1);
    }

    #[tokio::test]
    async fn test_unhealthy_service_fails_at_health_check() {
        let harness = with_webhook();
        harness.transport.push_get_status(503);

        let report = harness.run("dev", "1").await;

        assert_run_failed_at(&report, "health_check");
        assert!(!harness.runner.was_called("kubectl", &["run"]));
        assert_eq!(report.failures[0].error_type, "HealthCheckFailure");
    }

    #[tokio::test]
    async fn test_rollout_timeout_is_a_command_failure() {
        let harness = TestHarness::new();
        harness.runner.time_out("kubectl", &["rollout", "status"]);

        let report = harness.run("dev", "1").await;

        assert_run_failed_at(&report, "deploy");
        assert_eq!(report.failures[0].error_type, "CommandFailure");
        assert!(harness.transport.gets().is_empty());
    }

    #[tokio::test]
    async fn test_phase_history_success() {
        let harness = TestHarness::new();
        let report = harness.run("dev", "1").await;

        assert_phase_history_valid(&report);
        assert_eq!(
            report.phase_history,
            vec![
                PipelinePhase::Idle,
                PipelinePhase::CheckingPrereqs,
                PipelinePhase::Building,
                PipelinePhase::Pushing,
                PipelinePhase::Deploying,
                PipelinePhase::HealthChecking,
                PipelinePhase::SmokeTesting,
                PipelinePhase::CleaningUp,
                PipelinePhase::NotifiedSuccess,
            ]
        );
    }

    #[tokio::test]
    async fn test_phase_history_failure() {
        let harness = TestHarness::new();
        harness
            .runner
            .respond("kubectl", &["run"], CommandOutput::failure(22, "curl: (22)"));

        let report = harness.run("dev", "1").await;

        assert_phase_history_valid(&report);
        assert_eq!(
            report.phase_history[report.phase_history.len() - 3..].to_vec(),
            vec![
                PipelinePhase::SmokeTesting,
                PipelinePhase::NotifiedFailure,
                PipelinePhase::Terminated,
            ]
        );
        assert!(!harness.runner.was_called("kubectl", &["get", "replicasets"]));
    }

    #[tokio::test]
    async fn test_defaults_to_staging_latest() {
        let harness = TestHarness::new();
        let ctx = crate::context::StageContext::new(
            crate::context::DeploymentRequest::new(None, None, &harness.config),
            harness.config.clone(),
            harness.runner.clone(),
            harness.transport.clone(),
        );

        let report = crate::pipeline::DeploymentPipeline::standard(harness.notifier())
            .run(&ctx)
            .await;

        assert_eq!(report.request.environment(), "staging");
        assert_eq!(report.request.full_image_name(), "localhost:5000/test-automation:latest");
        assert!(harness
            .runner
            .was_called("kubectl", &["apply", "-f", "k8s/staging/deployment/"]));
    }

    #[tokio::test]
    async fn test_events_bracket_every_step() {
        let harness = TestHarness::new();
        harness.run("dev", "1").await;

        assert_eq!(harness.sink.events_of_type("step.started").len(), 7);
        assert_eq!(harness.sink.events_of_type("step.completed").len(), 7);
        assert_eq!(
            harness.sink.event_types().last().map(String::as_str),
            Some("pipeline.completed")
        );
    }
}
