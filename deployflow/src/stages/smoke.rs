//! In-cluster smoke test.

use super::Stage;
use crate::context::StageContext;
use crate::core::{PipelinePhase, StageOutput};
use crate::errors::DeployResult;
use crate::exec::CommandSpec;
use async_trait::async_trait;
use tracing::info;

/// Runs a throwaway pod that requests the service by its cluster DNS name.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmokeTestStage;

impl SmokeTestStage {
    /// In-cluster URL of the service health endpoint.
    #[must_use]
    pub fn service_url(ctx: &StageContext) -> String {
        let config = ctx.config();
        format!(
            "http://{}.{}.svc.cluster.local{}",
            config.app_name,
            ctx.request().namespace(),
            config.health_path
        )
    }

    /// Pod name, unique per run.
    #[must_use]
    pub fn pod_name(ctx: &StageContext) -> String {
        let id = ctx.run_id().simple().to_string();
        format!("smoke-test-{}", &id[..8])
    }
}

#[async_trait]
impl Stage for SmokeTestStage {
    fn name(&self) -> &str {
        "smoke_test"
    }

    fn phase(&self) -> PipelinePhase {
        PipelinePhase::SmokeTesting
    }

    async fn execute(&self, ctx: &StageContext) -> DeployResult<StageOutput> {
        let config = ctx.config();
        let url = Self::service_url(ctx);
        let pod = Self::pod_name(ctx);

        info!(pod = %pod, url = %url, "running smoke test");
        let spec = CommandSpec::new(config.cluster_cli.as_str())
            .args(["run", pod.as_str()])
            .arg(format!("--image={}", config.smoke_image))
            .args(["--rm", "-i", "--restart=Never"])
            .args(["-n", ctx.request().namespace()])
            .args(["--", "curl", "-f", url.as_str()]);
        ctx.runner().run_checked(&spec).await?;

        Ok(StageOutput::ok_value("url", serde_json::json!(url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CommandOutput;
    use crate::testing::TestHarness;

    #[tokio::test]
    async fn test_smoke_command() {
        let harness = TestHarness::new();
        let ctx = harness.context("production", "v1");

        SmokeTestStage.execute(&ctx).await.unwrap();

        let calls = harness.runner.calls();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert!(call.has_prefix("kubectl", &["run"]));
        assert_eq!(call.args[1], SmokeTestStage::pod_name(&ctx));
        assert_eq!(
            call.args.last().map(String::as_str),
            Some("http://test-automation.test-automation-production.svc.cluster.local/health")
        );
        assert!(call.args.contains(&"--image=curlimages/curl".to_string()));
    }

    #[tokio::test]
    async fn test_pod_name_shape() {
        let harness = TestHarness::new();
        let name = SmokeTestStage::pod_name(&harness.context("dev", "1"));
        assert!(name.starts_with("smoke-test-"));
        assert_eq!(name.len(), "smoke-test-".len() + 8);
    }

    #[tokio::test]
    async fn test_probe_failure_is_fatal() {
        let harness = TestHarness::new();
        harness
            .runner
            .respond("kubectl", &["run"], CommandOutput::failure(22, "curl: (22) 503"));

        assert!(SmokeTestStage.execute(&harness.context("dev", "1")).await.is_err());
    }
}
