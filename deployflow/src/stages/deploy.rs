//! Manifest application and rollout.

use super::Stage;
use crate::context::StageContext;
use crate::core::{PipelinePhase, StageOutput};
use crate::errors::DeployResult;
use crate::exec::CommandSpec;
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Extra time the runner grants the cluster CLI beyond its own rollout
/// timeout before killing it.
const ROLLOUT_KILL_GRACE: Duration = Duration::from_secs(15);

/// Ensures the namespace, applies manifests, sets the image and waits for
/// the rollout.
///
/// Namespace creation is generated client-side and applied, so re-running
/// against an existing namespace is a no-op. Nothing is rolled back on
/// failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployStage;

impl DeployStage {
    fn kubectl(ctx: &StageContext) -> CommandSpec {
        CommandSpec::new(ctx.config().cluster_cli.as_str())
    }

    fn apply_dir(ctx: &StageContext, kind: &str) -> CommandSpec {
        let request = ctx.request();
        let path = ctx.config().manifest_path(request.environment(), kind);
        Self::kubectl(ctx)
            .args(["apply", "-f"])
            .arg(format!("{}/", path.display()))
            .args(["-n", request.namespace()])
    }
}

#[async_trait]
impl Stage for DeployStage {
    fn name(&self) -> &str {
        "deploy"
    }

    fn phase(&self) -> PipelinePhase {
        PipelinePhase::Deploying
    }

    async fn execute(&self, ctx: &StageContext) -> DeployResult<StageOutput> {
        let request = ctx.request();
        let config = ctx.config();
        let namespace = request.namespace();
        let runner = ctx.runner();
        let deployment = format!("deployment/{}", config.app_name);

        info!(namespace, "ensuring namespace");
        let manifest = runner
            .run_checked(&Self::kubectl(ctx).args([
                "create",
                "namespace",
                namespace,
                "--dry-run=client",
                "-o",
                "yaml",
            ]))
            .await?;
        runner
            .run_checked(&Self::kubectl(ctx).args(["apply", "-f", "-"]).stdin(manifest.stdout))
            .await?;

        info!(namespace, environment = request.environment(), "applying manifests");
        runner.run_checked(&Self::apply_dir(ctx, "deployment")).await?;
        runner.run_checked(&Self::apply_dir(ctx, "service")).await?;

        info!(image = request.full_image_name(), "updating deployment image");
        runner
            .run_checked(
                &Self::kubectl(ctx)
                    .args(["set", "image", deployment.as_str()])
                    .arg(format!("{}={}", config.app_name, request.full_image_name()))
                    .args(["-n", namespace]),
            )
            .await?;

        let limit = config.rollout_timeout();
        info!(timeout_secs = limit.as_secs(), "waiting for rollout");
        runner
            .run_checked(
                &Self::kubectl(ctx)
                    .args(["rollout", "status", deployment.as_str(), "-n", namespace])
                    .arg(format!("--timeout={}s", limit.as_secs()))
                    .timeout(limit + ROLLOUT_KILL_GRACE),
            )
            .await?;

        Ok(StageOutput::ok_value("namespace", serde_json::json!(namespace)))
    }
}
