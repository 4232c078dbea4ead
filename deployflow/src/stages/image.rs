//! Container image build and push.

use super::Stage;
use crate::context::StageContext;
use crate::core::{PipelinePhase, StageOutput};
use crate::errors::DeployResult;
use crate::exec::CommandSpec;
use async_trait::async_trait;
use tracing::info;

/// Builds the image tagged with the full image name.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildStage;

impl BuildStage {
    /// The build invocation for `ctx`.
    #[must_use]
    pub fn command(ctx: &StageContext) -> CommandSpec {
        let config = ctx.config();
        CommandSpec::new(config.container_engine.as_str())
            .arg("build")
            .args(["-t", ctx.request().full_image_name()])
            .arg("-f")
            .arg(config.dockerfile.display().to_string())
            .arg(config.build_context.display().to_string())
    }
}

#[async_trait]
impl Stage for BuildStage {
    fn name(&self) -> &str {
        "build"
    }

    fn phase(&self) -> PipelinePhase {
        PipelinePhase::Building
    }

    async fn execute(&self, ctx: &StageContext) -> DeployResult<StageOutput> {
        let image = ctx.request().full_image_name();
        info!(image, "building image");
        ctx.runner().run_checked(&Self::command(ctx)).await?;
        Ok(StageOutput::ok_value("image", serde_json::json!(image)))
    }
}

/// Pushes the built image to the registry. Not retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct PushStage;

impl PushStage {
    /// The push invocation for `ctx`.
    #[must_use]
    pub fn command(ctx: &StageContext) -> CommandSpec {
        CommandSpec::new(ctx.config().container_engine.as_str())
            .arg("push")
            .arg(ctx.request().full_image_name())
    }
}

#[async_trait]
impl Stage for PushStage {
    fn name(&self) -> &str {
        "push"
    }

    fn phase(&self) -> PipelinePhase {
        PipelinePhase::Pushing
    }

    async fn execute(&self, ctx: &StageContext) -> DeployResult<StageOutput> {
        let image = ctx.request().full_image_name();
        info!(image, registry = %ctx.config().registry, "pushing image");
        ctx.runner().run_checked(&Self::command(ctx)).await?;
        Ok(StageOutput::ok_value("image", serde_json::json!(image)))
    }
}
