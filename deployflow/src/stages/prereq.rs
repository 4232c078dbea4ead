//! Prerequisite check.

use super::Stage;
use crate::context::StageContext;
use crate::core::{PipelinePhase, StageOutput};
use crate::errors::{DeployResult, DeployflowError};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Verifies the container engine and cluster CLI are on the path.
///
/// Optional tools are looked up too, but a missing one only produces a
/// warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrerequisiteStage;

#[async_trait]
impl Stage for PrerequisiteStage {
    fn name(&self) -> &str {
        "prerequisites"
    }

    fn phase(&self) -> PipelinePhase {
        PipelinePhase::CheckingPrereqs
    }

    async fn execute(&self, ctx: &StageContext) -> DeployResult<StageOutput> {
        let config = ctx.config();
        let mut output = StageOutput::ok_empty();

        for tool in [&config.container_engine, &config.cluster_cli] {
            let path = ctx
                .runner()
                .locate(tool)
                .await
                .ok_or_else(|| DeployflowError::missing_tool(tool.as_str()))?;
            debug!(tool = %tool, path = %path.display(), "found required tool");
            output = output.with_value(tool.as_str(), serde_json::json!(path.display().to_string()));
        }

        for tool in &config.optional_tools {
            match ctx.runner().locate(tool).await {
                Some(path) => {
                    debug!(tool = %tool, path = %path.display(), "found optional tool");
                    output = output.with_value(tool.as_str(), serde_json::json!(path.display().to_string()));
                }
                None => {
                    warn!(tool = %tool, "optional tool not found, continuing");
                    output = output.with_warning(format!("optional tool '{tool}' not found"));
                }
            }
        }

        Ok(output)
    }
}
