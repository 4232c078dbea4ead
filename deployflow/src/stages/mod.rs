//! Stage trait and the deployment steps.
//!
//! Stages are the units of work the orchestrator sequences. Each one wraps
//! one or more external invocations and returns `Err` on the first one
//! that fails.

mod cleanup;
mod deploy;
mod health;
mod image;
mod prereq;
mod result;
mod smoke;

pub use cleanup::{replica_sets_to_prune, CleanupStage};
pub use deploy::DeployStage;
pub use health::HealthCheckStage;
pub use image::{BuildStage, PushStage};
pub use prereq::PrerequisiteStage;
pub use result::StageResult;
pub use smoke::SmokeTestStage;

use crate::context::StageContext;
use crate::core::{PipelinePhase, StageOutput};
use crate::errors::DeployResult;
use crate::pipeline::FailureMode;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Pipeline phase entered while this stage runs.
    fn phase(&self) -> PipelinePhase;

    /// How a failure of this stage is handled.
    fn failure_mode(&self) -> FailureMode {
        FailureMode::FailFast
    }

    /// Executes the stage.
    async fn execute(&self, ctx: &StageContext) -> DeployResult<StageOutput>;
}
