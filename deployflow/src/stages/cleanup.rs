//! Replica set pruning.

use super::Stage;
use crate::context::StageContext;
use crate::core::{PipelinePhase, StageOutput};
use crate::errors::DeployResult;
use crate::exec::CommandSpec;
use crate::pipeline::FailureMode;
use async_trait::async_trait;
use tracing::info;

/// Names to delete from a creation-ordered (oldest first) list so that only
/// the newest `keep` remain.
#[must_use]
pub fn replica_sets_to_prune(names_oldest_first: &[String], keep: usize) -> &[String] {
    let excess = names_oldest_first.len().saturating_sub(keep);
    &names_oldest_first[..excess]
}

/// Deletes all but the newest replica sets of the application.
///
/// Runs best-effort: the orchestrator logs its failure and carries on.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupStage;

#[async_trait]
impl Stage for CleanupStage {
    fn name(&self) -> &str {
        "cleanup"
    }

    fn phase(&self) -> PipelinePhase {
        PipelinePhase::CleaningUp
    }

    fn failure_mode(&self) -> FailureMode {
        FailureMode::BestEffort
    }

    async fn execute(&self, ctx: &StageContext) -> DeployResult<StageOutput> {
        let config = ctx.config();
        let namespace = ctx.request().namespace();

        // Oldest first.
        let list = CommandSpec::new(config.cluster_cli.as_str())
            .args(["get", "replicasets", "-n", namespace])
            .arg("-l")
            .arg(format!("app={}", config.app_name))
            .arg("--sort-by=.metadata.creationTimestamp")
            .args(["-o", "jsonpath={.items[*].metadata.name}"]);

        let stdout = ctx.runner().run_checked(&list).await?.stdout_text();
        let names: Vec<String> = stdout.split_whitespace().map(str::to_string).collect();
        let prune = replica_sets_to_prune(&names, config.keep_replica_sets);

        if prune.is_empty() {
            info!(existing = names.len(), "no replica sets to prune");
        } else {
            info!(count = prune.len(), "pruning old replica sets");
            let delete = CommandSpec::new(config.cluster_cli.as_str())
                .args(["delete", "replicaset"])
                .args(prune.iter().cloned())
                .args(["-n", namespace]);
            ctx.runner().run_checked(&delete).await?;
        }

        Ok(StageOutput::ok_value("pruned", serde_json::json!(prune)))
    }
}
