//! Command runners.

use super::{CommandOutput, CommandSpec};
use crate::errors::{DeployResult, DeployflowError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::{debug, info};

/// Executes external commands on behalf of the stages.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command to completion.
    ///
    /// A non-zero exit is not an error here; it is reported through
    /// [`CommandOutput::exit_code`]. Errors are reserved for commands that
    /// could not be started or exceeded their timeout.
    async fn run(&self, spec: &CommandSpec) -> DeployResult<CommandOutput>;

    /// Resolves `program` on the execution path.
    async fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Runs the command and turns a non-zero exit into
    /// [`DeployflowError::CommandFailure`].
    async fn run_checked(&self, spec: &CommandSpec) -> DeployResult<CommandOutput> {
        let output = self.run(spec).await?;
        if output.is_success() {
            Ok(output)
        } else {
            Err(DeployflowError::command_failure(
                spec.to_string(),
                output.exit_code,
                output.stderr_text(),
            ))
        }
    }
}

/// Runs commands as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    /// Creates a new system runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> DeployResult<CommandOutput> {
        let rendered = spec.to_string();
        debug!(command = %rendered, "spawning");

        let mut cmd = TokioCommand::new(&spec.program);
        cmd.args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| DeployflowError::Spawn {
            command: rendered.clone(),
            source,
        })?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let (Some(input), Some(mut stdin)) = (spec.stdin.as_deref(), stdin) {
                // The child may exit without reading all of its input.
                if let Err(err) = stdin.write_all(input).await {
                    if err.kind() != ErrorKind::BrokenPipe {
                        return Err(err);
                    }
                }
                // Dropping stdin here signals EOF.
            }
            Ok::<(), std::io::Error>(())
        };
        // Output is drained while stdin is written, so a child echoing its
        // input cannot fill the pipe and stall the write.
        let interaction = async move {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed?;
            output
        };

        let output = match spec.timeout {
            Some(limit) => timeout(limit, interaction)
                .await
                .map_err(|_| DeployflowError::timeout(rendered.clone(), limit))??,
            None => interaction.await?,
        };

        let output = CommandOutput::from(output);
        debug!(command = %rendered, exit_code = ?output.exit_code, "finished");
        Ok(output)
    }

    async fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// Logs every command instead of executing it.
///
/// Every command reports success with empty output and every tool is
/// considered present.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunCommandRunner;

impl DryRunCommandRunner {
    /// Creates a new dry-run runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for DryRunCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> DeployResult<CommandOutput> {
        info!(command = %spec, "[dry-run] would execute");
        Ok(CommandOutput::success(Vec::new()))
    }

    async fn locate(&self, program: &str) -> Option<PathBuf> {
        Some(PathBuf::from(program))
    }
}
