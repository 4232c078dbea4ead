//! Deployflow CLI - build, push and roll out one image version.

use anyhow::Context;
use clap::Parser;
use deployflow::config::{DeployConfig, SettleStrategy};
use deployflow::observability::{init_tracing, LogFormat};
use deployflow::pipeline::{self, RetryConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "deployflow")]
#[command(about = "Build, push and roll out a container image to a Kubernetes namespace")]
#[command(version)]
struct Cli {
    /// Target environment (defaults to staging)
    environment: Option<String>,

    /// Image tag to deploy (defaults to latest)
    version: Option<String>,

    /// Container registry host
    #[arg(long, env = "DEPLOY_REGISTRY")]
    registry: Option<String>,

    /// Image repository name
    #[arg(long, env = "DEPLOY_IMAGE_NAME")]
    image_name: Option<String>,

    /// Root directory of the per-environment manifests
    #[arg(long, env = "DEPLOY_MANIFESTS_DIR")]
    manifests_dir: Option<PathBuf>,

    /// Log commands and requests instead of executing them
    #[arg(long)]
    dry_run: bool,

    /// Poll the health endpoint with backoff instead of a fixed pause
    #[arg(long)]
    poll_health: bool,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Log output format (pretty or json)
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,
}

impl Cli {
    fn config(&self) -> DeployConfig {
        let mut config = DeployConfig::from_env().with_dry_run(self.dry_run);
        if let Some(registry) = &self.registry {
            config = config.with_registry(registry.as_str());
        }
        if let Some(image_name) = &self.image_name {
            config = config.with_image_name(image_name.as_str());
        }
        if let Some(dir) = &self.manifests_dir {
            config = config.with_manifests_dir(dir.as_path());
        }
        if self.poll_health {
            config = config.with_settle(SettleStrategy::Poll(RetryConfig::health_poll()));
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    init_tracing(cli.log_format).map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    let report = pipeline::run(
        cli.environment.as_deref(),
        cli.version.as_deref(),
        cli.config(),
    )
    .await
    .context("failed to start deployment")?;

    if let Some(path) = &cli.report_json {
        report
            .write_json(path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    Ok(report.exit_status())
}
