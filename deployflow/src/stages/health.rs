//! Post-rollout health probe.

use super::Stage;
use crate::config::SettleStrategy;
use crate::context::StageContext;
use crate::core::{PipelinePhase, StageOutput};
use crate::errors::{DeployResult, DeployflowError};
use crate::exec::CommandSpec;
use crate::http::is_success_status;
use crate::pipeline::with_retry;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

const INGRESS_IP_JSONPATH: &str = "jsonpath={.status.loadBalancer.ingress[0].ip}";

/// Resolves the service address, waits for it to settle and probes the
/// health endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthCheckStage;

impl HealthCheckStage {
    /// Load-balancer ingress IP, or the configured fallback when none is
    /// assigned or the service cannot be queried.
    pub async fn resolve_address(ctx: &StageContext) -> String {
        let config = ctx.config();
        let spec = CommandSpec::new(config.cluster_cli.as_str())
            .args(["get", "service", config.app_name.as_str()])
            .args(["-n", ctx.request().namespace()])
            .args(["-o", INGRESS_IP_JSONPATH]);

        match ctx.runner().run_checked(&spec).await.map(|o| o.stdout_text()) {
            Ok(ip) if !ip.is_empty() => ip,
            Ok(_) => {
                debug!(fallback = %config.health_fallback_address, "no ingress address assigned");
                config.health_fallback_address.clone()
            }
            Err(err) => {
                warn!(
                    error = %err,
                    fallback = %config.health_fallback_address,
                    "service lookup failed, using fallback address"
                );
                config.health_fallback_address.clone()
            }
        }
    }

    async fn probe(ctx: &StageContext, url: &str) -> DeployResult<u16> {
        let status = ctx
            .http()
            .get(url)
            .await
            .map_err(|e| DeployflowError::health_check(url, e.to_string()))?;
        if is_success_status(status) {
            Ok(status)
        } else {
            Err(DeployflowError::health_check(url, format!("status {status}")))
        }
    }
}

#[async_trait]
impl Stage for HealthCheckStage {
    fn name(&self) -> &str {
        "health_check"
    }

    fn phase(&self) -> PipelinePhase {
        PipelinePhase::HealthChecking
    }

    async fn execute(&self, ctx: &StageContext) -> DeployResult<StageOutput> {
        let address = Self::resolve_address(ctx).await;
        let url = format!("http://{address}{}", ctx.config().health_path);

        let status = match &ctx.config().settle {
            SettleStrategy::Fixed { seconds } => {
                info!(seconds, "waiting for service to settle");
                tokio::time::sleep(Duration::from_secs(*seconds)).await;
                Self::probe(ctx, &url).await?
            }
            SettleStrategy::Poll(retry) => {
                info!(max_attempts = retry.max_attempts, "polling health endpoint");
                with_retry(retry, "health_check", || Self::probe(ctx, &url)).await?
            }
        };

        info!(url = %url, status, "service healthy");
        Ok(StageOutput::ok_value("address", serde_json::json!(address))
            .with_value("url", serde_json::json!(url))
            .with_value("status", serde_json::json!(status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CommandOutput;
    use crate::pipeline::{JitterStrategy, RetryConfig};
    use crate::testing::TestHarness;

    #[tokio::test]
    async fn test_uses_ingress_ip() {
        let harness = TestHarness::new();
        harness
            .runner
            .respond("kubectl", &["get", "service"], CommandOutput::success("203.0.113.9\n"));

        let output = HealthCheckStage.execute(&harness.context("dev", "1")).await.unwrap();

        assert_eq!(output.get("address"), Some(&serde_json::json!("203.0.113.9")));
        assert_eq!(harness.transport.gets(), vec!["http://203.0.113.9/health".to_string()]);
    }

    #[tokio::test]
    async fn test_falls_back_without_ingress() {
        let harness = TestHarness::new();
        HealthCheckStage.execute(&harness.context("dev", "1")).await.unwrap();

        assert_eq!(harness.transport.gets(), vec!["http://localhost/health".to_string()]);
    }

    #[tokio::test]
    async fn test_falls_back_when_service_lookup_fails() {
        let harness = TestHarness::new();
        harness.runner.respond(
            "kubectl",
            &["get", "service"],
            CommandOutput::failure(1, "Error from server (NotFound)"),
        );

        let output = HealthCheckStage.execute(&harness.context("dev", "1")).await.unwrap();

        assert_eq!(output.get("address"), Some(&serde_json::json!("localhost")));
        assert_eq!(harness.transport.gets(), vec!["http://localhost/health".to_string()]);
    }

    #[tokio::test]
    async fn test_non_2xx_is_fatal() {
        let harness = TestHarness::new();
        harness.transport.push_get_status(503);

        let err = HealthCheckStage.execute(&harness.context("dev", "1")).await.unwrap_err();
        assert!(matches!(err, DeployflowError::HealthCheck { .. }));
        assert_eq!(harness.transport.gets().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_settle_waits_before_single_probe() {
        let harness = TestHarness::new().with_config(|c| c.with_settle(SettleStrategy::Fixed { seconds: 30 }));
        let start = tokio::time::Instant::now();

        HealthCheckStage.execute(&harness.context("dev", "1")).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(30));
        assert_eq!(harness.transport.gets().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_settle_retries_until_healthy() {
        let retry = RetryConfig::new()
            .with_max_attempts(5)
            .with_base_delay_ms(100)
            .with_jitter(JitterStrategy::None);
        let harness = TestHarness::new().with_config(|c| c.with_settle(SettleStrategy::Poll(retry)));
        harness.transport.push_get_status(503);
        harness.transport.push_get_status(502);

        let output = HealthCheckStage.execute(&harness.context("dev", "1")).await.unwrap();

        assert_eq!(harness.transport.gets().len(), 3);
        assert_eq!(output.get("status"), Some(&serde_json::json!(200)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_settle_gives_up() {
        let retry = RetryConfig::new()
            .with_max_attempts(2)
            .with_base_delay_ms(100)
            .with_jitter(JitterStrategy::None);
        let harness = TestHarness::new().with_config(|c| c.with_settle(SettleStrategy::Poll(retry)));
        for _ in 0..5 {
            harness.transport.push_get_status(503);
        }

        let err = HealthCheckStage.execute(&harness.context("dev", "1")).await.unwrap_err();
        assert!(matches!(err, DeployflowError::HealthCheck { .. }));
        assert_eq!(harness.transport.gets().len(), 2);
    }
}
