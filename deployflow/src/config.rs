//! Deployment configuration.
//!
//! Everything a run needs besides the environment/version pair. Values come
//! from [`DeployConfig::default`], optionally overridden by environment
//! variables through [`DeployConfig::from_env`] and then by CLI flags.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::RetryConfig;

/// Environment variable holding the chat webhook URL.
pub const WEBHOOK_ENV: &str = "SLACK_WEBHOOK";

/// How the health step waits for the service to settle before probing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SettleStrategy {
    /// Unconditional pause, then a single probe.
    Fixed {
        /// Pause length in seconds.
        seconds: u64,
    },
    /// Probe repeatedly with backoff until healthy or attempts run out.
    Poll(RetryConfig),
}

impl Default for SettleStrategy {
    fn default() -> Self {
        Self::Fixed {
            seconds: default_settle_seconds(),
        }
    }
}

/// Configuration for a deployment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Image registry host (and optional path prefix).
    #[serde(default = "default_registry")]
    pub registry: String,
    /// Image repository name.
    #[serde(default = "default_image_name")]
    pub image_name: String,
    /// Deployment, container and service name in the cluster.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Prefix prepended to the environment to form the namespace.
    #[serde(default = "default_namespace_prefix")]
    pub namespace_prefix: String,
    /// Path to the build file.
    #[serde(default = "default_dockerfile")]
    pub dockerfile: PathBuf,
    /// Build context directory.
    #[serde(default = "default_build_context")]
    pub build_context: PathBuf,
    /// Root of the per-environment manifest tree.
    #[serde(default = "default_manifests_dir")]
    pub manifests_dir: PathBuf,
    /// Container engine binary.
    #[serde(default = "default_container_engine")]
    pub container_engine: String,
    /// Cluster CLI binary.
    #[serde(default = "default_cluster_cli")]
    pub cluster_cli: String,
    /// Binaries whose absence only warrants a warning.
    #[serde(default = "default_optional_tools")]
    pub optional_tools: Vec<String>,
    /// Rollout wait limit in seconds.
    #[serde(default = "default_rollout_timeout")]
    pub rollout_timeout_seconds: u64,
    /// Settle behaviour before the health probe.
    #[serde(default)]
    pub settle: SettleStrategy,
    /// Address used when the service has no load-balancer ingress.
    #[serde(default = "default_health_fallback")]
    pub health_fallback_address: String,
    /// Path probed on the service.
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Image used for the disposable smoke-test pod.
    #[serde(default = "default_smoke_image")]
    pub smoke_image: String,
    /// Number of replica sets retained by cleanup.
    #[serde(default = "default_keep_replica_sets")]
    pub keep_replica_sets: usize,
    /// Chat webhook for terminal notifications.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Log commands instead of executing them.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_registry() -> String {
    "localhost:5000".to_string()
}

fn default_image_name() -> String {
    "test-automation".to_string()
}

fn default_app_name() -> String {
    "test-automation".to_string()
}

fn default_namespace_prefix() -> String {
    "test-automation-".to_string()
}

fn default_dockerfile() -> PathBuf {
    PathBuf::from("docker/Dockerfile")
}

fn default_build_context() -> PathBuf {
    PathBuf::from(".")
}

fn default_manifests_dir() -> PathBuf {
    PathBuf::from("k8s")
}

fn default_container_engine() -> String {
    "docker".to_string()
}

fn default_cluster_cli() -> String {
    "kubectl".to_string()
}

fn default_optional_tools() -> Vec<String> {
    vec!["helm".to_string()]
}

fn default_rollout_timeout() -> u64 {
    300
}

fn default_settle_seconds() -> u64 {
    30
}

fn default_health_fallback() -> String {
    "localhost".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_smoke_image() -> String {
    "curlimages/curl".to_string()
}

fn default_keep_replica_sets() -> usize {
    3
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            image_name: default_image_name(),
            app_name: default_app_name(),
            namespace_prefix: default_namespace_prefix(),
            dockerfile: default_dockerfile(),
            build_context: default_build_context(),
            manifests_dir: default_manifests_dir(),
            container_engine: default_container_engine(),
            cluster_cli: default_cluster_cli(),
            optional_tools: default_optional_tools(),
            rollout_timeout_seconds: default_rollout_timeout(),
            settle: SettleStrategy::default(),
            health_fallback_address: default_health_fallback(),
            health_path: default_health_path(),
            smoke_image: default_smoke_image(),
            keep_replica_sets: default_keep_replica_sets(),
            webhook_url: None,
            dry_run: false,
        }
    }
}

impl DeployConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults plus the process environment.
    ///
    /// Reads `SLACK_WEBHOOK`, `DEPLOY_REGISTRY`, `DEPLOY_IMAGE_NAME` and
    /// `DEPLOY_MANIFESTS_DIR`. Empty values count as unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`DeployConfig::from_env`] but with an injectable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.webhook_url = get(WEBHOOK_ENV);
        if let Some(registry) = get("DEPLOY_REGISTRY") {
            config.registry = registry;
        }
        if let Some(image) = get("DEPLOY_IMAGE_NAME") {
            config.image_name = image;
        }
        if let Some(dir) = get("DEPLOY_MANIFESTS_DIR") {
            config.manifests_dir = PathBuf::from(dir);
        }
        config
    }

    /// Sets the registry.
    #[must_use]
    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }

    /// Sets the image name.
    #[must_use]
    pub fn with_image_name(mut self, image_name: impl Into<String>) -> Self {
        self.image_name = image_name.into();
        self
    }

    /// Sets the manifests directory.
    #[must_use]
    pub fn with_manifests_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.manifests_dir = dir.into();
        self
    }

    /// Sets the webhook URL.
    #[must_use]
    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    /// Sets the settle strategy.
    #[must_use]
    pub fn with_settle(mut self, settle: SettleStrategy) -> Self {
        self.settle = settle;
        self
    }

    /// Enables or disables dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Rollout wait limit as a Duration.
    #[must_use]
    pub fn rollout_timeout(&self) -> Duration {
        Duration::from_secs(self.rollout_timeout_seconds)
    }

    /// Manifest directory for one kind of resource in one environment.
    #[must_use]
    pub fn manifest_path(&self, environment: &str, kind: &str) -> PathBuf {
        self.manifests_dir.join(environment).join(kind)
    }
}
