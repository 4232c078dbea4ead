//! Error types for deployflow.
//!
//! Every external invocation reports through [`DeployflowError`]. The
//! orchestrator wraps the error of a fatal step in a [`StepFailure`] so the
//! failing step is always named in diagnostics and notifications.

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type DeployResult<T> = Result<T, DeployflowError>;

/// The main error type for deployflow operations.
#[derive(Debug, Error)]
pub enum DeployflowError {
    /// A required binary is not on the execution path.
    #[error("Required tool not found on PATH: {tool}")]
    MissingTool {
        /// The binary name.
        tool: String,
    },

    /// An external command exited unsuccessfully.
    #[error("Command failed: `{command}` exited with {}{}", exit_code_label(*exit_code), stderr_suffix(stderr))]
    CommandFailure {
        /// The rendered command line.
        command: String,
        /// Exit code, `None` when terminated by a signal.
        exit_code: Option<i32>,
        /// Captured standard error (trimmed).
        stderr: String,
    },

    /// An external command exceeded its time limit.
    #[error("Command timed out after {}s: `{command}`", limit.as_secs())]
    Timeout {
        /// The rendered command line.
        command: String,
        /// The limit that elapsed.
        limit: Duration,
    },

    /// The external command could not be started at all.
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        /// The rendered command line.
        command: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The health endpoint did not answer with a 2xx status.
    #[error("Health check failed for {url}: {reason}")]
    HealthCheck {
        /// The probed URL.
        url: String,
        /// Status code or transport error text.
        reason: String,
    },

    /// An HTTP request could not be completed.
    #[error("HTTP request to {url} failed: {reason}")]
    Http {
        /// Target URL.
        url: String,
        /// Transport error text.
        reason: String,
    },

    /// Delivering a notification failed.
    #[error("Notification delivery failed: {0}")]
    Notification(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_code_label(code: Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("status {c}"))
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

impl DeployflowError {
    /// Creates a missing tool error.
    #[must_use]
    pub fn missing_tool(tool: impl Into<String>) -> Self {
        Self::MissingTool { tool: tool.into() }
    }

    /// Creates a command failure error.
    #[must_use]
    pub fn command_failure(
        command: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailure {
            command: command.into(),
            exit_code,
            stderr: stderr.into().trim().to_string(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(command: impl Into<String>, limit: Duration) -> Self {
        Self::Timeout {
            command: command.into(),
            limit,
        }
    }

    /// Creates a health check error.
    #[must_use]
    pub fn health_check(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HealthCheck {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an HTTP transport error.
    #[must_use]
    pub fn http(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Http {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingTool { .. } => "MissingTool",
            // A rollout timeout is surfaced as a failed command.
            Self::CommandFailure { .. } | Self::Timeout { .. } | Self::Spawn { .. } => {
                "CommandFailure"
            }
            Self::HealthCheck { .. } => "HealthCheckFailure",
            Self::Http { .. } => "HttpFailure",
            Self::Notification(_) => "NotificationFailure",
            Self::Config(_) => "ConfigError",
            Self::Serialization(_) => "SerializationError",
            Self::Io(_) => "IoError",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        match self {
            Self::MissingTool { tool } => {
                map.insert("tool".to_string(), serde_json::json!(tool));
            }
            Self::CommandFailure {
                command, exit_code, ..
            } => {
                map.insert("command".to_string(), serde_json::json!(command));
                map.insert("exit_code".to_string(), serde_json::json!(exit_code));
            }
            Self::Timeout { command, limit } => {
                map.insert("command".to_string(), serde_json::json!(command));
                map.insert("timeout_seconds".to_string(), serde_json::json!(limit.as_secs()));
            }
            Self::Spawn { command, .. } => {
                map.insert("command".to_string(), serde_json::json!(command));
            }
            Self::HealthCheck { url, .. } | Self::Http { url, .. } => {
                map.insert("url".to_string(), serde_json::json!(url));
            }
            _ => {}
        }
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// A fatal failure of a named pipeline step.
#[derive(Debug, Error)]
#[error("Step '{step}' failed: {source}")]
pub struct StepFailure {
    /// The failing step.
    pub step: String,
    /// The underlying error.
    #[source]
    pub source: DeployflowError,
}

impl StepFailure {
    /// Creates a new step failure.
    #[must_use]
    pub fn new(step: impl Into<String>, source: DeployflowError) -> Self {
        Self {
            step: step.into(),
            source,
        }
    }
}
