//! Per-step failure handling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DeployflowError;

/// How the orchestrator treats a step's failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Abort the run and send the failure notification (default).
    #[default]
    FailFast,
    /// Log the failure and carry on with the next step.
    BestEffort,
}

impl FailureMode {
    /// Returns true if a failure in this mode aborts the run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FailFast)
    }
}

/// Record of a step failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Step name.
    pub step: String,
    /// Error message.
    pub error: String,
    /// Error kind, see [`DeployflowError::kind`].
    pub error_type: String,
    /// Whether the run continued past it.
    pub recoverable: bool,
    /// When the failure was observed.
    pub timestamp: DateTime<Utc>,
}

impl FailureRecord {
    /// Creates a record from a step error.
    #[must_use]
    pub fn from_error(step: impl Into<String>, error: &DeployflowError, mode: FailureMode) -> Self {
        Self {
            step: step.into(),
            error: error.to_string(),
            error_type: error.kind().to_string(),
            recoverable: !mode.is_fatal(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fail_fast() {
        assert_eq!(FailureMode::default(), FailureMode::FailFast);
        assert!(FailureMode::FailFast.is_fatal());
        assert!(!FailureMode::BestEffort.is_fatal());
    }

    #[test]
    fn test_record_from_error() {
        let err = DeployflowError::command_failure("kubectl delete rs a", Some(1), "forbidden");
        let record = FailureRecord::from_error("cleanup", &err, FailureMode::BestEffort);

        assert_eq!(record.step, "cleanup");
        assert_eq!(record.error_type, "CommandFailure");
        assert!(record.recoverable);
        assert!(record.error.contains("forbidden"));
    }
}
