//! Stage output type with factory methods.

use super::StageStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The output of a successful stage execution.
///
/// Failures are not represented here; a failing stage returns an error
/// instead so the orchestrator can short-circuit on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutput {
    /// The status of the stage execution.
    pub status: StageStatus,

    /// Values the stage wants to surface (resolved address, pruned names...).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, serde_json::Value>,

    /// Non-fatal problems encountered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Default for StageOutput {
    fn default() -> Self {
        Self::ok_empty()
    }
}

impl StageOutput {
    /// Creates a successful output with data.
    #[must_use]
    pub fn ok(data: HashMap<String, serde_json::Value>) -> Self {
        Self {
            status: StageStatus::Ok,
            data,
            warnings: Vec::new(),
        }
    }

    /// Creates a successful output with no data.
    #[must_use]
    pub fn ok_empty() -> Self {
        Self::ok(HashMap::new())
    }

    /// Creates a successful output with a single value.
    #[must_use]
    pub fn ok_value(key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut data = HashMap::new();
        data.insert(key.into(), value);
        Self::ok(data)
    }

    /// Creates an output that completed with a warning.
    #[must_use]
    pub fn warn(warning: impl Into<String>) -> Self {
        Self::ok_empty().with_warning(warning)
    }

    /// Records a warning, downgrading the status to [`StageStatus::Warn`].
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.status = StageStatus::Warn;
        self.warnings.push(warning.into());
        self
    }

    /// Adds a single data entry.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns true if the output indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if any warning was recorded.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Gets a value from the data.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_empty() {
        let output = StageOutput::ok_empty();
        assert_eq!(output.status, StageStatus::Ok);
        assert!(output.data.is_empty());
        assert!(!output.has_warnings());
    }

    #[test]
    fn test_ok_value() {
        let output = StageOutput::ok_value("address", serde_json::json!("10.0.0.7"));
        assert_eq!(output.get("address"), Some(&serde_json::json!("10.0.0.7")));
    }

    #[test]
    fn test_warning_downgrades_status() {
        let output = StageOutput::ok_value("k", serde_json::json!(1)).with_warning("helm not found");
        assert_eq!(output.status, StageStatus::Warn);
        assert!(output.is_success());
        assert_eq!(output.warnings, vec!["helm not found".to_string()]);
    }

    #[test]
    fn test_serialization_skips_empty() {
        let json = serde_json::to_value(StageOutput::ok_empty()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ok"}));
    }
}
