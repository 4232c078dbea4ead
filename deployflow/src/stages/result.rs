//! Per-step execution records.

use crate::core::StageStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Timing and outcome of one executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub name: String,
    /// Final status.
    pub status: StageStatus,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage ended.
    pub ended_at: DateTime<Utc>,
    /// Result data.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, serde_json::Value>,
    /// Non-fatal problems.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    /// Creates a finished result from a stage output.
    #[must_use]
    pub fn from_output(
        name: impl Into<String>,
        started_at: DateTime<Utc>,
        output: crate::core::StageOutput,
    ) -> Self {
        Self {
            name: name.into(),
            status: output.status,
            started_at,
            ended_at: Utc::now(),
            data: output.data,
            warnings: output.warnings,
            error: None,
        }
    }

    /// Creates a failed stage result.
    #[must_use]
    pub fn failed(name: impl Into<String>, started_at: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StageStatus::Fail,
            started_at,
            ended_at: Utc::now(),
            data: HashMap::new(),
            warnings: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
