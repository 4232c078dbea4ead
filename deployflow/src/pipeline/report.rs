//! Outcome of a deployment run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use tracing::warn;
use uuid::Uuid;

use super::FailureRecord;
use crate::context::DeploymentRequest;
use crate::core::PipelinePhase;
use crate::errors::DeployResult;
use crate::notify::NotificationStatus;
use crate::stages::StageResult;

/// Everything observed during one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Run id, also attached to every event.
    pub run_id: Uuid,
    /// The resolved request.
    pub request: DeploymentRequest,
    /// Final phase.
    pub phase: PipelinePhase,
    /// Every phase entered, starting with idle.
    pub phase_history: Vec<PipelinePhase>,
    /// Executed steps, in order.
    pub steps: Vec<StageResult>,
    /// Step that aborted the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    /// Error that aborted the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// All step failures, fatal or not.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureRecord>,
    /// Notification that was attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationStatus>,
    /// Why the notification could not be delivered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_error: Option<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub ended_at: DateTime<Utc>,
}

impl RunReport {
    pub(crate) fn start(run_id: Uuid, request: DeploymentRequest) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            request,
            phase: PipelinePhase::Idle,
            phase_history: vec![PipelinePhase::Idle],
            steps: Vec::new(),
            failed_step: None,
            error: None,
            failures: Vec::new(),
            notification: None,
            notification_error: None,
            started_at: now,
            ended_at: now,
        }
    }

    /// Moves to `next`, recording it in the history.
    pub(crate) fn advance(&mut self, next: PipelinePhase) {
        if !self.phase.can_transition_to(next) {
            warn!(from = %self.phase, to = %next, "out-of-order phase transition");
        }
        self.phase = next;
        self.phase_history.push(next);
    }

    pub(crate) fn finish(&mut self) {
        self.ended_at = Utc::now();
    }

    /// Returns true if no fatal step failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed_step.is_none()
    }

    /// Result of the named step, if it ran.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&StageResult> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Total run time in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }

    /// 0 on success, 1 on failure.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.phase.exit_code() {
            Some(code) => code,
            None if self.is_success() => 0,
            None => 1,
        }
    }

    /// Writes the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> DeployResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Process exit status for this run.
    #[must_use]
    pub fn exit_status(&self) -> ExitCode {
        if self.exit_code() == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}
