//! Stage status and pipeline phase enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage completed successfully.
    Ok,
    /// Stage completed but reported a non-fatal problem.
    Warn,
    /// Stage failed.
    Fail,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Warn => write!(f, "warn"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status lets the pipeline continue.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Warn)
    }
}

/// Phase of a deployment run.
///
/// Phases advance strictly in declaration order. Any non-terminal phase may
/// jump to [`PipelinePhase::NotifiedFailure`], which is followed only by
/// [`PipelinePhase::Terminated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    /// Nothing has run yet.
    #[default]
    Idle,
    /// Looking for required binaries.
    CheckingPrereqs,
    /// Building the container image.
    Building,
    /// Pushing the image to the registry.
    Pushing,
    /// Applying manifests and waiting for rollout.
    Deploying,
    /// Probing the service health endpoint.
    HealthChecking,
    /// Running the in-cluster smoke probe.
    SmokeTesting,
    /// Pruning old replica sets.
    CleaningUp,
    /// Success notification fired; exit 0.
    NotifiedSuccess,
    /// Failure notification fired.
    NotifiedFailure,
    /// Run ended with a non-zero status.
    Terminated,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::CheckingPrereqs => "checking_prereqs",
            Self::Building => "building",
            Self::Pushing => "pushing",
            Self::Deploying => "deploying",
            Self::HealthChecking => "health_checking",
            Self::SmokeTesting => "smoke_testing",
            Self::CleaningUp => "cleaning_up",
            Self::NotifiedSuccess => "notified_success",
            Self::NotifiedFailure => "notified_failure",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

impl PipelinePhase {
    const ORDER: [Self; 9] = [
        Self::Idle,
        Self::CheckingPrereqs,
        Self::Building,
        Self::Pushing,
        Self::Deploying,
        Self::HealthChecking,
        Self::SmokeTesting,
        Self::CleaningUp,
        Self::NotifiedSuccess,
    ];

    fn position(self) -> Option<usize> {
        Self::ORDER.iter().position(|p| *p == self)
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NotifiedSuccess | Self::Terminated)
    }

    /// Returns true if `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        match (*self, next) {
            (Self::NotifiedFailure, Self::Terminated) => true,
            (from, Self::NotifiedFailure) => !from.is_terminal() && from != Self::NotifiedFailure,
            (from, to) => match (from.position(), to.position()) {
                (Some(a), Some(b)) => b == a + 1,
                _ => false,
            },
        }
    }

    /// Process exit code associated with a terminal phase.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NotifiedSuccess => Some(0),
            Self::Terminated => Some(1),
            _ => None,
        }
    }
}
