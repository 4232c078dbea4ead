//! Test assertions for run reports.

use crate::core::{PipelinePhase, StageStatus};
use crate::pipeline::RunReport;

/// Asserts that the run ended in success.
pub fn assert_run_succeeded(report: &RunReport) {
    assert!(
        report.is_success(),
        "Expected success, run failed at {:?}: {:?}",
        report.failed_step,
        report.error
    );
    assert_eq!(report.phase, PipelinePhase::NotifiedSuccess);
}

/// Asserts that the run failed at `step`.
pub fn assert_run_failed_at(report: &RunReport, step: &str) {
    assert_eq!(
        report.failed_step.as_deref(),
        Some(step),
        "Expected failure at '{}', got {:?}",
        step,
        report.failed_step
    );
    assert_eq!(report.phase, PipelinePhase::Terminated);
}

/// Asserts the names of the executed steps, in order.
pub fn assert_steps(report: &RunReport, expected: &[&str]) {
    let actual: Vec<&str> = report.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(actual, expected, "Unexpected executed steps");
}

/// Asserts the status recorded for `step`.
pub fn assert_step_status(report: &RunReport, step: &str, expected: StageStatus) {
    let result = report
        .step(step)
        .unwrap_or_else(|| panic!("Step '{step}' did not run"));
    assert_eq!(
        result.status, expected,
        "Expected status {:?} for '{}', got {:?}",
        expected, step, result.status
    );
}

/// Asserts that every recorded phase change is a legal transition.
pub fn assert_phase_history_valid(report: &RunReport) {
    for pair in report.phase_history.windows(2) {
        assert!(
            pair[0].can_transition_to(pair[1]),
            "Illegal transition {} -> {} in {:?}",
            pair[0],
            pair[1],
            report.phase_history
        );
    }
}
