//! Testing utilities for deployment pipelines.
//!
//! This module provides:
//! - A scripted command runner and a recording HTTP transport
//! - A recording notifier and scripted stages
//! - Run report assertions
//! - A harness that wires them into stage contexts

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_phase_history_valid, assert_run_failed_at, assert_run_succeeded, assert_step_status,
    assert_steps,
};
pub use fixtures::TestHarness;
pub use mocks::{RecordingNotifier, RecordingTransport, ScriptedCommandRunner, ScriptedStage};
