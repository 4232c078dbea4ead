//! Pipeline execution.
//!
//! This module provides:
//! - The deployment pipeline and its single failure guard
//! - Failure tolerance modes
//! - Retry and backoff utilities
//! - The run report

mod failure_tolerance;
mod orchestrator;
mod report;
mod retry;

pub use failure_tolerance::{FailureMode, FailureRecord};
pub use orchestrator::{run, DeploymentPipeline};
pub use report::RunReport;
pub use retry::{
    should_retry, with_retry, BackoffStrategy, JitterStrategy, RetryConfig, RetryDecision,
    RetryState,
};

#[cfg(test)]
mod integration_tests;
