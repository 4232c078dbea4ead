//! Context for a deployment run.
//!
//! This module provides:
//! - The immutable deployment request with its derived values
//! - The shared execution context handed to each stage

mod execution;
mod request;

pub use execution::StageContext;
pub use request::{DeploymentRequest, DEFAULT_ENVIRONMENT, DEFAULT_VERSION};
