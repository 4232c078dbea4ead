//! Core domain model types for deployflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage status and the pipeline phase state machine
//! - Stage output type with factory methods

mod output;
mod status;

pub use output::StageOutput;
pub use status::{PipelinePhase, StageStatus};
