//! # Deployflow
//!
//! Builds a container image, pushes it, rolls it out to a Kubernetes
//! namespace and verifies it, as one ordered pipeline with a single failure
//! guard.
//!
//! Deployflow provides:
//!
//! - **Ordered steps**: prerequisites, build, push, deploy, health check,
//!   smoke test and cleanup, each a [`stages::Stage`]
//! - **One failure guard**: the first fatal step error stops the run and
//!   produces exactly one error notification
//! - **Pluggable effects**: commands go through [`exec::CommandRunner`] and
//!   HTTP through [`http::HttpTransport`], so runs can be scripted or dry
//! - **Event-driven observability**: step events flow into an
//!   [`events::EventSink`] and structured `tracing` logs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deployflow::prelude::*;
//!
//! let config = DeployConfig::from_env();
//! let report = deployflow::pipeline::run(Some("production"), Some("v2.3.1"), config).await?;
//! std::process::exit(report.exit_code());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod exec;
pub mod http;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{DeployConfig, SettleStrategy};
    pub use crate::context::{DeploymentRequest, StageContext};
    pub use crate::core::{PipelinePhase, StageOutput, StageStatus};
    pub use crate::errors::{DeployResult, DeployflowError, StepFailure};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::exec::{CommandOutput, CommandRunner, CommandSpec, SystemCommandRunner};
    pub use crate::http::{HttpTransport, ReqwestTransport};
    pub use crate::notify::{NotificationEvent, NotificationStatus, Notifier};
    pub use crate::pipeline::{DeploymentPipeline, FailureMode, RetryConfig, RunReport};
    pub use crate::stages::Stage;
}
