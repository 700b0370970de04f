//! Shipwright Build
//!
//! Runs build jobs produced from a [`shipwright_core::Config`]:
//! - native `go build` invocations, one job per binary
//! - containerized crossbuilds, one job per platform
//! - a bounded-concurrency scheduler that records every failure

pub mod container;
pub mod error;
pub mod job;
pub mod native;
pub mod pipeline;
pub mod runner;
pub mod scheduler;

// Re-export key types
pub use container::{ContainerExecutor, ContainerSettings};
pub use error::{BuildError, Result};
pub use job::{BuildJob, BuildResult, JobExecutor, JobTarget};
pub use native::NativeExecutor;
pub use pipeline::{build, crossbuild, BuildRequest, CrossbuildPlan};
pub use runner::{CommandSpec, ProcessRunner, SystemRunner};
pub use scheduler::{RunReport, Scheduler};
