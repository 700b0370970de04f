//! Shipwright Core Library
//!
//! Pure building blocks for cross-platform Go builds:
//! - platform classification and toolchain image resolution
//! - typed configuration loaded from `.shipwright.toml`
//! - linker flag composition and artifact naming
//! - project identity discovery from git

pub mod classifier;
pub mod concurrency;
pub mod config;
pub mod domain;
pub mod flags;
pub mod git;
pub mod naming;
pub mod telemetry;
pub mod toolchain;

/// Shipwright version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use classifier::{Classification, PlatformClassifier, PLATFORM_ALIASES};
pub use concurrency::{resolve_concurrency, resolve_concurrency_from_env, CONCURRENCY_ENV};
pub use config::{Binary, Config, CONFIG_FILE_NAME};
pub use domain::{CoreError, PlatformSpec, ProjectIdentity, Result};
pub use flags::{split_parameters, BuildStamp, FlagComposer};
pub use git::{discover_identity, is_git_repo};
pub use telemetry::init_tracing;
pub use toolchain::{ImageResolver, ToolchainImage};
