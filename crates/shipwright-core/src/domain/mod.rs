//! Domain models for Shipwright.
//!
//! Canonical definitions for the core entities:
//! - `PlatformSpec`: an `os/arch` cross-compilation target
//! - `ProjectIdentity`: name, owner, repository, branch, revision and version

pub mod error;
pub mod platform;
pub mod project;

// Re-export main types and errors
pub use error::{CoreError, Result};
pub use platform::PlatformSpec;
pub use project::ProjectIdentity;
