//! Error types for build execution.

use shipwright_core::CoreError;

/// Errors produced while executing builds.
///
/// Job-level variants are captured into the job's result and never abort
/// sibling jobs. [`BuildError::ImagePull`] and [`BuildError::Core`] are raised
/// before dispatch and end the run.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command `{command}` exited with code {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("failed to pull image {image}: {reason}")]
    ImagePull { image: String, reason: String },

    #[error("{executor} executor cannot run job {job}")]
    UnsupportedJob { job: String, executor: &'static str },

    #[error("job {job} panicked")]
    JobPanicked { job: String },

    #[error("job {job} was cancelled")]
    Cancelled { job: String },

    #[error("{failed} of {total} build jobs failed")]
    JobsFailed { failed: usize, total: usize },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;
