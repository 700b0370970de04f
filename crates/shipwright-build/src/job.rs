//! Build jobs and their results.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use shipwright_core::{Binary, PlatformSpec, ToolchainImage};

use crate::error::Result;

/// What a job produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTarget {
    /// Compile one binary with the local toolchain into `output`.
    Binary { binary: Binary, output: PathBuf },
    /// Build the whole project inside a builder container.
    Container { image: ToolchainImage },
}

/// One unit of scheduled work. Consumed by the scheduler when dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJob {
    pub name: String,
    pub platform: PlatformSpec,
    pub target: JobTarget,
}

impl BuildJob {
    pub fn binary(binary: Binary, platform: PlatformSpec, output: PathBuf) -> Self {
        Self {
            name: format!("{}-{}", binary.name, platform.dir_name()),
            platform,
            target: JobTarget::Binary { binary, output },
        }
    }

    pub fn container(name: impl Into<String>, image: ToolchainImage, platform: PlatformSpec) -> Self {
        Self {
            name: name.into(),
            platform,
            target: JobTarget::Container { image },
        }
    }
}

/// Outcome of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildResult {
    pub job_name: String,
    pub platform: String,
    pub duration_ms: u64,
    /// `None` when the job succeeded.
    pub error: Option<String>,
}

impl BuildResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Executes one job. Errors are captured by the scheduler, never propagated.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, job: &BuildJob) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_job_name_includes_platform() {
        let job = BuildJob::binary(
            Binary {
                name: "promu".to_string(),
                path: ".".to_string(),
            },
            PlatformSpec::parse("linux/armv7").unwrap(),
            PathBuf::from("promu"),
        );
        assert_eq!(job.name, "promu-linux-armv7");
    }

    #[test]
    fn test_result_success_flag() {
        let ok = BuildResult {
            job_name: "a".to_string(),
            platform: "linux/amd64".to_string(),
            duration_ms: 5,
            error: None,
        };
        let failed = BuildResult {
            error: Some("boom".to_string()),
            ..ok.clone()
        };
        assert!(ok.succeeded());
        assert!(!failed.succeeded());
    }
}
