//! Containerized builds in builder images.
//!
//! Each job runs in its own container. Against a local daemon the working
//! tree and Go caches are bind-mounted; against a remote daemon (`DOCKER_HOST`
//! set) they are copied in, and the produced `.build` tree is copied back out.
//! Copy-outs share one lock so only one runs at a time; creating, starting and
//! removing containers is not serialized.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use shipwright_core::naming::{container_name, BUILD_DIR};
use shipwright_core::{PlatformSpec, ToolchainImage};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{BuildError, Result};
use crate::job::{BuildJob, JobExecutor, JobTarget};
use crate::runner::{CommandSpec, ProcessRunner};

/// Environment variable pointing the runtime CLI at a remote daemon.
pub const DOCKER_HOST_ENV: &str = "DOCKER_HOST";

const APP_DIR: &str = "/app";
const CACHE_DIR: &str = ".cache";
const CONTAINER_GOCACHE: &str = "/go/.cache/go-build";

/// Where and how builder containers run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSettings {
    /// Runtime CLI (`docker`, `podman`).
    pub runtime: String,
    /// Working tree mounted or copied to `/app`.
    pub workdir: PathBuf,
    /// Go workspace whose `pkg/` is shared with the container.
    pub gopath: PathBuf,
    /// Go import path passed to the builder.
    pub repo_path: String,
    /// The daemon is across a network boundary; bind mounts are unavailable.
    pub remote: bool,
}

impl ContainerSettings {
    /// Settings for `workdir` using `GOPATH` and `DOCKER_HOST` from the environment.
    pub fn from_env(runtime: impl Into<String>, workdir: PathBuf, repo_path: impl Into<String>) -> Self {
        let remote = std::env::var(DOCKER_HOST_ENV)
            .map(|h| !h.trim().is_empty())
            .unwrap_or(false);
        Self {
            runtime: runtime.into(),
            workdir,
            gopath: default_gopath(),
            repo_path: repo_path.into(),
            remote,
        }
    }
}

/// First `GOPATH` entry, else `$HOME/go`.
pub fn default_gopath() -> PathBuf {
    if let Some(first) = std::env::var_os("GOPATH")
        .as_deref()
        .and_then(|p| std::env::split_paths(p).next())
        .filter(|p| !p.as_os_str().is_empty())
    {
        return first;
    }
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join("go"))
        .unwrap_or_else(|| PathBuf::from("go"))
}

fn dir_arg(path: &Path, suffix: &str) -> String {
    format!("{}/{}", path.to_string_lossy().trim_end_matches('/'), suffix)
}

/// Runs container jobs through a runtime CLI.
pub struct ContainerExecutor {
    runner: Arc<dyn ProcessRunner>,
    settings: ContainerSettings,
    copy_out: Arc<Mutex<()>>,
}

impl ContainerExecutor {
    pub fn new(runner: Arc<dyn ProcessRunner>, settings: ContainerSettings) -> Self {
        Self {
            runner,
            settings,
            copy_out: Arc::new(Mutex::new(())),
        }
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    fn runtime(&self) -> CommandSpec {
        CommandSpec::new(&self.settings.runtime)
    }

    /// Pull `image`. Failure is fatal to the run.
    pub async fn pull(&self, image: &ToolchainImage) -> Result<()> {
        debug!(image = %image, "pulling builder image");
        let cmd = self.runtime().args(["pull", image.reference.as_str()]);
        self.runner
            .run(&cmd)
            .await
            .map_err(|e| BuildError::ImagePull {
                image: image.reference.clone(),
                reason: e.to_string(),
            })
    }

    /// `create` invocation for a job's container.
    pub fn create_command(&self, name: &str, image: &ToolchainImage, platform: &PlatformSpec) -> CommandSpec {
        let mut cmd = self.runtime().args(["create", "-t", "--name", name]);

        if !self.settings.remote {
            let workdir = &self.settings.workdir;
            cmd = cmd
                .arg("-v")
                .arg(format!("{}:/go/pkg/", dir_arg(&self.settings.gopath, "pkg/")))
                .arg("-v")
                .arg(format!("{}:{APP_DIR}/", dir_arg(workdir, ".")))
                .arg("-v")
                .arg(format!(
                    "{}:{CONTAINER_GOCACHE}/",
                    dir_arg(workdir, ".cache/go-build/")
                ))
                .arg("--env")
                .arg(format!("GOCACHE={CONTAINER_GOCACHE}"));
        }

        cmd.arg(image.reference.as_str())
            .args(["-i", self.settings.repo_path.as_str()])
            .args(["-p".to_string(), platform.to_string()])
    }

    async fn copy_in(&self, name: &str) -> Result<()> {
        let mut entries = tokio::fs::read_dir(&self.settings.workdir).await?;
        let mut sources = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            if file_name == BUILD_DIR || file_name == CACHE_DIR {
                continue;
            }
            sources.push(entry.path());
        }
        sources.sort();

        for source in sources {
            let cmd = self.runtime().args([
                "cp".to_string(),
                source.to_string_lossy().to_string(),
                format!("{name}:{APP_DIR}/"),
            ]);
            self.runner.run(&cmd).await?;
        }

        let cmd = self.runtime().args([
            "cp".to_string(),
            dir_arg(&self.settings.gopath, "pkg/"),
            format!("{name}:/go/pkg/"),
        ]);
        self.runner.run(&cmd).await
    }

    async fn copy_out(&self, name: &str) -> Result<()> {
        let _guard = self.copy_out.lock().await;
        let dest = self.settings.workdir.join(BUILD_DIR);
        tokio::fs::create_dir_all(&dest).await?;
        let cmd = self.runtime().args([
            "cp".to_string(),
            "-a".to_string(),
            format!("{name}:{APP_DIR}/{BUILD_DIR}/."),
            dest.to_string_lossy().to_string(),
        ]);
        self.runner.run(&cmd).await
    }

    async fn build_in(&self, name: &str, image: &ToolchainImage, platform: &PlatformSpec) -> Result<()> {
        if self.settings.remote {
            self.copy_in(name).await?;
        }
        self.runner
            .run(&self.runtime().args(["start", "-a", name]))
            .await?;
        if self.settings.remote {
            self.copy_out(name).await?;
        }
        debug!(container = name, image = %image, platform = %platform, "container build done");
        Ok(())
    }
}

#[async_trait]
impl JobExecutor for ContainerExecutor {
    async fn execute(&self, job: &BuildJob) -> Result<()> {
        let JobTarget::Container { image } = &job.target else {
            return Err(BuildError::UnsupportedJob {
                job: job.name.clone(),
                executor: "container",
            });
        };

        if !self.settings.remote {
            tokio::fs::create_dir_all(self.settings.workdir.join(CACHE_DIR).join("go-build")).await?;
        }

        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        let name = container_name(&job.name, created);

        self.runner
            .run(&self.create_command(&name, image, &job.platform))
            .await?;

        let built = self.build_in(&name, image, &job.platform).await;

        let removed = self
            .runner
            .run(&self.runtime().args(["rm", "-f", name.as_str()]))
            .await;
        if let Err(e) = &removed {
            warn!(container = %name, error = %e, "failed to remove container");
        }

        built.and(removed)
    }
}
