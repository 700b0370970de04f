//! Native builds with the host Go toolchain.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use shipwright_core::naming::{cross_output_path, native_output_path};
use shipwright_core::{split_parameters, Binary, Config, PlatformSpec};

use crate::error::{BuildError, Result};
use crate::job::{BuildJob, JobExecutor, JobTarget};
use crate::runner::{CommandSpec, ProcessRunner};

/// Go compiler executable.
pub const GO: &str = "go";

/// Join a Go package path the way `path.Join` does: `.` segments vanish and
/// `..` removes the previous segment.
pub fn package_path(repo_path: &str, rel: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in repo_path.split('/').chain(rel.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Where `binary` lands for `platform`: the prefix itself for host builds,
/// the per-platform `.build` directory when a platform was requested.
pub fn output_path(prefix: &Path, binary: &str, platform: &PlatformSpec, explicit: bool) -> PathBuf {
    if explicit {
        cross_output_path(prefix, binary, platform)
    } else {
        native_output_path(prefix, binary, platform)
    }
}

/// One job per binary, all for the same platform.
pub fn plan_jobs(
    prefix: &Path,
    binaries: &[Binary],
    platform: &PlatformSpec,
    explicit: bool,
) -> Vec<BuildJob> {
    binaries
        .iter()
        .map(|binary| {
            let output = output_path(prefix, &binary.name, platform, explicit);
            BuildJob::binary(binary.clone(), platform.clone(), output)
        })
        .collect()
}

/// Compose the compiler invocation for one binary.
pub fn build_command(
    config: &Config,
    ldflags: &str,
    binary: &Binary,
    platform: &PlatformSpec,
    output: &Path,
) -> CommandSpec {
    let mut cmd = CommandSpec::new(GO)
        .args(["build", "-o"])
        .arg(output.to_string_lossy())
        .args(["-ldflags", ldflags])
        .args(split_parameters(&config.build.flags));

    let tags = config.tags_for(platform.os());
    if !tags.is_empty() {
        cmd = cmd.arg("-tags").arg(tags.join(","));
    }

    cmd = cmd
        .arg(package_path(&config.repository.path, &binary.path))
        .env("GOOS", platform.os())
        .env("GOARCH", platform.goarch());
    if let Some(revision) = platform.arm_revision() {
        cmd = cmd.env("GOARM", revision);
    }
    cmd.env("CGO_ENABLED", if config.go.cgo { "1" } else { "0" })
}

/// Runs binary jobs through the host compiler.
///
/// Holds the run's configuration and linker flags read-only; every job gets
/// the same flags.
pub struct NativeExecutor {
    runner: Arc<dyn ProcessRunner>,
    config: Arc<Config>,
    ldflags: Arc<str>,
}

impl NativeExecutor {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: Arc<Config>, ldflags: impl Into<Arc<str>>) -> Self {
        Self {
            runner,
            config,
            ldflags: ldflags.into(),
        }
    }

    pub fn ldflags(&self) -> &str {
        &self.ldflags
    }
}

#[async_trait]
impl JobExecutor for NativeExecutor {
    async fn execute(&self, job: &BuildJob) -> Result<()> {
        let JobTarget::Binary { binary, output } = &job.target else {
            return Err(BuildError::UnsupportedJob {
                job: job.name.clone(),
                executor: "native",
            });
        };

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let cmd = build_command(&self.config, &self.ldflags, binary, &job.platform, output);
        self.runner.run(&cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        let mut config = Config::from_toml_str(
            r#"
[repository]
path = "github.com/prometheus/promu"

[build]
flags = "-a -tags 'netgo osusergo'"

[build.tags]
all = ["netgo"]
windows = ["nowinsvc"]
"#,
        )
        .unwrap();
        config.go.cgo = false;
        config
    }

    fn promtool() -> Binary {
        Binary {
            name: "promtool".to_string(),
            path: "./cmd/promtool".to_string(),
        }
    }

    #[test]
    fn test_package_path_joins_like_go() {
        assert_eq!(package_path("github.com/a/b", "."), "github.com/a/b");
        assert_eq!(package_path("github.com/a/b", "./cmd/x"), "github.com/a/b/cmd/x");
        assert_eq!(package_path("github.com/a/b", "../c"), "github.com/a/c");
    }

    #[test]
    fn test_build_command_for_arm() {
        let platform = PlatformSpec::parse("linux/armv6").unwrap();
        let cmd = build_command(
            &config(),
            "-X main.Version=1.0",
            &promtool(),
            &platform,
            Path::new(".build/linux-armv6/promtool"),
        );
        assert_eq!(cmd.program, "go");
        assert_eq!(
            cmd.args,
            vec![
                "build",
                "-o",
                ".build/linux-armv6/promtool",
                "-ldflags",
                "-X main.Version=1.0",
                "-a",
                "-tags",
                "netgo osusergo",
                "-tags",
                "netgo",
                "github.com/prometheus/promu/cmd/promtool",
            ]
        );
        assert_eq!(cmd.env_var("GOOS"), Some("linux"));
        assert_eq!(cmd.env_var("GOARCH"), Some("arm"));
        assert_eq!(cmd.env_var("GOARM"), Some("6"));
        assert_eq!(cmd.env_var("CGO_ENABLED"), Some("0"));
    }

    #[test]
    fn test_build_command_os_tags_and_cgo() {
        let mut config = config();
        config.go.cgo = true;
        let platform = PlatformSpec::parse("windows/amd64").unwrap();
        let cmd = build_command(&config, "", &promtool(), &platform, Path::new("promtool.exe"));
        assert_eq!(cmd.arg_after("-o"), Some("promtool.exe"));
        assert!(cmd.args.contains(&"netgo,nowinsvc".to_string()));
        assert_eq!(cmd.env_var("GOARM"), None);
        assert_eq!(cmd.env_var("CGO_ENABLED"), Some("1"));
    }

    #[test]
    fn test_plan_jobs_output_locations() {
        let platform = PlatformSpec::parse("darwin/arm64").unwrap();
        let binaries = vec![promtool()];
        let host = plan_jobs(Path::new("dist"), &binaries, &platform, false);
        let cross = plan_jobs(Path::new("dist"), &binaries, &platform, true);
        assert_eq!(
            host[0].target,
            JobTarget::Binary {
                binary: promtool(),
                output: PathBuf::from("dist/promtool"),
            }
        );
        assert_eq!(
            cross[0].target,
            JobTarget::Binary {
                binary: promtool(),
                output: PathBuf::from("dist/.build/darwin-arm64/promtool"),
            }
        );
    }
}
