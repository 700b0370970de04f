//! External process execution.
//!
//! Compilers and container runtimes are only ever reached through
//! [`ProcessRunner`], so tests can substitute a recording fake.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{BuildError, Result};

/// A fully composed external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Variables added to the inherited environment.
    pub env: Vec<(String, String)>,
    pub dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Value of an added environment variable.
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Argument following `flag`, if present.
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Shell-like rendering for logs and error messages.
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(quote_params(&self.args));
        parts.join(" ")
    }
}

/// Quote arguments containing spaces so a logged command line can be pasted back.
pub fn quote_params(params: &[String]) -> Vec<String> {
    params
        .iter()
        .map(|p| {
            if p.contains(' ') {
                format!("{p:?}")
            } else {
                p.clone()
            }
        })
        .collect()
}

/// Runs external commands to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `cmd`; a non-zero exit is [`BuildError::CommandFailed`].
    async fn run(&self, cmd: &CommandSpec) -> Result<()>;
}

/// Runs commands on the host, streaming their output to this process's stdio.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    verbose: bool,
}

impl SystemRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, cmd: &CommandSpec) -> Result<()> {
        let command_line = cmd.command_line();
        if self.verbose {
            tracing::info!(command = %command_line, "running");
        } else {
            tracing::debug!(command = %command_line, "running");
        }

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .envs(cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &cmd.dir {
            command.current_dir(dir);
        }

        let status = command.status().await.map_err(|source| BuildError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(BuildError::CommandFailed {
                command: command_line,
                code: status.code().unwrap_or(-1),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quotes_spaced_args() {
        let cmd = CommandSpec::new("go")
            .args(["build", "-ldflags"])
            .arg("-X main.Version=1.0 -extldflags '-static'");
        assert_eq!(
            cmd.command_line(),
            "go build -ldflags \"-X main.Version=1.0 -extldflags '-static'\""
        );
    }

    #[test]
    fn test_env_and_arg_lookup() {
        let cmd = CommandSpec::new("go")
            .args(["build", "-o", "out/promu"])
            .env("GOOS", "linux")
            .env("GOOS", "darwin");
        assert_eq!(cmd.env_var("GOOS"), Some("darwin"));
        assert_eq!(cmd.env_var("GOARCH"), None);
        assert_eq!(cmd.arg_after("-o"), Some("out/promu"));
        assert_eq!(cmd.arg_after("out/promu"), None);
    }

    #[tokio::test]
    async fn test_system_runner_success() {
        let runner = SystemRunner::new(true);
        runner.run(&CommandSpec::new("true")).await.expect("true should succeed");
    }

    #[tokio::test]
    async fn test_system_runner_reports_exit_code() {
        let runner = SystemRunner::default();
        let cmd = CommandSpec::new("sh").args(["-c", "exit 3"]);
        let err = runner.run(&cmd).await.unwrap_err();
        assert!(matches!(err, BuildError::CommandFailed { code: 3, .. }), "{err}");
    }

    #[tokio::test]
    async fn test_system_runner_spawn_failure() {
        let runner = SystemRunner::default();
        let err = runner
            .run(&CommandSpec::new("definitely-not-a-real-binary-7f3a"))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_system_runner_applies_env_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = CommandSpec::new("sh")
            .args(["-c", "printf %s \"$SHIPWRIGHT_PROBE\" > probe.txt"])
            .env("SHIPWRIGHT_PROBE", "linux/arm64")
            .current_dir(dir.path());
        SystemRunner::default().run(&cmd).await.unwrap();
        let written = std::fs::read_to_string(dir.path().join("probe.txt")).unwrap();
        assert_eq!(written, "linux/arm64");
    }
}
