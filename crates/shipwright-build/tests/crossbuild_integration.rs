//! Integration tests for containerized crossbuilds using a recording runtime.

use async_trait::async_trait;
use shipwright_build::{
    crossbuild, BuildError, CommandSpec, ContainerExecutor, ContainerSettings, ProcessRunner,
};
use shipwright_core::{BuildStamp, Config, CoreError, FlagComposer, ProjectIdentity};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Runtime CLI stand-in that records commands and can fail one subcommand.
#[derive(Default)]
struct RecordingRuntime {
    commands: Mutex<Vec<CommandSpec>>,
    fail_on: Option<&'static str>,
}

impl RecordingRuntime {
    fn with(&self, sub: &str) -> Vec<CommandSpec> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.args.first().map(String::as_str) == Some(sub))
            .cloned()
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.commands.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl ProcessRunner for RecordingRuntime {
    async fn run(&self, cmd: &CommandSpec) -> shipwright_build::Result<()> {
        self.commands.lock().unwrap().push(cmd.clone());
        if cmd.args.first().map(String::as_str) == self.fail_on {
            return Err(BuildError::CommandFailed {
                command: cmd.command_line(),
                code: 1,
            });
        }
        Ok(())
    }
}

fn identity() -> ProjectIdentity {
    ProjectIdentity {
        name: "app".to_string(),
        owner: "acme".to_string(),
        repo: "github.com/acme/app".to_string(),
        branch: "main".to_string(),
        revision: "cafebabe".to_string(),
        version: "2.1.0".to_string(),
    }
}

fn config(toml: &str) -> Config {
    let config = Config::from_toml_str(toml).unwrap().with_defaults(&identity());
    config.validate().unwrap();
    config
}

fn composer(config: &Config) -> FlagComposer {
    let stamp = BuildStamp::from_source_date_epoch(Some("1700000000")).unwrap();
    FlagComposer::from_config(config, identity(), stamp)
}

fn executor(runtime: Arc<RecordingRuntime>, workdir: &Path) -> Arc<ContainerExecutor> {
    let settings = ContainerSettings {
        runtime: "docker".to_string(),
        workdir: workdir.to_path_buf(),
        gopath: workdir.join("gopath"),
        repo_path: "github.com/acme/app".to_string(),
        remote: false,
    };
    Arc::new(ContainerExecutor::new(runtime, settings))
}

const MIXED_FAMILIES: &str = r#"
[repository]
path = "github.com/acme/app"

[go]
cgo = true

[crossbuild]
platforms = ["linux/amd64", "linux/386", "linux/arm64", "linux/arm"]
per_family_images = true
"#;

/// Each distinct builder image is pulled once however many jobs share it.
#[tokio::test]
async fn test_each_image_pulled_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(MIXED_FAMILIES);
    let runtime = Arc::new(RecordingRuntime::default());

    let report = crossbuild(&config, &composer(&config), executor(runtime.clone(), dir.path()), 2)
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.total(), 6);

    let mut pulled: Vec<String> = runtime
        .with("pull")
        .iter()
        .map(|c| c.args[1].clone())
        .collect();
    pulled.sort();
    let before = pulled.len();
    pulled.dedup();
    assert_eq!(before, pulled.len(), "an image was pulled twice");
    assert_eq!(pulled.len(), 2);

    assert_eq!(runtime.with("create").len(), 6);
    assert_eq!(runtime.with("start").len(), 6);
    assert_eq!(runtime.with("rm").len(), 6);
}

/// A failed pull ends the run before any container is created.
#[tokio::test]
async fn test_pull_failure_is_fatal_before_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(MIXED_FAMILIES);
    let runtime = Arc::new(RecordingRuntime {
        fail_on: Some("pull"),
        ..Default::default()
    });

    let err = crossbuild(&config, &composer(&config), executor(runtime.clone(), dir.path()), 2)
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::ImagePull { .. }));
    assert_eq!(runtime.with("pull").len(), 1);
    assert!(runtime.with("create").is_empty());
}

/// A malformed ldflags template stops the run before anything is pulled.
#[tokio::test]
async fn test_bad_template_fails_before_pull() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(
        r#"
[repository]
path = "github.com/acme/app"

[build]
ldflags = "-X main.Version={{.Version"

[crossbuild]
platforms = ["linux/amd64"]
"#,
    );
    let runtime = Arc::new(RecordingRuntime::default());

    let err = crossbuild(&config, &composer(&config), executor(runtime.clone(), dir.path()), 1)
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::Core(CoreError::Template { .. })));
    assert!(runtime.is_empty());
}

/// Selecting no known platform warns and succeeds without touching the runtime.
#[tokio::test]
async fn test_empty_selection_is_an_empty_success() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(
        r#"
[repository]
path = "github.com/acme/app"

[crossbuild]
platforms = ["plan9/mips"]
"#,
    );
    let runtime = Arc::new(RecordingRuntime::default());

    let report = crossbuild(&config, &composer(&config), executor(runtime.clone(), dir.path()), 1)
        .await
        .unwrap();

    assert_eq!(report.total(), 0);
    assert!(report.is_success());
    assert!(runtime.is_empty());
}
