//! Shipwright - cross-platform build orchestration for Go projects
//!
//! ## Commands
//!
//! - `info`: Print the discovered project identity
//! - `build`: Build binaries with the local Go toolchain
//! - `crossbuild`: Build every configured platform in builder containers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use shipwright_build::{
    BuildRequest, ContainerExecutor, ContainerSettings, RunReport, SystemRunner,
};
use shipwright_core::telemetry::{init_tracing, level_for};
use shipwright_core::{
    discover_identity, resolve_concurrency_from_env, BuildStamp, Config, FlagComposer,
    PlatformSpec, ProjectIdentity,
};

#[derive(Parser)]
#[command(name = "shipwright")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cross-platform build orchestration for Go projects", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (default: .shipwright.toml in the current directory)
    #[arg(short, long, global = true, env = "SHIPWRIGHT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print name, owner, repository, branch, revision and version
    Info {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Build binaries with the local Go toolchain
    Build {
        /// Binaries to build: `all` or a comma-separated list of names
        #[arg(default_value = "all")]
        binaries: String,

        /// Enable or disable cgo (`--cgo`, `--cgo=false`, `--no-cgo`)
        #[arg(
            long,
            num_args = 0..=1,
            require_equals = true,
            default_missing_value = "true",
            overrides_with = "no_cgo"
        )]
        cgo: Option<bool>,

        /// Disable cgo
        #[arg(long, overrides_with = "cgo")]
        no_cgo: bool,

        /// Output directory (default: build.prefix from the configuration)
        #[arg(long)]
        prefix: Option<PathBuf>,

        /// Target platform as os/arch; output goes to <prefix>/.build/<os>-<arch>/
        #[arg(long)]
        platform: Option<PlatformSpec>,

        /// Maximum number of binaries built at once
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Build every configured platform in builder containers
    Crossbuild {
        /// Platform patterns (regular expressions); overrides crossbuild.platforms
        #[arg(short, long, num_args = 1.., value_delimiter = ' ')]
        platforms: Vec<String>,

        /// Enable or disable cgo (`--cgo`, `--cgo=false`, `--no-cgo`)
        #[arg(
            long,
            num_args = 0..=1,
            require_equals = true,
            default_missing_value = "true",
            overrides_with = "no_cgo"
        )]
        cgo: Option<bool>,

        /// Disable cgo
        #[arg(long, overrides_with = "cgo")]
        no_cgo: bool,

        /// Go version of the builder image
        #[arg(long)]
        go: Option<String>,

        /// Maximum number of containers run at once
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

/// Configuration and identity resolved once at startup.
struct Project {
    dir: PathBuf,
    config: Config,
    identity: ProjectIdentity,
}

fn load_project(config_path: Option<&Path>) -> Result<Project> {
    let dir = std::env::current_dir().context("Failed to determine working directory")?;
    let (config, path) = Config::discover(config_path, &dir).context("Failed to load configuration")?;
    match &path {
        Some(path) => debug!(path = %path.display(), "loaded configuration"),
        None => debug!("no configuration file, using defaults"),
    }
    let identity = discover_identity(&dir).context("Failed to discover project identity")?;
    let config = config.with_defaults(&identity);
    Ok(Project {
        dir,
        config,
        identity,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json, level_for(cli.verbose));

    let project = load_project(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { format } => cmd_info(&project.identity, format),
        Commands::Build {
            binaries,
            cgo,
            no_cgo,
            prefix,
            platform,
            concurrency,
        } => {
            let mut config = project.config;
            if let Some(cgo) = cgo_override(cgo, no_cgo) {
                config = config.with_cgo(cgo);
            }
            if let Some(prefix) = prefix {
                config = config.with_prefix(prefix);
            }
            let request = BuildRequest {
                binaries,
                platform,
                concurrency: 0,
            };
            cmd_build(config, project.identity, request, concurrency, cli.verbose).await
        }
        Commands::Crossbuild {
            platforms,
            cgo,
            no_cgo,
            go,
            concurrency,
        } => {
            let mut config = project.config;
            if let Some(cgo) = cgo_override(cgo, no_cgo) {
                config = config.with_cgo(cgo);
            }
            if let Some(go) = go {
                config = config.with_go_version(go);
            }
            if !platforms.is_empty() {
                config = config.with_platforms(platforms);
            }
            cmd_crossbuild(config, project.identity, project.dir, concurrency, cli.verbose).await
        }
    }
}

/// Command-line cgo setting; `None` keeps the configured value.
fn cgo_override(cgo: Option<bool>, no_cgo: bool) -> Option<bool> {
    if no_cgo {
        Some(false)
    } else {
        cgo
    }
}

/// Print the project identity
fn cmd_info(identity: &ProjectIdentity, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(identity)?),
        OutputFormat::Text => {
            println!("Name: {}", identity.name);
            println!("Owner: {}", identity.owner);
            println!("Repo: {}", identity.repo);
            println!("Branch: {}", identity.branch);
            println!("Revision: {}", identity.revision);
            println!("Version: {}", identity.version);
        }
    }
    Ok(())
}

/// Build binaries with the local toolchain
async fn cmd_build(
    config: Config,
    identity: ProjectIdentity,
    mut request: BuildRequest,
    concurrency: Option<usize>,
    verbose: bool,
) -> Result<()> {
    config.validate()?;
    request.concurrency = resolve_concurrency_from_env(concurrency, config.crossbuild.concurrency)?;

    let composer = FlagComposer::from_config(&config, identity, BuildStamp::capture());
    let runner = Arc::new(SystemRunner::new(verbose));

    let report = shipwright_build::build(Arc::new(config), &composer, runner, &request).await?;
    finish(&report)
}

/// Build every configured platform in containers
async fn cmd_crossbuild(
    config: Config,
    identity: ProjectIdentity,
    dir: PathBuf,
    concurrency: Option<usize>,
    verbose: bool,
) -> Result<()> {
    config.validate()?;
    let concurrency = resolve_concurrency_from_env(concurrency, config.crossbuild.concurrency)?;

    let settings = ContainerSettings::from_env(
        config.crossbuild.runtime.as_str(),
        dir,
        config.repository.path.as_str(),
    );
    if settings.remote {
        debug!("remote container daemon, copying sources into containers");
    }
    let runner = Arc::new(SystemRunner::new(verbose));
    let executor = Arc::new(ContainerExecutor::new(runner, settings));
    let composer = FlagComposer::from_config(&config, identity, BuildStamp::capture());

    let report = shipwright_build::crossbuild(&config, &composer, executor, concurrency).await?;
    finish(&report)
}

/// Print per-job results; fail if any job failed.
fn finish(report: &RunReport) -> Result<()> {
    for result in &report.results {
        let status = if result.succeeded() { "✓" } else { "✗" };
        println!(
            "  {} {} ({}ms)",
            status, result.job_name, result.duration_ms
        );
    }
    for failure in report.failures() {
        if let Some(error) = &failure.error {
            eprintln!("!! {}: {}", failure.job_name, error);
        }
    }
    if !report.is_success() {
        warn!(failed = report.failed_count(), total = report.total(), "run failed");
    }
    report.ensure_success()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_with_platform() {
        let cli = Cli::parse_from([
            "shipwright",
            "build",
            "promu,promtool",
            "--platform",
            "linux/armv7",
            "--cgo",
        ]);
        match cli.command {
            Commands::Build {
                binaries,
                cgo,
                platform,
                ..
            } => {
                assert_eq!(binaries, "promu,promtool");
                assert_eq!(cgo, Some(true));
                assert_eq!(platform.unwrap().to_string(), "linux/armv7");
            }
            _ => panic!("expected build"),
        }
    }

    fn build_cgo(args: &[&str]) -> Option<bool> {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Build { cgo, no_cgo, .. } => cgo_override(cgo, no_cgo),
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_cgo_can_be_turned_off() {
        assert_eq!(build_cgo(&["shipwright", "build"]), None);
        assert_eq!(build_cgo(&["shipwright", "build", "--cgo"]), Some(true));
        assert_eq!(build_cgo(&["shipwright", "build", "--cgo=true"]), Some(true));
        assert_eq!(build_cgo(&["shipwright", "build", "--cgo=false"]), Some(false));
        assert_eq!(build_cgo(&["shipwright", "build", "--no-cgo"]), Some(false));
        assert_eq!(build_cgo(&["shipwright", "build", "--cgo", "--no-cgo"]), Some(false));
    }

    #[test]
    fn test_bare_cgo_does_not_swallow_binaries() {
        let cli = Cli::parse_from(["shipwright", "build", "--cgo", "promu"]);
        match cli.command {
            Commands::Build { binaries, cgo, .. } => {
                assert_eq!(binaries, "promu");
                assert_eq!(cgo, Some(true));
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_crossbuild_no_cgo() {
        let cli = Cli::parse_from(["shipwright", "crossbuild", "--no-cgo"]);
        match cli.command {
            Commands::Crossbuild { cgo, no_cgo, .. } => {
                assert_eq!(cgo_override(cgo, no_cgo), Some(false));
            }
            _ => panic!("expected crossbuild"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_platform() {
        assert!(Cli::try_parse_from(["shipwright", "build", "--platform", "linux"]).is_err());
    }

    #[test]
    fn test_parse_crossbuild_platforms() {
        let cli = Cli::parse_from([
            "shipwright",
            "-v",
            "crossbuild",
            "-p",
            "linux/amd64 darwin",
            "--go",
            "1.21",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Crossbuild { platforms, go, .. } => {
                assert_eq!(platforms, vec!["linux/amd64", "darwin"]);
                assert_eq!(go.as_deref(), Some("1.21"));
            }
            _ => panic!("expected crossbuild"),
        }
    }

    #[test]
    fn test_info_defaults_to_text() {
        let cli = Cli::parse_from(["shipwright", "info"]);
        assert!(matches!(
            cli.command,
            Commands::Info {
                format: OutputFormat::Text
            }
        ));
    }
}
