//! Log output for the `shipwright` binary.
//!
//! stdout belongs to command results: the `info` report (which may be JSON
//! piped into other tools) and the per-job summary lines. Everything emitted
//! through `tracing` goes to stderr so it can be silenced or redirected
//! without touching those results. Builds running in parallel interleave
//! their events, so every per-job event carries a `job` field; `--json`
//! makes them easy to split back apart.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter for the run: `RUST_LOG` when set, else `level` for everything.
fn filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the process-wide subscriber writing to stderr.
///
/// Only the first call takes effect; tests and embedders may call it freely.
pub fn init_tracing(json: bool, level: Level) {
    let stderr = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter(level));

    let installed = if json {
        registry.with(stderr.json().flatten_event(true)).try_init()
    } else {
        registry.with(stderr.compact()).try_init()
    };
    if installed.is_err() {
        tracing::trace!("subscriber already installed");
    }
}

/// `--verbose` shows debug events such as echoed commands and image pulls.
pub fn level_for(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}
