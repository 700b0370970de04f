//! Concurrency limit resolution.

use crate::domain::{CoreError, Result};

/// Environment variable overriding the concurrency limit.
pub const CONCURRENCY_ENV: &str = "SHIPWRIGHT_CONCURRENCY";

/// Available parallelism minus one core for the orchestrator, at least 1.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Pick the job concurrency limit.
///
/// Precedence: command line, then [`CONCURRENCY_ENV`], then configuration,
/// then [`default_concurrency`]. An environment value that is not a positive
/// integer is ignored with a warning; zero from the command line or the
/// configuration is rejected.
pub fn resolve_concurrency(
    cli: Option<usize>,
    env: Option<&str>,
    config: Option<usize>,
) -> Result<usize> {
    let env = env
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|raw| match raw.parse::<usize>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                tracing::warn!(value = raw, "ignoring {CONCURRENCY_ENV}: not a positive integer");
                None
            }
        });

    match cli.or(env).or(config) {
        Some(0) => Err(CoreError::InvalidConfig(
            "concurrency must be at least 1".to_string(),
        )),
        Some(n) => Ok(n),
        None => Ok(default_concurrency()),
    }
}

/// [`resolve_concurrency`] reading the environment of this process.
pub fn resolve_concurrency_from_env(cli: Option<usize>, config: Option<usize>) -> Result<usize> {
    let env = std::env::var(CONCURRENCY_ENV).ok();
    resolve_concurrency(cli, env.as_deref(), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_floor_of_one() {
        assert!(default_concurrency() >= 1);
        assert_eq!(resolve_concurrency(None, None, None).unwrap(), default_concurrency());
    }

    #[test]
    fn test_precedence() {
        assert_eq!(resolve_concurrency(Some(2), Some("5"), Some(7)).unwrap(), 2);
        assert_eq!(resolve_concurrency(None, Some("5"), Some(7)).unwrap(), 5);
        assert_eq!(resolve_concurrency(None, None, Some(7)).unwrap(), 7);
        assert_eq!(resolve_concurrency(None, Some(" "), Some(7)).unwrap(), 7);
    }

    #[test]
    fn test_rejects_zero() {
        assert!(resolve_concurrency(Some(0), None, None).is_err());
        assert!(resolve_concurrency(None, None, Some(0)).is_err());
    }

    #[test]
    fn test_invalid_env_is_ignored() {
        assert_eq!(resolve_concurrency(None, Some("many"), Some(3)).unwrap(), 3);
        assert_eq!(resolve_concurrency(None, Some("0"), Some(3)).unwrap(), 3);
        assert_eq!(
            resolve_concurrency(None, Some("-2"), None).unwrap(),
            default_concurrency()
        );
    }
}
