//! Domain-level error taxonomy for Shipwright.

/// Shipwright core errors.
///
/// Everything in here is fatal to a run and is raised before any build job
/// is dispatched.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("missing required '{field}' configuration")]
    MissingConfig { field: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to render ldflags template: {reason}")]
    Template { reason: String },

    #[error("invalid platform '{0}', expected <os>/<arch>")]
    InvalidPlatform(String),

    #[error("binary {0} not found in config")]
    UnknownBinary(String),

    #[error("git error: {0}")]
    Git(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn template(reason: impl Into<String>) -> Self {
        CoreError::Template {
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(field: &str) -> Self {
        CoreError::MissingConfig {
            field: field.to_string(),
        }
    }
}

/// Result type for Shipwright core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
