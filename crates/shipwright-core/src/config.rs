//! Project configuration (`.shipwright.toml`).
//!
//! The file is deserialized once into an immutable [`Config`]. Defaults that
//! depend on the project itself (binary list, repository path) are filled in
//! by [`Config::with_defaults`]; CLI overrides produce a new value through the
//! `with_*` builders. Components receive the finished value by reference.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{CoreError, ProjectIdentity, Result};
use crate::toolchain::{default_platform_patterns, DEFAULT_BUILDER_IMAGE};

/// Configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".shipwright.toml";

/// Go toolchain version used for builder image tags when none is configured.
pub const DEFAULT_GO_VERSION: &str = "1.22";

/// Container runtime CLI used when none is configured.
pub const DEFAULT_RUNTIME: &str = "docker";

/// Build tags applied to every target OS.
pub const ALL_TAGS_KEY: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub repository: RepositoryConfig,
    pub go: GoConfig,
    pub build: BuildConfig,
    pub crossbuild: CrossbuildConfig,
    pub tarball: TarballConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Go import path of the repository root.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoConfig {
    pub version: String,
    pub cgo: bool,
}

impl Default for GoConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_GO_VERSION.to_string(),
            cgo: false,
        }
    }
}

/// A binary produced by the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binary {
    pub name: String,
    /// Package path relative to the repository root.
    #[serde(default = "default_binary_path")]
    pub path: String,
}

fn default_binary_path() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub binaries: Vec<Binary>,
    pub prefix: PathBuf,
    /// Extra compiler flags, split shell-style.
    pub flags: String,
    /// Linker flag template; empty means "stamp the version only".
    pub ldflags: String,
    #[serde(rename = "static")]
    pub static_link: bool,
    pub ext_ldflags: Vec<String>,
    /// Build tags keyed by target OS, plus [`ALL_TAGS_KEY`].
    pub tags: BTreeMap<String, Vec<String>>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            binaries: Vec::new(),
            prefix: PathBuf::from("."),
            flags: String::new(),
            ldflags: String::new(),
            static_link: true,
            ext_ldflags: Vec::new(),
            tags: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossbuildConfig {
    pub platforms: Vec<String>,
    pub concurrency: Option<usize>,
    pub builder_image: String,
    pub per_family_images: bool,
    pub runtime: String,
}

impl Default for CrossbuildConfig {
    fn default() -> Self {
        Self {
            platforms: Vec::new(),
            concurrency: None,
            builder_image: DEFAULT_BUILDER_IMAGE.to_string(),
            per_family_images: false,
            runtime: DEFAULT_RUNTIME.to_string(),
        }
    }
}

/// Archive settings, consumed by the packaging step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TarballConfig {
    pub prefix: PathBuf,
    pub files: Vec<String>,
}

impl Default for TarballConfig {
    fn default() -> Self {
        Self {
            prefix: PathBuf::from("."),
            files: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load `explicit` if given (it must exist), else `.shipwright.toml` in
    /// `dir` if present, else the built-in defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Ok((Self::load(&candidate)?, Some(candidate)));
        }
        Ok((Self::default(), None))
    }

    /// Fill in the values that default to facts about the project.
    pub fn with_defaults(mut self, identity: &ProjectIdentity) -> Self {
        if self.build.binaries.is_empty() && !identity.name.is_empty() {
            self.build.binaries.push(Binary {
                name: identity.name.clone(),
                path: default_binary_path(),
            });
        }
        if self.repository.path.trim().is_empty() {
            self.repository.path = identity.repo.clone();
        }
        if self.crossbuild.platforms.is_empty() {
            self.crossbuild.platforms = default_platform_patterns();
        }
        self
    }

    pub fn with_cgo(mut self, cgo: bool) -> Self {
        self.go.cgo = cgo;
        self
    }

    pub fn with_go_version(mut self, version: impl Into<String>) -> Self {
        self.go.version = version.into();
        self
    }

    pub fn with_platforms(mut self, platforms: Vec<String>) -> Self {
        self.crossbuild.platforms = platforms;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.build.prefix = prefix.into();
        self
    }

    /// Check required fields. Called once, before any job is dispatched.
    pub fn validate(&self) -> Result<()> {
        if self.repository.path.trim().is_empty() {
            return Err(CoreError::missing("repository.path"));
        }
        if self.go.version.trim().is_empty() {
            return Err(CoreError::missing("go.version"));
        }
        if let Some(binary) = self.build.binaries.iter().find(|b| b.name.trim().is_empty()) {
            return Err(CoreError::InvalidConfig(format!(
                "binary with path '{}' has an empty name",
                binary.path
            )));
        }
        if self.crossbuild.concurrency == Some(0) {
            return Err(CoreError::InvalidConfig(
                "crossbuild.concurrency must be at least 1".to_string(),
            ));
        }
        if self.crossbuild.runtime.trim().is_empty() {
            return Err(CoreError::missing("crossbuild.runtime"));
        }
        Ok(())
    }

    /// Build tags for `os`: the `all` tags followed by the OS-specific ones.
    pub fn tags_for(&self, os: &str) -> Vec<String> {
        let mut tags: Vec<String> = self
            .build
            .tags
            .get(ALL_TAGS_KEY)
            .cloned()
            .unwrap_or_default();
        if let Some(os_tags) = self.build.tags.get(os) {
            tags.extend(os_tags.iter().cloned());
        }
        tags
    }

    /// Resolve a binary selector: `all` or a comma-separated list of names.
    pub fn select_binaries(&self, selector: &str) -> Result<Vec<Binary>> {
        if selector.trim() == "all" {
            return Ok(self.build.binaries.clone());
        }
        selector
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                self.build
                    .binaries
                    .iter()
                    .find(|b| b.name == name)
                    .cloned()
                    .ok_or_else(|| CoreError::UnknownBinary(name.to_string()))
            })
            .collect()
    }
}
