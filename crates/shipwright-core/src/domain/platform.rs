//! Target platform identifiers.
//!
//! A [`PlatformSpec`] is the `os/arch` pair handed to the Go toolchain, where
//! `arch` may carry an ARM revision suffix (`armv6`, `armv7`). The canonical
//! string form is what users write in configuration and what the classifier
//! matches against.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::CoreError;

/// A cross-compilation target: `os/arch` or `os/armvN`.
///
/// Ordering and equality follow the canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlatformSpec {
    os: String,
    arch: String,
}

impl PlatformSpec {
    /// Parse `os/arch`. Both halves must be non-empty and contain no further `/`.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let (os, arch) = s
            .split_once('/')
            .ok_or_else(|| CoreError::InvalidPlatform(s.to_string()))?;
        if os.is_empty() || arch.is_empty() || arch.contains('/') {
            return Err(CoreError::InvalidPlatform(s.to_string()));
        }
        Ok(Self {
            os: os.to_string(),
            arch: arch.to_string(),
        })
    }

    /// The platform this binary was compiled for, in Go naming.
    pub fn host() -> Self {
        Self {
            os: go_os(std::env::consts::OS).to_string(),
            arch: go_arch(std::env::consts::ARCH).to_string(),
        }
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    /// Architecture including any revision suffix (`armv7`).
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Architecture as the toolchain expects it in `GOARCH` (`armv7` -> `arm`).
    pub fn goarch(&self) -> &str {
        match self.arm_revision() {
            Some(_) => "arm",
            None => &self.arch,
        }
    }

    /// ARM revision encoded in the architecture string, destined for `GOARM`.
    pub fn arm_revision(&self) -> Option<&str> {
        let rev = self.arch.strip_prefix("armv")?;
        if !rev.is_empty() && rev.chars().all(|c| c.is_ascii_digit()) {
            Some(rev)
        } else {
            None
        }
    }

    /// Directory-safe form used under `.build/`: `os-arch`.
    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }

    /// Whether binaries for this platform carry an `.exe` suffix.
    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }
}

impl fmt::Display for PlatformSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

impl FromStr for PlatformSpec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PlatformSpec {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PlatformSpec> for String {
    fn from(value: PlatformSpec) -> Self {
        value.to_string()
    }
}

fn go_os(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn go_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
}
