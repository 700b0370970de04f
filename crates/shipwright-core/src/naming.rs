//! Artifact naming.
//!
//! Every function here is pure: identical inputs always yield identical
//! names, and distinct platforms never share an output path.

use std::path::{Path, PathBuf};

use crate::domain::{PlatformSpec, ProjectIdentity};

/// Directory under the prefix holding per-platform cross-build output.
pub const BUILD_DIR: &str = ".build";

/// Prefix of builder container names.
pub const CONTAINER_PREFIX: &str = "shipwright-crossbuild";

/// File name of `binary` when built for `platform`.
pub fn binary_file_name(binary: &str, platform: &PlatformSpec) -> String {
    if platform.is_windows() {
        format!("{binary}.exe")
    } else {
        binary.to_string()
    }
}

/// `<prefix>/.build/<os>-<arch>`
pub fn cross_output_dir(prefix: &Path, platform: &PlatformSpec) -> PathBuf {
    prefix.join(BUILD_DIR).join(platform.dir_name())
}

/// `<prefix>/.build/<os>-<arch>/<binary>[.exe]`
pub fn cross_output_path(prefix: &Path, binary: &str, platform: &PlatformSpec) -> PathBuf {
    cross_output_dir(prefix, platform).join(binary_file_name(binary, platform))
}

/// `<prefix>/<binary>[.exe]`
pub fn native_output_path(prefix: &Path, binary: &str, platform: &PlatformSpec) -> PathBuf {
    prefix.join(binary_file_name(binary, platform))
}

/// Stem of the release archive for `platform`: `<name>-<version>.<os>-<arch>`.
pub fn archive_stem(identity: &ProjectIdentity, platform: &PlatformSpec) -> String {
    format!(
        "{}-{}.{}",
        identity.name,
        identity.version,
        platform.dir_name()
    )
}

/// Job name for a containerized build: `<family>-<os>-<arch>`.
pub fn crossbuild_job_name(family: &str, platform: &PlatformSpec) -> String {
    format!("{family}-{}", platform.dir_name())
}

/// Builder container name for `job` created at `unix_secs`.
pub fn container_name(job: &str, unix_secs: i64) -> String {
    format!("{CONTAINER_PREFIX}-{job}-{unix_secs}")
}
