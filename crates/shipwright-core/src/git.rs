//! Project identity discovery from git metadata.

use std::path::Path;
use std::process::Command;

use regex::Regex;

use crate::domain::error::{CoreError, Result};
use crate::domain::ProjectIdentity;
use crate::flags::current_user;

/// Branch and revision recorded outside a git work tree.
pub const NON_GIT: &str = "non-git";

const DEFAULT_REMOTE: &str = "origin";
const VERSION_FILES: &[&str] = &["VERSION", "version/VERSION"];

fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| CoreError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CoreError::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Check whether a directory is inside a git work tree.
pub fn is_git_repo(dir: &Path) -> bool {
    git(dir, &["rev-parse", "--show-toplevel"]).is_ok()
}

/// Normalize a remote URL to `host/path` without scheme, user, port or `.git`.
///
/// Accepts URLs with a scheme (`https://`, `ssh://`) and scp-like remotes
/// (`git@github.com:org/repo.git`).
pub fn repo_location(remote: &str) -> Result<String> {
    let scheme = Regex::new(r"^[^:]+://").map_err(|e| CoreError::Git(e.to_string()))?;
    let scp_like =
        Regex::new(r"^([^@]+@)?([^:]+):/?(.+)$").map_err(|e| CoreError::Git(e.to_string()))?;

    let remote = remote.trim().trim_end_matches('/');

    let location = if let Some(m) = scheme.find(remote) {
        let rest = &remote[m.end()..];
        let (authority, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };
        let host = authority.rsplit('@').next().unwrap_or(authority);
        let host = host.split(':').next().unwrap_or(host);
        if host.is_empty() {
            return Err(CoreError::Git(format!(
                "couldn't parse repository location: {remote:?}"
            )));
        }
        format!("{host}{path}")
    } else if let Some(caps) = scp_like.captures(remote) {
        format!("{}/{}", &caps[2], &caps[3])
    } else {
        remote.to_string()
    };

    Ok(location.trim_end_matches(".git").to_string())
}

/// Project version from `VERSION` files, else `git describe`.
pub fn find_version(dir: &Path) -> Option<String> {
    for file in VERSION_FILES {
        if let Ok(content) = std::fs::read_to_string(dir.join(file)) {
            return Some(content.trim().to_string());
        }
    }
    git(dir, &["describe", "--tags", "--always", "--dirty"])
        .ok()
        .map(|v| v.trim_start_matches('v').to_string())
        .filter(|v| !v.is_empty())
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path)
}

fn parent_segment(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit_once('/')
        .map(|(parent, _)| last_segment(parent))
        .unwrap_or("")
}

fn non_git_identity(dir: &Path) -> ProjectIdentity {
    let mut repo = dir.to_string_lossy().to_string();
    if let Ok(gopath) = std::env::var("GOPATH") {
        if !gopath.is_empty() {
            repo = repo
                .strip_prefix(&gopath)
                .and_then(|r| r.strip_prefix("/src/"))
                .map(str::to_string)
                .unwrap_or(repo);
        }
    }
    ProjectIdentity {
        name: last_segment(&repo).to_string(),
        owner: current_user(),
        repo,
        branch: NON_GIT.to_string(),
        revision: NON_GIT.to_string(),
        version: String::new(),
    }
}

fn git_identity(dir: &Path) -> Result<ProjectIdentity> {
    let branch = git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    let remote = git(dir, &["config", "--get", &format!("branch.{branch}.remote")])
        .unwrap_or_else(|_| DEFAULT_REMOTE.to_string());

    let url = match git(dir, &["config", "--get", &format!("remote.{remote}.url")]) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(remote = %remote, error = %e, "unable to get repository location");
            String::new()
        }
    };
    let repo = if url.is_empty() {
        dir.to_string_lossy().to_string()
    } else {
        repo_location(&url)?
    };

    Ok(ProjectIdentity {
        name: last_segment(&repo).to_string(),
        owner: parent_segment(&repo).to_string(),
        branch,
        revision: git(dir, &["rev-parse", "HEAD"]).unwrap_or_default(),
        repo,
        version: String::new(),
    })
}

/// Discover the identity of the project rooted at `dir`.
///
/// Outside a git work tree the directory name and the current user stand in,
/// with `non-git` as branch and revision. A missing version only warns.
pub fn discover_identity(dir: &Path) -> Result<ProjectIdentity> {
    let mut identity = if is_git_repo(dir) {
        git_identity(dir)?
    } else {
        tracing::debug!(dir = %dir.display(), "not a git repository");
        non_git_identity(dir)
    };

    match find_version(dir) {
        Some(version) => identity.version = version,
        None => tracing::warn!("unable to find project's version"),
    }
    Ok(identity)
}
