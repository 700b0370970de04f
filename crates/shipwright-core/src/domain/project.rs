//! Project identity record.

use serde::{Deserialize, Serialize};

/// Who and what is being built.
///
/// Produced once per invocation by [`crate::git::discover_identity`] and read
/// by the flag composer and artifact naming. Never mutated after discovery.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectIdentity {
    /// Last element of the repository location (`prometheus`).
    pub name: String,
    /// Parent element of the repository location (`prometheus` in `github.com/prometheus/prometheus`).
    pub owner: String,
    /// Repository location without scheme or `.git` suffix (`github.com/prometheus/prometheus`).
    pub repo: String,
    /// Current branch, or `non-git`.
    pub branch: String,
    /// Current commit, or `non-git`.
    pub revision: String,
    /// Project version; empty when none could be found.
    pub version: String,
}

impl ProjectIdentity {
    /// Template field lookup by Go-style name (`Version`, `Revision`, ...).
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "Name" => Some(&self.name),
            "Owner" => Some(&self.owner),
            "Repo" => Some(&self.repo),
            "Branch" => Some(&self.branch),
            "Revision" => Some(&self.revision),
            "Version" => Some(&self.version),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lookup() {
        let identity = ProjectIdentity {
            name: "node_exporter".to_string(),
            owner: "prometheus".to_string(),
            repo: "github.com/prometheus/node_exporter".to_string(),
            branch: "main".to_string(),
            revision: "abc123".to_string(),
            version: "1.8.0".to_string(),
        };
        assert_eq!(identity.field("Version"), Some("1.8.0"));
        assert_eq!(identity.field("Revision"), Some("abc123"));
        assert_eq!(identity.field("Repo"), Some("github.com/prometheus/node_exporter"));
        assert_eq!(identity.field("version"), None);
        assert_eq!(identity.field("Missing"), None);
    }
}
