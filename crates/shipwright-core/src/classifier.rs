//! Platform classification.
//!
//! Resolves user-supplied platform patterns against the canonical platform
//! list. A pattern is, in order of precedence:
//!
//! 1. an exact canonical name (`linux/mips`), selecting only that platform;
//! 2. a legacy alias (`linux/arm`), expanding to its revision variants;
//! 3. a regular expression searched in every canonical name (`linux`,
//!    `^(darwin|windows)/amd64$`).
//!
//! Matches from all patterns are merged, deduplicated and sorted. Patterns
//! that select nothing are reported back, never treated as fatal.

use std::collections::BTreeSet;

use regex::Regex;

use crate::domain::PlatformSpec;
use crate::toolchain::canonical_platforms;

/// Legacy ARM shorthands and the variant-qualified platforms they stand for.
pub const PLATFORM_ALIASES: &[(&str, &[&str])] = &[
    ("linux/arm", &["linux/armv5", "linux/armv6", "linux/armv7"]),
    ("freebsd/arm", &["freebsd/armv6", "freebsd/armv7"]),
    ("openbsd/arm", &["openbsd/armv7"]),
    ("netbsd/arm", &["netbsd/armv6", "netbsd/armv7"]),
];

/// Outcome of classifying a pattern list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Selected platforms, sorted, each exactly once.
    pub platforms: Vec<PlatformSpec>,
    /// Patterns that selected no canonical platform, in input order.
    pub unknown: Vec<String>,
}

impl Classification {
    /// Warning text for the unknown patterns, if there are any.
    pub fn warning(&self) -> Option<String> {
        if self.unknown.is_empty() {
            None
        } else {
            Some(format!(
                "unknown/unhandled platforms: [{}]",
                self.unknown.join(" ")
            ))
        }
    }
}

/// Matches patterns against a fixed canonical platform list.
#[derive(Debug, Clone)]
pub struct PlatformClassifier {
    canonical: Vec<PlatformSpec>,
}

impl Default for PlatformClassifier {
    fn default() -> Self {
        Self::new(canonical_platforms())
    }
}

impl PlatformClassifier {
    pub fn new(canonical: impl IntoIterator<Item = PlatformSpec>) -> Self {
        let canonical: BTreeSet<PlatformSpec> = canonical.into_iter().collect();
        Self {
            canonical: canonical.into_iter().collect(),
        }
    }

    pub fn canonical(&self) -> &[PlatformSpec] {
        &self.canonical
    }

    pub fn classify<S: AsRef<str>>(&self, patterns: &[S]) -> Classification {
        let mut selected = BTreeSet::new();
        let mut unknown = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            let matches = self.resolve(pattern);
            if matches.is_empty() {
                unknown.push(pattern.to_string());
            }
            selected.extend(matches);
        }

        Classification {
            platforms: selected.into_iter().collect(),
            unknown,
        }
    }

    fn resolve(&self, pattern: &str) -> Vec<PlatformSpec> {
        if let Some(exact) = self.canonical.iter().find(|p| p.to_string() == pattern) {
            return vec![exact.clone()];
        }

        if let Some((_, variants)) = PLATFORM_ALIASES.iter().find(|(alias, _)| *alias == pattern) {
            return self
                .canonical
                .iter()
                .filter(|p| variants.contains(&p.to_string().as_str()))
                .cloned()
                .collect();
        }

        match Regex::new(pattern) {
            Ok(re) => self
                .canonical
                .iter()
                .filter(|p| re.is_match(&p.to_string()))
                .cloned()
                .collect(),
            Err(e) => {
                tracing::debug!(pattern, error = %e, "platform pattern is not a valid regex");
                Vec::new()
            }
        }
    }
}
