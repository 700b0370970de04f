//! Toolchain image resolution.
//!
//! Builder images are tagged `<builder>:<go-version>-<family>`. Without cgo
//! every platform builds in the `base` image, which carries no C cross
//! compiler. With cgo the `main` image ships every cross toolchain, so all
//! platforms share it; the older per-family images (`arm`, `powerpc`, ...)
//! are still available through [`ImageResolver::with_per_family_images`].
//!
//! Families are a table, not a branch chain: adding a toolchain family means
//! adding a row to [`FAMILIES`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::PlatformSpec;

/// Default builder image repository.
pub const DEFAULT_BUILDER_IMAGE: &str = "quay.io/prometheus/golang-builder";

/// Family used for every platform when cgo is disabled.
pub const BASE_FAMILY: &str = "base";

/// Family carrying every cross C toolchain.
pub const MAIN_FAMILY: &str = "main";

/// A row of the toolchain table.
#[derive(Debug, Clone, Copy)]
pub struct ToolchainFamily {
    pub name: &'static str,
    /// Canonical platforms built by this family's image.
    pub platforms: &'static [&'static str],
    /// Whether the family's platforms are part of the default crossbuild set.
    pub default: bool,
}

/// Known toolchain families and the canonical platforms they build.
pub const FAMILIES: &[ToolchainFamily] = &[
    ToolchainFamily {
        name: MAIN_FAMILY,
        platforms: &[
            "linux/amd64",
            "linux/386",
            "darwin/amd64",
            "darwin/arm64",
            "windows/amd64",
            "windows/386",
            "freebsd/amd64",
            "freebsd/386",
            "openbsd/amd64",
            "openbsd/386",
            "netbsd/amd64",
            "netbsd/386",
            "dragonfly/amd64",
            "illumos/amd64",
            "linux/riscv64",
        ],
        default: true,
    },
    ToolchainFamily {
        name: "arm",
        platforms: &[
            "linux/armv5",
            "linux/armv6",
            "linux/armv7",
            "linux/arm64",
            "freebsd/armv6",
            "freebsd/armv7",
            "openbsd/armv7",
            "netbsd/armv6",
            "netbsd/armv7",
            "windows/arm64",
        ],
        default: true,
    },
    ToolchainFamily {
        name: "powerpc",
        platforms: &["aix/ppc64", "linux/ppc64", "linux/ppc64le"],
        default: true,
    },
    ToolchainFamily {
        name: "mips",
        platforms: &["linux/mips", "linux/mipsle", "linux/mips64", "linux/mips64le"],
        default: true,
    },
    ToolchainFamily {
        name: "s390x",
        platforms: &["linux/s390x"],
        default: false,
    },
];

/// Every platform any family can build, sorted and deduplicated.
pub fn canonical_platforms() -> Vec<PlatformSpec> {
    FAMILIES
        .iter()
        .flat_map(|f| f.platforms.iter())
        .filter_map(|p| PlatformSpec::parse(p).ok())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Platform patterns used when the configuration lists none.
pub fn default_platform_patterns() -> Vec<String> {
    FAMILIES
        .iter()
        .filter(|f| f.default)
        .flat_map(|f| f.platforms.iter().map(|p| p.to_string()))
        .collect()
}

/// Name of the family whose image builds `platform`, if any.
pub fn family_of(platform: &PlatformSpec) -> Option<&'static str> {
    let name = platform.to_string();
    FAMILIES
        .iter()
        .find(|f| f.platforms.contains(&name.as_str()))
        .map(|f| f.name)
}

/// A resolved builder image.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ToolchainImage {
    /// Family tag suffix (`base`, `main`, `arm`, ...).
    pub family: String,
    /// Full image reference (`quay.io/prometheus/golang-builder:1.22-base`).
    pub reference: String,
}

impl fmt::Display for ToolchainImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference)
    }
}

/// Maps `(cgo, go version)` and a platform to a builder image. Pure: no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResolver {
    builder_image: String,
    go_version: String,
    cgo: bool,
    per_family: bool,
}

impl ImageResolver {
    pub fn new(builder_image: impl Into<String>, go_version: impl Into<String>, cgo: bool) -> Self {
        Self {
            builder_image: builder_image.into(),
            go_version: go_version.into(),
            cgo,
            per_family: false,
        }
    }

    /// Group cgo builds by architecture family instead of using the single `main` image.
    pub fn with_per_family_images(mut self, per_family: bool) -> Self {
        self.per_family = per_family;
        self
    }

    fn image(&self, family: &str) -> ToolchainImage {
        ToolchainImage {
            family: family.to_string(),
            reference: format!("{}:{}-{}", self.builder_image, self.go_version, family),
        }
    }

    /// The image that builds `platform`.
    pub fn image_for(&self, platform: &PlatformSpec) -> ToolchainImage {
        if !self.cgo {
            return self.image(BASE_FAMILY);
        }
        if self.per_family {
            return self.image(family_of(platform).unwrap_or(MAIN_FAMILY));
        }
        self.image(MAIN_FAMILY)
    }

    /// Partition `platforms` into `(image, platforms)` pairs, ordered by image.
    ///
    /// Platform order inside a group follows the input order.
    pub fn group(&self, platforms: &[PlatformSpec]) -> Vec<(ToolchainImage, Vec<PlatformSpec>)> {
        let mut groups: BTreeMap<ToolchainImage, Vec<PlatformSpec>> = BTreeMap::new();
        for platform in platforms {
            groups
                .entry(self.image_for(platform))
                .or_default()
                .push(platform.clone());
        }
        groups.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PlatformSpec {
        PlatformSpec::parse(s).unwrap()
    }

    #[test]
    fn test_canonical_platforms_sorted_and_unique() {
        let platforms = canonical_platforms();
        let mut sorted = platforms.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(platforms, sorted);
        assert!(platforms.contains(&p("linux/armv7")));
        assert!(platforms.contains(&p("linux/s390x")));
    }

    #[test]
    fn test_default_patterns_exclude_non_default_families() {
        let defaults = default_platform_patterns();
        assert!(defaults.contains(&"linux/amd64".to_string()));
        assert!(defaults.contains(&"linux/mips64le".to_string()));
        assert!(!defaults.contains(&"linux/s390x".to_string()));
    }

    #[test]
    fn test_no_cgo_uses_base_image_everywhere() {
        let resolver = ImageResolver::new(DEFAULT_BUILDER_IMAGE, "1.22", false);
        for platform in canonical_platforms() {
            let image = resolver.image_for(&platform);
            assert_eq!(image.family, "base");
            assert_eq!(
                image.reference,
                "quay.io/prometheus/golang-builder:1.22-base"
            );
        }
    }

    #[test]
    fn test_cgo_collapses_to_main_image() {
        let resolver = ImageResolver::new(DEFAULT_BUILDER_IMAGE, "1.22", true);
        let groups = resolver.group(&[p("linux/amd64"), p("linux/armv7"), p("linux/ppc64le")]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0.family, "main");
        assert_eq!(groups[0].1.len(), 3);
    }

    #[test]
    fn test_cgo_per_family_grouping() {
        let resolver =
            ImageResolver::new("example/builder", "1.21", true).with_per_family_images(true);
        let groups = resolver.group(&[
            p("linux/amd64"),
            p("linux/armv7"),
            p("linux/arm64"),
            p("linux/s390x"),
        ]);
        let families: Vec<&str> = groups.iter().map(|(i, _)| i.family.as_str()).collect();
        assert_eq!(families, vec!["arm", "main", "s390x"]);
        let arm = &groups[0];
        assert_eq!(arm.0.reference, "example/builder:1.21-arm");
        assert_eq!(arm.1, vec![p("linux/armv7"), p("linux/arm64")]);
    }

    #[test]
    fn test_per_family_ignored_without_cgo() {
        let resolver =
            ImageResolver::new(DEFAULT_BUILDER_IMAGE, "1.22", false).with_per_family_images(true);
        assert_eq!(resolver.image_for(&p("linux/mips")).family, "base");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let a = ImageResolver::new(DEFAULT_BUILDER_IMAGE, "1.22", true);
        let b = ImageResolver::new(DEFAULT_BUILDER_IMAGE, "1.22", true);
        assert_eq!(a.image_for(&p("linux/arm64")), b.image_for(&p("linux/arm64")));
    }
}
