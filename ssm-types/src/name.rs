//! The package name triple: `SHORT_VERSION_PLATFORM`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::{Error, Platform, Version};

/// A parsed `SHORT_VERSION_PLATFORM` package name.
///
/// `SHORT` is everything before the first `_`; `PLATFORM` is everything
/// after the last `_`; `VERSION` is what remains in between. This matches
/// spec's "`SHORT` contains no underscore (split uses first and last)"
/// rule, which is stricter than the original Python `name.split("_", 2)`
/// (which only ever looked at the first two underscores and so silently
/// mis-split any version containing one).
///
/// # Examples
///
/// ```
/// use ssm_types::PackageName;
///
/// let name: PackageName = "hello_1.0_linux-x86-64".parse().unwrap();
/// assert_eq!(name.short(), "hello");
/// assert_eq!(name.version().as_str(), "1.0");
/// assert_eq!(name.platform().as_str(), "linux-x86-64");
/// assert_eq!(name.to_string(), "hello_1.0_linux-x86-64");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackageName {
    short: String,
    version: Version,
    platform: Platform,
}

impl PackageName {
    /// Builds a [`PackageName`] from its already-split parts.
    pub fn new(short: impl Into<String>, version: Version, platform: Platform) -> Self {
        Self {
            short: short.into(),
            version,
            platform,
        }
    }

    /// The `SHORT` field: the dependency identity of the package.
    pub fn short(&self) -> &str {
        &self.short
    }

    /// The `VERSION` field.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// The `PLATFORM` field.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }
}

impl FromStr for PackageName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let first = s.find('_').ok_or_else(|| Error::InvalidPackageName {
            name: s.to_string(),
        })?;
        let (short, rest) = (&s[..first], &s[first + 1..]);
        let last = rest.rfind('_').ok_or_else(|| Error::InvalidPackageName {
            name: s.to_string(),
        })?;
        let (version, platform) = (&rest[..last], &rest[last + 1..]);

        if short.is_empty() || version.is_empty() || platform.is_empty() {
            return Err(Error::InvalidPackageName {
                name: s.to_string(),
            });
        }

        Ok(Self {
            short: short.to_string(),
            version: Version::new(version)?,
            platform: Platform::new(platform)?,
        })
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.short, self.version, self.platform)
    }
}

/// Splits a package reference of the form `[DOMPATH/]NAME` into
/// `(dompath, name, platform)`, per spec `Package::splitPkgRef`.
///
/// `dompath` defaults to `"."` when `pkgref` has no `/`. `platform` is
/// derived by taking the text after the last `_` in `NAME`, without
/// otherwise validating `NAME` as a full [`PackageName`] (the Python
/// original tolerates partial/legacy names here).
pub fn split_pkg_ref(pkgref: &str) -> Result<(String, String, String), Error> {
    let trimmed = pkgref.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidPackageRef {
            reference: pkgref.to_string(),
        });
    }

    let (dompath, name) = match trimmed.rfind('/') {
        Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
        None => (".", trimmed),
    };

    let platform = name
        .rsplit_once('_')
        .map(|(_, platform)| platform)
        .ok_or_else(|| Error::InvalidPackageRef {
            reference: pkgref.to_string(),
        })?;

    Ok((dompath.to_string(), name.to_string(), platform.to_string()))
}

/// Joins a domain path and a package name the way [`split_pkg_ref`] splits
/// them, mostly useful in tests and for round-tripping paths.
pub fn join_pkg_ref(dompath: &Path, name: &str) -> String {
    format!("{}/{}", dompath.display(), name)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("hello_1.0_linux-x86-64")]
    #[case("openmpi_1.6.5_multi")]
    #[case("my-tool_2.3.4-rc1+build.7_all")]
    fn roundtrips_through_display(#[case] name: &str) {
        // P1: parse then reassemble with `_` reproduces the input.
        let parsed: PackageName = name.parse().unwrap();
        assert_eq!(parsed.to_string(), name);
    }

    #[test]
    fn rejects_missing_platform() {
        assert!("hello_1.0".parse::<PackageName>().is_err());
    }

    #[test]
    fn rejects_missing_underscore() {
        assert!("hello".parse::<PackageName>().is_err());
    }

    #[test]
    fn split_pkg_ref_with_dompath() {
        let (dom, name, platform) = split_pkg_ref("/tmp/dom/hello_1.0_linux-x86-64").unwrap();
        assert_eq!(dom, "/tmp/dom");
        assert_eq!(name, "hello_1.0_linux-x86-64");
        assert_eq!(platform, "linux-x86-64");
    }

    #[test]
    fn split_pkg_ref_without_dompath() {
        let (dom, name, platform) = split_pkg_ref("hello_1.0_linux-x86-64").unwrap();
        assert_eq!(dom, ".");
        assert_eq!(name, "hello_1.0_linux-x86-64");
        assert_eq!(platform, "linux-x86-64");
    }
}
