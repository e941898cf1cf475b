//! The opaque platform label.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// The sentinel meaning "not tied to a specific platform; substitute one
/// from the environment at publish time."
pub const PLATFORM_ALL: &str = "all";

/// The sentinel meaning "built against multiple platforms; substitute one
/// from the environment at publish time."
pub const PLATFORM_MULTI: &str = "multi";

/// An opaque platform label, e.g. `linux26-x86-64`.
///
/// May be one of the sentinel values [`PLATFORM_ALL`]/[`PLATFORM_MULTI`],
/// or a name the deployment's configuration lists under
/// `disabled_publish_platforms` — in either case the *domain* and *CLI*
/// layers are responsible for substituting a concrete, environment-derived
/// platform before publishing (spec §3); `Platform` itself only tracks
/// whether a label is one of these virtual values.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Platform(String);

impl Platform {
    /// Creates a [`Platform`] from a non-empty label.
    pub fn new(label: impl Into<String>) -> Result<Self, Error> {
        let label = label.into();
        if label.is_empty() {
            return Err(Error::EmptyPlatform);
        }
        Ok(Self(label))
    }

    /// The label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this label is [`PLATFORM_ALL`] or [`PLATFORM_MULTI`]: a
    /// virtual platform that must be resolved to a concrete one before
    /// publishing.
    pub fn is_virtual(&self) -> bool {
        self.0 == PLATFORM_ALL || self.0 == PLATFORM_MULTI
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::new(s)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Platform {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_platforms_detected() {
        assert!(Platform::new("all").unwrap().is_virtual());
        assert!(Platform::new("multi").unwrap().is_virtual());
        assert!(!Platform::new("linux26-x86-64").unwrap().is_virtual());
    }

    #[test]
    fn rejects_empty_label() {
        assert!(Platform::new("").is_err());
    }
}
