//! Dotted-series version ordering.
//!
//! A version string is split on `.`; a component made up entirely of ASCII
//! digits becomes a numeric component, everything else stays textual. The
//! resulting tuples compare lexicographically, component by component.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A single dot-separated piece of a [`Version`].
///
/// Numeric components always sort before textual ones: this mirrors the
/// ordering the original Python implementation happened to produce when
/// comparing an `int` component against a `str` component at the same
/// tuple position (see `DESIGN.md`, "`~` operator and version component
/// ordering").
#[derive(Clone, Debug, Eq, PartialEq)]
enum Component {
    Num(u64),
    Text(String),
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Component::Num(a), Component::Num(b)) => a.cmp(b),
            (Component::Text(a), Component::Text(b)) => a.cmp(b),
            (Component::Num(_), Component::Text(_)) => Ordering::Less,
            (Component::Text(_), Component::Num(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Num(n) => write!(f, "{n}"),
            Component::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A package version, ordered as a tuple of dot-separated components.
///
/// # Examples
///
/// ```
/// use ssm_types::Version;
///
/// let a: Version = "1.6.5".parse().unwrap();
/// let b: Version = "1.10.0".parse().unwrap();
/// assert!(a < b);
/// ```
#[derive(Clone, Debug)]
pub struct Version {
    raw: String,
    components: Vec<Component>,
}

/// Equality follows `components`, not `raw`: `"1.0"` and `"1.00"` both
/// parse to `[Num(1), Num(0)]` and must compare equal, matching
/// `version2tuple`'s `int`-tuple equality and keeping `==`/`!=` in
/// agreement with `<`/`<=`/`>=`/`>` (all derived from `cmp`).
impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for Version {}

impl Version {
    /// Parses `s` into a [`Version`].
    ///
    /// Never fails: the grammar accepts any non-empty, `.`-delimited
    /// string, matching `ssm/deps.py::version2tuple`'s unconditional split.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let raw = s.into();
        if raw.is_empty() {
            return Err(Error::InvalidVersion { version: raw });
        }
        let components = raw
            .split('.')
            .map(|part| {
                if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
                    part.parse::<u64>()
                        .map(Component::Num)
                        .unwrap_or_else(|_| Component::Text(part.to_string()))
                } else {
                    Component::Text(part.to_string())
                }
            })
            .collect();
        Ok(Self { raw, components })
    }

    /// Returns the original, unparsed version string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::new(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("1.6.5", "1.10.0", Ordering::Less)]
    #[case("4.3.1", "4.3.1", Ordering::Equal)]
    #[case("1.8.3", "1.8", Ordering::Greater)]
    #[case("2.0.0-rc1", "2.0.0", Ordering::Less)]
    fn orders_as_expected(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        let a: Version = a.parse().unwrap();
        let b: Version = b.parse().unwrap();
        assert_eq!(a.cmp(&b), expected);
    }

    #[test]
    fn property_total_order() {
        // P2: for every pair exactly one of <, ==, > holds.
        let samples = [
            "1.0.0", "1.0", "1.0.0.1", "2.3.4-beta", "10.0", "9.9.9", "1.00", "01",
        ];
        for a in samples {
            for b in samples {
                let va: Version = a.parse().unwrap();
                let vb: Version = b.parse().unwrap();
                let lt = va < vb;
                let eq = va == vb;
                let gt = va > vb;
                assert_eq!([lt, eq, gt].iter().filter(|x| **x).count(), 1);
            }
        }
    }

    #[test]
    fn equal_components_compare_equal_despite_differing_raw_text() {
        // "1.0" and "1.00" both parse to [Num(1), Num(0)]: == must agree
        // with cmp() == Equal even though the raw strings differ.
        let a: Version = "1.0".parse().unwrap();
        let b: Version = "1.00".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);

        let c: Version = "1".parse().unwrap();
        let d: Version = "01".parse().unwrap();
        assert_eq!(c, d);
    }

    #[test]
    fn display_roundtrips_raw_string() {
        let v = Version::new("1.2.3+git").unwrap();
        assert_eq!(v.to_string(), "1.2.3+git");
    }

    #[test]
    fn rejects_empty_string() {
        assert!(Version::new("").is_err());
    }
}
