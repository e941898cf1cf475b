//! Testable expressions: `NAME[ OP VERSION]`, the grammar `requires`,
//! `provides` and `conflicts` fields are written in.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use ssm_types::Version;

use crate::Error;

/// A comparison operator parsed from a testable expression.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Op {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `==`
    Eq,
    /// `>=`
    Ge,
    /// `>`
    Gt,
    /// `!=`
    Ne,
    /// `~`. Accepted by the grammar; rejected by [`Testable::test`].
    Tilde,
}

impl Op {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "<" => Op::Lt,
            "<=" => Op::Le,
            "==" => Op::Eq,
            ">=" => Op::Ge,
            ">" => Op::Gt,
            "!=" => Op::Ne,
            "~" => Op::Tilde,
            _ => return None,
        })
    }

    fn apply(self, provider: &Version, required: &Version) -> Option<bool> {
        Some(match self {
            Op::Lt => provider < required,
            Op::Le => provider <= required,
            Op::Eq => provider == required,
            Op::Ge => provider >= required,
            Op::Gt => provider > required,
            Op::Ne => provider != required,
            Op::Tilde => return None,
        })
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Eq => "==",
            Op::Ge => ">=",
            Op::Gt => ">",
            Op::Ne => "!=",
            Op::Tilde => "~",
        };
        write!(f, "{s}")
    }
}

/// A named package with an optional concrete version, as registered
/// with [`crate::DependencyManager::add`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Provider {
    name: String,
    version: Option<Version>,
}

impl Provider {
    /// Creates a provider, optionally with a concrete version.
    pub fn new(name: impl Into<String>, version: Option<Version>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// The provider's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The provider's version, if any.
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}/{version}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

fn testable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<name>[a-zA-Z][a-zA-Z0-9-]*)(\s*(?P<op><=|>=|==|!=|<|>|~)\s*(?P<value>[0-9]+(\.[0-9]+)*[+\-a-zA-Z0-9]*))?$",
        )
        .expect("testable expression regex is valid")
    })
}

/// A parsed `NAME[ OP VERSION]` testable expression: the common shape
/// shared by requirements and conflicts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Testable {
    testspec: String,
    name: String,
    op: Option<Op>,
    version: Option<Version>,
}

impl Testable {
    /// Parses `testspec` against the testable expression grammar.
    pub fn parse(testspec: &str) -> Result<Self, Error> {
        let trimmed = testspec.trim();
        let captures = testable_re()
            .captures(trimmed)
            .ok_or_else(|| Error::MalformedExpression {
                expression: testspec.to_string(),
            })?;

        let name = captures["name"].to_string();
        let (op, version) = match (captures.name("op"), captures.name("value")) {
            (Some(op), Some(value)) => {
                let op = Op::parse(op.as_str()).ok_or_else(|| Error::MalformedExpression {
                    expression: testspec.to_string(),
                })?;
                let version = Version::new(value.as_str()).map_err(|_| Error::MalformedExpression {
                    expression: testspec.to_string(),
                })?;
                (Some(op), Some(version))
            }
            _ => (None, None),
        };

        Ok(Self {
            testspec: trimmed.to_string(),
            name,
            op,
            version,
        })
    }

    /// The name being tested.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The comparison operator, if a version constraint was given.
    pub fn op(&self) -> Option<Op> {
        self.op
    }

    /// The constraint version, if any.
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// True if `provider` satisfies this expression: the names match
    /// and, when a version constraint is present, the provider's
    /// version passes it.
    ///
    /// Fails with [`Error::UnsupportedOperator`] if this expression
    /// uses `~`, which the grammar accepts but which has no defined
    /// evaluation semantics.
    pub fn test(&self, provider: &Provider) -> Result<bool, Error> {
        if self.name != provider.name {
            return Ok(false);
        }
        let Some(op) = self.op else {
            return Ok(true);
        };
        let required = self.version.as_ref().expect("op implies version");
        let Some(provider_version) = provider.version.as_ref() else {
            return Ok(false);
        };
        op.apply(provider_version, required).ok_or_else(|| Error::UnsupportedOperator {
            expression: self.testspec.clone(),
        })
    }
}

impl fmt::Display for Testable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.testspec)
    }
}

/// A `requires` entry: satisfied when its target [`Testable::test`]
/// returns true.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Requirement(pub Testable);

impl Requirement {
    /// Parses a requirement expression.
    pub fn parse(testspec: &str) -> Result<Self, Error> {
        Testable::parse(testspec).map(Self)
    }

    /// True if `provider` satisfies this requirement.
    pub fn test(&self, provider: &Provider) -> Result<bool, Error> {
        self.0.test(provider)
    }

    /// The required name.
    pub fn name(&self) -> &str {
        self.0.name()
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A `conflicts` entry: fires when a provider matching its target
/// expression is present. Unlike the original Python implementation
/// (whose `Conflict.test` called `Testable.test` with the wrong
/// receiver and inverted the result — almost certainly a bug, since
/// every call site reads `if conf.test(tprov): raise conflict`, which
/// only makes sense if `test` returns true on a *match*), this returns
/// true exactly when the wrapped [`Testable::test`] does.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Conflict(pub Testable);

impl Conflict {
    /// Parses a conflict expression.
    pub fn parse(testspec: &str) -> Result<Self, Error> {
        Testable::parse(testspec).map(Self)
    }

    /// True if `provider` matches (and therefore conflicts with) this
    /// expression.
    pub fn test(&self, provider: &Provider) -> Result<bool, Error> {
        self.0.test(provider)
    }

    /// The conflicting name.
    pub fn name(&self) -> &str {
        self.0.name()
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn parses_bare_name() {
        let t = Testable::parse("hdf5").unwrap();
        assert_eq!(t.name(), "hdf5");
        assert_eq!(t.op(), None);
    }

    #[rstest]
    #[case("netcdf >= 4.3", Op::Ge, "4.3")]
    #[case("netcdf==4.3.1", Op::Eq, "4.3.1")]
    #[case("netcdf != 1", Op::Ne, "1")]
    fn parses_operator_and_version(#[case] spec: &str, #[case] op: Op, #[case] version: &str) {
        let t = Testable::parse(spec).unwrap();
        assert_eq!(t.op(), Some(op));
        assert_eq!(t.version().unwrap().as_str(), version);
    }

    #[test]
    fn rejects_malformed_expression() {
        assert!(Testable::parse("1nope").is_err());
        assert!(Testable::parse("name >>").is_err());
    }

    #[test]
    fn bare_name_matches_any_version() {
        let req = Requirement::parse("hdf5").unwrap();
        let prov = Provider::new("hdf5", Some(Version::new("1.8.3").unwrap()));
        assert!(req.test(&prov).unwrap());
    }

    #[test]
    fn versioned_requirement_respects_operator() {
        let req = Requirement::parse("netcdf >= 4.3").unwrap();
        let low = Provider::new("netcdf", Some(Version::new("4.2").unwrap()));
        let high = Provider::new("netcdf", Some(Version::new("4.3.1").unwrap()));
        assert!(!req.test(&low).unwrap());
        assert!(req.test(&high).unwrap());
    }

    #[test]
    fn tilde_operator_parses_but_rejects_at_eval() {
        let req = Requirement::parse("netcdf ~ 4.3").unwrap();
        let prov = Provider::new("netcdf", Some(Version::new("4.3").unwrap()));
        assert!(matches!(req.test(&prov), Err(Error::UnsupportedOperator { .. })));
    }

    #[test]
    fn conflict_fires_on_match() {
        let conf = Conflict::parse("openmpi < 2.0").unwrap();
        let prov = Provider::new("openmpi", Some(Version::new("1.6.5").unwrap()));
        assert!(conf.test(&prov).unwrap());
    }
}
