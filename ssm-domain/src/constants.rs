//! Fixed values describing the current on-disk domain layout.

/// The domain metadata version this crate writes into new/upgraded
/// `meta.json` files. Distinct from any of the legacy prefixes
/// (`7.`, `8.`, `9.`, `10`) that mark a domain as legacy.
pub const SSM_VERSION: &str = "11.8";

/// `meta.json`/legacy `version` prefixes that mark a domain as legacy,
/// matching `ssm/domain.py::Domain::is_legacy`'s `version[:2]` check.
pub const LEGACY_VERSION_PREFIXES: &[&str] = &["10", "9.", "8.", "7."];
