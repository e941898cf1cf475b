//! Readers for the legacy, pre-`meta.json` domain files: `version`,
//! `label`, `sources.list`, one flat value per file.
//!
//! Grounded on `ssm/misc.py::gets` (read whole file, `None` on any
//! failure) and `ssm_upgraded.py::upgrade_legacy`'s use of it to seed a
//! fresh `meta.json` during upgrade.

use std::fs;
use std::path::Path;

use crate::constants::LEGACY_VERSION_PREFIXES;

/// Reads a single-value legacy file, trimming the trailing newline
/// `puts`-written files always carry. Returns `None` if the file is
/// absent or unreadable, matching `gets`'s blanket `except -> None`.
fn read_legacy_value(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim_end().to_string())
}

/// Reads `etc/ssm.d/version`.
pub fn read_version(ssmd_path: &Path) -> Option<String> {
    read_legacy_value(&ssmd_path.join("version"))
}

/// Reads `etc/ssm.d/label`.
pub fn read_label(ssmd_path: &Path) -> Option<String> {
    read_legacy_value(&ssmd_path.join("label"))
}

/// Reads `etc/ssm.d/sources.list`.
pub fn read_sources(ssmd_path: &Path) -> Option<String> {
    read_legacy_value(&ssmd_path.join("sources.list"))
}

/// True if `version` begins with any of the legacy prefixes (`7.`,
/// `8.`, `9.`, `10`), matching `Domain::is_legacy`'s `version[:2]` check.
pub fn is_legacy_version(version: &str) -> bool {
    LEGACY_VERSION_PREFIXES
        .iter()
        .any(|prefix| version.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn reads_and_trims_legacy_value() -> TestResult {
        let dir = tempdir()?;
        fs::write(dir.path().join("label"), "foo\n")?;
        assert_eq!(read_label(dir.path()).as_deref(), Some("foo"));
        Ok(())
    }

    #[test]
    fn missing_legacy_file_is_none() -> TestResult {
        let dir = tempdir()?;
        assert_eq!(read_version(dir.path()), None);
        Ok(())
    }

    #[test]
    fn legacy_version_prefixes_detected() {
        assert!(is_legacy_version("10.0"));
        assert!(is_legacy_version("9.2"));
        assert!(is_legacy_version("8.1"));
        assert!(is_legacy_version("7.0"));
        assert!(!is_legacy_version("11.8"));
    }
}
