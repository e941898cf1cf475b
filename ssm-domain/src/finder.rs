//! Recursive domain discovery under one or more starting paths.
//!
//! Grounded on `ssm_find.py`'s `DirWalker` plus its `run` command's
//! per-directory pruning rules: a `.skip-ssm` marker or a dot-prefixed
//! directory name both stop the walk from descending, and a directory
//! that is itself a domain is not searched further for nested domains.

use std::path::{Path, PathBuf};

use ssm_common::walker::Walker;

use crate::Error;

/// True if `path` looks like a domain root: it has an `etc/ssm.d`
/// directory, matching `ssm/domain.py::Domain::exists`'s check (without
/// requiring `meta.json` to exist yet, since a legacy domain has none).
pub fn is_domain(path: &Path) -> bool {
    path.join("etc/ssm.d").is_dir()
}

/// One directory visited by a [`DomainFinder`]: either a domain root, or
/// a plain directory still being searched.
#[derive(Clone, Debug)]
pub enum FindEntry {
    /// `path` is a domain root; the finder will not descend into it.
    Domain {
        /// The domain's root path.
        path: PathBuf,
    },
    /// `path` is a plain directory that was searched.
    Dir {
        /// The directory's path.
        path: PathBuf,
    },
    /// `path` was skipped: a `.skip-ssm` marker, or a dot-prefixed name.
    Skipped {
        /// The skipped directory's path.
        path: PathBuf,
    },
}

/// Walks one starting path looking for domain roots, pruning at
/// `.skip-ssm` markers, dot-prefixed directories, and domain roots
/// themselves (a domain never contains a nested one worth finding).
#[derive(Debug)]
pub struct DomainFinder {
    walker: Walker,
}

impl DomainFinder {
    /// Creates a finder rooted at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            walker: Walker::new(path),
        }
    }

    /// Returns the next entry in the walk, or `None` when exhausted.
    pub fn next_entry(&mut self) -> Result<Option<FindEntry>, Error> {
        let Some(entry) = self.walker.next_entry()? else {
            return Ok(None);
        };

        if entry.dir.join(".skip-ssm").exists() {
            self.walker.skip_current_dir();
            return Ok(Some(FindEntry::Skipped { path: entry.dir }));
        }

        let is_hidden = entry
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(false);
        if is_hidden {
            self.walker.skip_current_dir();
            return Ok(Some(FindEntry::Skipped { path: entry.dir }));
        }

        if is_domain(&entry.dir) {
            self.walker.skip_current_dir();
            return Ok(Some(FindEntry::Domain { path: entry.dir }));
        }

        Ok(Some(FindEntry::Dir { path: entry.dir }))
    }
}

/// Searches every path in `roots` and returns every domain found,
/// draining each [`DomainFinder`] in turn.
pub fn find_domains(roots: &[PathBuf]) -> Result<Vec<PathBuf>, Error> {
    let mut found = Vec::new();
    for root in roots {
        let mut finder = DomainFinder::new(root.clone());
        while let Some(entry) = finder.next_entry()? {
            if let FindEntry::Domain { path } = entry {
                found.push(path);
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn finds_domain_and_skips_nested_search() -> TestResult {
        let dir = tempdir()?;
        let dom_path = dir.path().join("domA");
        fs::create_dir_all(dom_path.join("etc/ssm.d"))?;
        // a directory nested inside the domain that would itself look
        // like a domain, to confirm the finder does not descend.
        fs::create_dir_all(dom_path.join("sub/etc/ssm.d"))?;

        let found = find_domains(&[dir.path().to_path_buf()])?;
        assert_eq!(found, vec![dom_path]);
        Ok(())
    }

    #[test]
    fn skip_marker_prunes_subtree() -> TestResult {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join("skip-me/etc/ssm.d"))?;
        fs::write(dir.path().join("skip-me/.skip-ssm"), b"")?;

        let found = find_domains(&[dir.path().to_path_buf()])?;
        assert!(found.is_empty());
        Ok(())
    }

    #[test]
    fn hidden_directories_are_pruned() -> TestResult {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join(".hidden/etc/ssm.d"))?;

        let found = find_domains(&[dir.path().to_path_buf()])?;
        assert!(found.is_empty());
        Ok(())
    }

    #[test]
    fn is_domain_requires_ssmd_directory() -> TestResult {
        let dir = tempdir()?;
        assert!(!is_domain(dir.path()));
        fs::create_dir_all(dir.path().join("etc/ssm.d"))?;
        assert!(is_domain(dir.path()));
        Ok(())
    }
}
