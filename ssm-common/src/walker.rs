//! A directory walker whose traversal state can be mutated mid-iteration.
//!
//! Grounded on Design Note "Iterators with side-effectful skip": the
//! Python original's `os.walk` generator exposes a `dirnames` list the
//! caller can mutate in place to prune the walk. Rust's `Iterator` trait
//! has no such hook, so this is modeled as an explicit struct with a
//! `skip_current_dir` method instead of a lazy sequence.

use std::path::{Path, PathBuf};

use crate::fs::list_dir_one_level;
use crate::Error;

/// One directory yielded by a [`Walker`].
#[derive(Clone, Debug)]
pub struct WalkEntry {
    /// The directory's path.
    pub dir: PathBuf,
    /// Files directly inside `dir`.
    pub files: Vec<PathBuf>,
}

/// A depth-first, pre-order directory walker that supports skipping the
/// subtree of the entry just yielded.
#[derive(Debug)]
pub struct Walker {
    stack: Vec<PathBuf>,
    skip_requested: bool,
}

impl Walker {
    /// Creates a walker rooted at `root`. `root` itself is the first
    /// entry yielded by [`Walker::next_entry`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            stack: vec![root.into()],
            skip_requested: false,
        }
    }

    /// Prevents descent into the directory most recently returned by
    /// [`Walker::next_entry`]. Has no effect once another entry has been
    /// produced.
    pub fn skip_current_dir(&mut self) {
        self.skip_requested = true;
    }

    /// Returns the next directory in the walk, or `None` when exhausted.
    pub fn next_entry(&mut self) -> Result<Option<WalkEntry>, Error> {
        let Some(dir) = self.stack.pop() else {
            return Ok(None);
        };

        let (subdirs, files) = list_dir_one_level(&dir)?;

        if self.skip_requested {
            self.skip_requested = false;
        } else {
            // Push in reverse so iteration order is lexicographic-ish and
            // deterministic for a fixed directory listing order.
            let mut subdirs = subdirs;
            subdirs.sort();
            for subdir in subdirs.into_iter().rev() {
                self.stack.push(subdir);
            }
        }

        Ok(Some(WalkEntry { dir, files }))
    }
}

/// True if `path` (or any of its ancestors up to `root`) contains a
/// `.skip-ssm` marker file, per spec §4.8.
pub fn is_pruned_by_marker(path: &Path) -> bool {
    path.join(".skip-ssm").exists()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn walks_nested_directories() -> TestResult {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join("a/b"))?;
        fs::write(dir.path().join("a/b/file.txt"), b"x")?;

        let mut walker = Walker::new(dir.path());
        let mut seen = Vec::new();
        while let Some(entry) = walker.next_entry()? {
            seen.push(entry.dir);
        }
        assert_eq!(seen.len(), 3);
        Ok(())
    }

    #[test]
    fn skip_current_dir_prunes_subtree() -> TestResult {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join("skip-me/inner"))?;
        fs::create_dir_all(dir.path().join("keep-me/inner"))?;

        let mut walker = Walker::new(dir.path());
        let mut seen = Vec::new();
        while let Some(entry) = walker.next_entry()? {
            let is_root = entry.dir == dir.path();
            seen.push(entry.dir.clone());
            if !is_root && entry.dir.file_name().unwrap() == "skip-me" {
                walker.skip_current_dir();
            }
        }

        assert!(!seen.iter().any(|p| p.ends_with("skip-me/inner")));
        assert!(seen.iter().any(|p| p.ends_with("keep-me/inner")));
        Ok(())
    }

    #[test]
    fn marker_file_detected() -> TestResult {
        let dir = tempdir()?;
        assert!(!is_pruned_by_marker(dir.path()));
        fs::write(dir.path().join(".skip-ssm"), b"")?;
        assert!(is_pruned_by_marker(dir.path()));
        Ok(())
    }
}
