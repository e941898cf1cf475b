//! Package lookup over one or more repository locations.
//!
//! Grounded on `ssm/repository.py`: a `Repository` is nothing more than a
//! base path plus a lookup that builds a [`PackageFile`] for a candidate
//! name; a [`RepositoryGroup`] tries each of its repositories in the order
//! they were added and returns the first hit.

use std::path::{Path, PathBuf};

use ssm_package::PackageFile;

/// A single source of package archives, addressed by a filesystem path
/// (a mounted NFS share, in the original deployment's typical use).
#[derive(Clone, Debug)]
pub struct Repository {
    url: PathBuf,
}

impl Repository {
    /// Creates a repository rooted at `url`.
    pub fn new(url: impl Into<PathBuf>) -> Self {
        Self { url: url.into() }
    }

    /// The repository's root path.
    pub fn url(&self) -> &Path {
        &self.url
    }

    /// Looks up `name` (a package name triple, without the `.ssm`
    /// suffix) in this repository. Returns `None` if no archive exists
    /// there, matching `Repository.get_packagefile`'s broad
    /// `try/except -> None`.
    pub fn get_packagefile(&self, name: &str) -> Option<PackageFile> {
        let path = self.url.join(format!("{name}.ssm"));
        let pkgf = PackageFile::new(path);
        if pkgf.exists() {
            Some(pkgf)
        } else {
            None
        }
    }
}

/// An ordered collection of [`Repository`] locations, queried in turn.
#[derive(Clone, Debug, Default)]
pub struct RepositoryGroup {
    repos: Vec<Repository>,
}

impl RepositoryGroup {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a group from an ordered list of repository URLs.
    pub fn from_urls(urls: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut group = Self::new();
        for url in urls {
            group.add_url(url);
        }
        group
    }

    /// Appends a repository at `url` to the end of the search order.
    pub fn add_url(&mut self, url: impl Into<PathBuf>) {
        self.repos.push(Repository::new(url));
    }

    /// The repositories in search order.
    pub fn repositories(&self) -> &[Repository] {
        &self.repos
    }

    /// Looks up `name` across every repository in order, returning the
    /// first hit.
    pub fn get_packagefile(&self, name: &str) -> Option<PackageFile> {
        self.repos.iter().find_map(|repo| repo.get_packagefile(name))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn repository_finds_existing_archive() -> TestResult {
        let dir = tempdir()?;
        fs::write(dir.path().join("hello_1.0_linux.ssm"), b"")?;
        let repo = Repository::new(dir.path());
        assert!(repo.get_packagefile("hello_1.0_linux").is_some());
        assert!(repo.get_packagefile("missing_1.0_linux").is_none());
        Ok(())
    }

    #[test]
    fn group_queries_repositories_in_order() -> TestResult {
        let first = tempdir()?;
        let second = tempdir()?;
        fs::write(second.path().join("hello_1.0_linux.ssm"), b"")?;

        let group = RepositoryGroup::from_urls([first.path().to_path_buf(), second.path().to_path_buf()]);
        let found = group.get_packagefile("hello_1.0_linux");
        assert!(found.is_some());
        assert_eq!(found.unwrap().path, second.path().join("hello_1.0_linux.ssm"));
        Ok(())
    }

    #[test]
    fn group_returns_none_when_no_repository_has_it() {
        let group = RepositoryGroup::new();
        assert!(group.get_packagefile("hello_1.0_linux").is_none());
    }
}
