//! Safe, logged filesystem primitives.
//!
//! Grounded on `ssm/misc.py`: every mutation is narrated at `debug` level
//! (the analogue of the Python original's `globls.verbose`-gated
//! `stderr.write` calls) instead of being gated by a module-global flag —
//! the binary raises the log level when `--verbose` is passed.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::Error;

/// Creates `path` and all missing parent directories.
pub fn makedirs(path: &Path) -> Result<(), Error> {
    debug!("makedirs({})", path.display());
    fs::create_dir_all(path).map_err(|source| Error::MakeDirs {
        path: path.to_path_buf(),
        source,
    })
}

/// Creates a single directory; fails if the parent does not exist.
pub fn mkdir(path: &Path) -> Result<(), Error> {
    debug!("mkdir({})", path.display());
    fs::create_dir(path).map_err(|source| Error::MakeDirs {
        path: path.to_path_buf(),
        source,
    })
}

/// Creates a symlink at `linkname` pointing at `target`.
///
/// When `force` is true and something already exists at `linkname`, it is
/// removed first (matching `ssm/misc.py::symlink`'s `force` parameter).
pub fn symlink(target: &Path, linkname: &Path, force: bool) -> Result<(), Error> {
    if force && linkname.symlink_metadata().is_ok() {
        remove(linkname)?;
    }
    debug!("symlink({}, {})", target.display(), linkname.display());
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, linkname).map_err(|source| Error::Symlink {
            link: linkname.to_path_buf(),
            target: target.to_path_buf(),
            source,
        })
    }
    #[cfg(not(unix))]
    {
        std::os::windows::fs::symlink_file(target, linkname).map_err(|source| Error::Symlink {
            link: linkname.to_path_buf(),
            target: target.to_path_buf(),
            source,
        })
    }
}

/// Removes a file or symlink (not a directory).
pub fn remove(path: &Path) -> Result<(), Error> {
    debug!("remove({})", path.display());
    fs::remove_file(path).map_err(|source| Error::Remove {
        path: path.to_path_buf(),
        source,
    })
}

/// Removes an empty directory.
pub fn rmdir(path: &Path) -> Result<(), Error> {
    debug!("rmdir({})", path.display());
    fs::remove_dir(path).map_err(|source| Error::RemoveDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Recursively removes a directory tree.
pub fn rmtree(path: &Path) -> Result<(), Error> {
    debug!("rmtree({})", path.display());
    fs::remove_dir_all(path).map_err(|source| Error::RemoveTree {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves `path` to its canonical, symlink-free form.
pub fn realpath(path: &Path) -> Result<PathBuf, Error> {
    fs::canonicalize(path).map_err(|source| Error::RealPath {
        path: path.to_path_buf(),
        source,
    })
}

/// True if `path` is a directory and not itself a symlink.
pub fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

/// Lists the immediate (non-recursive) subdirectories and files of `path`.
///
/// Grounded on `ssm/misc.py::oswalk1` (the first yield of `os.walk`). An
/// absent directory is treated as empty rather than an error, matching
/// `oswalk1`'s `return path, [], []` fallback. Classification follows
/// symlinks (a symlink to a directory is a "directory") the way
/// `os.walk` does, since domain registries are entirely made of
/// symlinks to package directories; a dangling symlink counts as a
/// file, its target never being reachable as a directory.
pub fn list_dir_one_level(path: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), Error> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            return Ok((dirs, files));
        }
        Err(source) => {
            return Err(Error::ReadDir {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    for entry in entries {
        let entry = entry.map_err(|source| Error::ReadDir {
            path: path.to_path_buf(),
            source,
        })?;
        let entry_path = entry.path();
        let is_dir = fs::metadata(&entry_path).map(|meta| meta.is_dir()).unwrap_or(false);
        if is_dir {
            dirs.push(entry_path);
        } else {
            files.push(entry_path);
        }
    }

    Ok((dirs, files))
}

/// Lists the base names of the immediate subdirectories of `path`.
pub fn list_dir_names_one_level(path: &Path) -> Result<Vec<String>, Error> {
    let (dirs, _files) = list_dir_one_level(path)?;
    Ok(dirs
        .into_iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn makedirs_creates_nested_path() -> TestResult {
        let dir = tempdir()?;
        let nested = dir.path().join("a/b/c");
        makedirs(&nested)?;
        assert!(nested.is_dir());
        Ok(())
    }

    #[test]
    fn symlink_force_replaces_existing() -> TestResult {
        let dir = tempdir()?;
        let target_a = dir.path().join("a");
        let target_b = dir.path().join("b");
        fs::write(&target_a, b"a")?;
        fs::write(&target_b, b"b")?;
        let link = dir.path().join("link");

        symlink(&target_a, &link, false)?;
        assert_eq!(fs::read_link(&link)?, target_a);

        symlink(&target_b, &link, true)?;
        assert_eq!(fs::read_link(&link)?, target_b);
        Ok(())
    }

    #[test]
    fn symlink_without_force_fails_on_existing() -> TestResult {
        let dir = tempdir()?;
        let target = dir.path().join("a");
        fs::write(&target, b"a")?;
        let link = dir.path().join("link");
        symlink(&target, &link, false)?;
        assert!(symlink(&target, &link, false).is_err());
        Ok(())
    }

    #[test]
    fn realpath_resolves_symlink() -> TestResult {
        let dir = tempdir()?;
        let target = dir.path().join("a");
        fs::write(&target, b"a")?;
        let link = dir.path().join("link");
        symlink(&target, &link, false)?;
        assert_eq!(realpath(&link)?, realpath(&target)?);
        Ok(())
    }

    #[test]
    fn list_dir_one_level_missing_dir_is_empty() -> TestResult {
        let dir = tempdir()?;
        let (dirs, files) = list_dir_one_level(&dir.path().join("nope"))?;
        assert!(dirs.is_empty());
        assert!(files.is_empty());
        Ok(())
    }

    #[test]
    fn list_dir_one_level_separates_dirs_and_files() -> TestResult {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("subdir"))?;
        fs::write(dir.path().join("file.txt"), b"x")?;
        let (dirs, files) = list_dir_one_level(dir.path())?;
        assert_eq!(dirs.len(), 1);
        assert_eq!(files.len(), 1);
        Ok(())
    }
}
