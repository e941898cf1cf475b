//! `.ssm` archive validation and extraction.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use log::debug;
use ssm_control::Control;
use ssm_types::PackageName;
use tar::Archive;

use crate::constants::PUBLISHABLE_DIRS;
use crate::package::Package;
use crate::Error;

fn is_gzip(path: &Path) -> Result<bool, Error> {
    let mut file = File::open(path).map_err(|source| Error::OpenArchive {
        path: path.to_path_buf(),
        source,
    })?;
    let mut magic = [0u8; 2];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == [0x1f, 0x8b]),
        Err(_) => Ok(false),
    }
}

/// Opens `path` as a tar archive, transparently sniffing for gzip
/// compression (spec §6: "optionally gzip-compressed; readers must
/// sniff").
fn open_archive(path: &Path) -> Result<Archive<Box<dyn Read>>, Error> {
    let file = File::open(path).map_err(|source| Error::OpenArchive {
        path: path.to_path_buf(),
        source,
    })?;
    let reader: Box<dyn Read> = if is_gzip(path)? {
        Box::new(flate2::read::GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(Archive::new(reader))
}

/// Returns the normalized relative path of a tar member, rejecting any
/// member whose path is absolute or contains a `..` component (path
/// traversal defense, spec P6).
fn safe_member_path(raw: &Path) -> Result<PathBuf, Error> {
    let mut out = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::PathTraversal {
                    member: raw.display().to_string(),
                });
            }
        }
    }
    Ok(out)
}

/// A `.ssm` package archive on disk, not yet unpacked.
#[derive(Clone, Debug)]
pub struct PackageFile {
    /// Absolute path to the archive file.
    pub path: PathBuf,
    /// The archive's file name (e.g. `hello_1.0_linux-x86-64.ssm`).
    pub filename: String,
    /// The package name: `filename` with the `.ssm` suffix removed.
    pub name: String,
}

impl PackageFile {
    /// Builds a [`PackageFile`] for the archive at `path`. Does not
    /// touch the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = filename.strip_suffix(".ssm").unwrap_or(&filename).to_string();
        Self {
            path,
            filename,
            name,
        }
    }

    /// True if the archive file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Validates that the archive opens as a tar file and that every
    /// member's path begins with the package name, matching
    /// `PackageFile.is_valid`.
    pub fn is_valid(&self) -> bool {
        self.check_members().is_ok()
    }

    fn check_members(&self) -> Result<(), Error> {
        let mut archive = open_archive(&self.path)?;
        let entries = archive.entries().map_err(|source| Error::ReadMember {
            path: self.path.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| Error::ReadMember {
                path: self.path.clone(),
                source,
            })?;
            let raw_path = entry.path().map_err(|source| Error::ReadMember {
                path: self.path.clone(),
                source,
            })?;
            let safe = safe_member_path(&raw_path)?;
            if !safe.starts_with(&self.name) {
                return Err(Error::MemberOutsidePackage {
                    name: self.name.clone(),
                    member: raw_path.display().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Extracts the archive into `dst_dir`, then upgrades a legacy
    /// control file to the current JSON format if necessary.
    ///
    /// Refuses (without writing anything outside `dst_dir`) any member
    /// whose path escapes `dst_dir` or does not start with the package
    /// name, matching `PackageFile.unpack` plus the path-traversal
    /// defense from spec P6.
    pub fn unpack(&self, dst_dir: &Path) -> Result<(), Error> {
        self.check_members()?;

        let mut archive = open_archive(&self.path)?;
        let entries = archive.entries().map_err(|source| Error::ReadMember {
            path: self.path.clone(),
            source,
        })?;
        for entry in entries {
            let mut entry = entry.map_err(|source| Error::ReadMember {
                path: self.path.clone(),
                source,
            })?;
            let raw_path = entry.path().map_err(|source| Error::ReadMember {
                path: self.path.clone(),
                source,
            })?.into_owned();
            let safe = safe_member_path(&raw_path)?;
            let target = dst_dir.join(&safe);
            debug!("unpack: {} -> {}", raw_path.display(), target.display());
            entry.unpack(&target).map_err(|source| Error::Unpack {
                path: self.path.clone(),
                dest: dst_dir.to_path_buf(),
                source,
            })?;
        }

        self.upgrade_control(dst_dir)
    }

    fn upgrade_control(&self, dst_dir: &Path) -> Result<(), Error> {
        let pkg = Package::new(dst_dir.join(&self.name));
        if pkg.has_control(false) {
            return Ok(());
        }

        let control = pkg.get_control(true)?;
        let Some(name) = control.name().map(str::to_string) else {
            return Err(Error::BadControl {
                path: pkg.path.clone(),
                reason: "missing control file".to_string(),
            });
        };

        let expected: PackageName = self.name.parse()?;
        let version = control.version().unwrap_or_default();
        let platform = control.platform().unwrap_or_default();
        if name != expected.short() {
            return Err(Error::BadControl {
                path: pkg.path.clone(),
                reason: format!(
                    "control name ({name}) does not match file name ({})",
                    expected.short()
                ),
            });
        }
        if version != expected.version().as_str() {
            return Err(Error::BadControl {
                path: pkg.path.clone(),
                reason: format!(
                    "control version ({version}) does not match file name ({})",
                    expected.version()
                ),
            });
        }
        if platform != expected.platform().as_str() {
            return Err(Error::BadControl {
                path: pkg.path.clone(),
                reason: format!(
                    "control platform ({platform}) does not match file name ({})",
                    expected.platform()
                ),
            });
        }

        pkg.put_control(&control)
    }
}

/// A synthesized package with no archive source: emits a minimal
/// control file and optionally empty [`PUBLISHABLE_DIRS`], matching
/// `PackageFileSkeleton`.
#[derive(Clone, Debug)]
pub struct PackageFileSkeleton {
    inner: PackageFile,
    components: Vec<String>,
}

impl PackageFileSkeleton {
    /// Builds a skeleton for the would-be archive at `path`, synthesizing
    /// the components named in `components` (see [`crate::constants::SKELETON_COMPS`]).
    pub fn new(path: impl Into<PathBuf>, components: Vec<String>) -> Self {
        Self {
            inner: PackageFile::new(path),
            components,
        }
    }

    /// The synthesized package name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Always true: a skeleton needs no backing archive.
    pub fn exists(&self) -> bool {
        true
    }

    /// Always true: a skeleton needs no validation.
    pub fn is_valid(&self) -> bool {
        true
    }

    /// Creates the package directory and synthesizes its control file
    /// and/or empty publishable directories.
    pub fn unpack(&self, dst_dir: &Path) -> Result<(), Error> {
        let pkg = Package::new(dst_dir.join(&self.inner.name));
        ssm_common::fs::makedirs(&pkg.path)?;

        if self.components.iter().any(|c| c == "control") {
            let name: PackageName = self.inner.name.parse()?;
            let mut control = pkg.get_control(false)?;
            control.set("name", name.short());
            control.set("version", name.version().to_string());
            control.set("platform", name.platform().to_string());
            control.set("summary", self.inner.name.clone());
            pkg.put_control(&control)?;
        }

        if self.components.iter().any(|c| c == "pubdirs") {
            for dirname in PUBLISHABLE_DIRS {
                ssm_common::fs::makedirs(&pkg.path.join(dirname))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File};
    use std::io::Write;

    use tempfile::tempdir;
    use testresult::TestResult;

    use super::*;

    fn write_tarball(path: &Path, entries: &[(&str, &[u8])]) -> TestResult {
        let file = File::create(path)?;
        let mut builder = tar::Builder::new(file);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data)?;
        }
        builder.finish()?;
        Ok(())
    }

    #[test]
    fn is_valid_rejects_foreign_member() -> TestResult {
        let dir = tempdir()?;
        let archive_path = dir.path().join("hello_1.0_linux.ssm");
        write_tarball(
            &archive_path,
            &[("other_1.0_linux/.ssm.d/control.json", b"{}")],
        )?;
        let pkgf = PackageFile::new(&archive_path);
        assert!(!pkgf.is_valid());
        Ok(())
    }

    #[test]
    fn is_valid_accepts_matching_members() -> TestResult {
        let dir = tempdir()?;
        let archive_path = dir.path().join("hello_1.0_linux.ssm");
        write_tarball(
            &archive_path,
            &[("hello_1.0_linux/.ssm.d/control.json", b"{}")],
        )?;
        let pkgf = PackageFile::new(&archive_path);
        assert!(pkgf.is_valid());
        Ok(())
    }

    #[test]
    fn unpack_rejects_path_traversal() -> TestResult {
        let dir = tempdir()?;
        let archive_path = dir.path().join("hello_1.0_linux.ssm");
        write_tarball(&archive_path, &[("hello_1.0_linux/../../evil", b"x")])?;
        let pkgf = PackageFile::new(&archive_path);
        let dst = dir.path().join("dst");
        fs::create_dir(&dst)?;
        assert!(pkgf.unpack(&dst).is_err());
        assert!(!dir.path().join("evil").exists());
        Ok(())
    }

    #[test]
    fn unpack_upgrades_legacy_control() -> TestResult {
        let dir = tempdir()?;
        let archive_path = dir.path().join("hello_1.0_linux.ssm");
        let legacy = b"Package: hello\nVersion: 1.0\nPlatform: linux\n";
        write_tarball(
            &archive_path,
            &[
                ("hello_1.0_linux/.ssm.d/control", legacy),
                ("hello_1.0_linux/bin/hello", b"#!/bin/sh\necho hi\n"),
            ],
        )?;
        let pkgf = PackageFile::new(&archive_path);
        let dst = dir.path().join("dst");
        fs::create_dir(&dst)?;
        pkgf.unpack(&dst)?;

        let control_json = dst.join("hello_1.0_linux/.ssm.d/control.json");
        assert!(control_json.is_file());
        let text = fs::read_to_string(control_json)?;
        assert!(text.contains("\"hello\""));
        Ok(())
    }

    #[test]
    fn unpack_rejects_control_triple_mismatch() -> TestResult {
        let dir = tempdir()?;
        let archive_path = dir.path().join("hello_1.0_linux.ssm");
        let legacy = b"Package: hello\nVersion: 2.0\nPlatform: linux\n";
        write_tarball(&archive_path, &[("hello_1.0_linux/.ssm.d/control", legacy)])?;
        let pkgf = PackageFile::new(&archive_path);
        let dst = dir.path().join("dst");
        fs::create_dir(&dst)?;
        assert!(pkgf.unpack(&dst).is_err());
        Ok(())
    }

    #[test]
    fn skeleton_creates_control_and_pubdirs() -> TestResult {
        let dir = tempdir()?;
        let skeleton = PackageFileSkeleton::new(
            dir.path().join("hello_1.0_linux.ssm"),
            vec!["control".to_string(), "pubdirs".to_string()],
        );
        let dst = dir.path().join("dst");
        fs::create_dir(&dst)?;
        skeleton.unpack(&dst)?;

        let pkg_path = dst.join("hello_1.0_linux");
        assert!(pkg_path.join(".ssm.d/control.json").is_file());
        assert!(pkg_path.join("bin").is_dir());
        assert!(pkg_path.join("share").is_dir());
        Ok(())
    }

    #[allow(dead_code)]
    fn touch(path: &Path) -> TestResult {
        let mut file = File::create(path)?;
        file.write_all(b"")?;
        Ok(())
    }
}
