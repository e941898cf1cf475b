//! A common interface over the different things `ssm_install.py` can
//! hand to `Domain.install`: an archive on disk, or a synthesized
//! skeleton with no backing archive at all. The Python original relies
//! on duck typing (`pkgf` is either a `PackageFile` or a
//! `PackageFileSkeleton`, and `Domain.install` just calls `.unpack()`
//! and reads `.name`); this trait makes that contract explicit.

use std::path::Path;

use crate::packagefile::{PackageFile, PackageFileSkeleton};
use crate::Error;

/// Something that can be installed into a domain: validated, then
/// unpacked into a destination directory.
pub trait PackageSource {
    /// The package's `SHORT_VERSION_PLATFORM` name.
    fn name(&self) -> &str;
    /// True if this source is well-formed enough to install.
    fn is_valid(&self) -> bool;
    /// Materializes the package's contents under `dst_dir`.
    fn unpack(&self, dst_dir: &Path) -> Result<(), Error>;
}

impl PackageSource for PackageFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        PackageFile::is_valid(self)
    }

    fn unpack(&self, dst_dir: &Path) -> Result<(), Error> {
        PackageFile::unpack(self, dst_dir)
    }
}

impl PackageSource for PackageFileSkeleton {
    fn name(&self) -> &str {
        PackageFileSkeleton::name(self)
    }

    fn is_valid(&self) -> bool {
        PackageFileSkeleton::is_valid(self)
    }

    fn unpack(&self, dst_dir: &Path) -> Result<(), Error> {
        PackageFileSkeleton::unpack(self, dst_dir)
    }
}
