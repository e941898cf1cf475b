//! On-disk `.ssm` package archives and unpacked package directories.

mod constants;
mod error;
mod package;
mod packagefile;
mod source;

pub use constants::{PUBLISHABLE_DIRS, SKELETON_COMPS};
pub use error::Error;
pub use package::Package;
pub use packagefile::{PackageFile, PackageFileSkeleton};
pub use source::PackageSource;
