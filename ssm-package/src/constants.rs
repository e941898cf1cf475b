//! Fixed directory sets, grounded on `ssm/constants.py`.

/// Subtrees of a package that are published into a domain's per-platform
/// tree.
pub const PUBLISHABLE_DIRS: &[&str] = &["bin", "etc/profile.d", "include", "lib", "man", "share"];

/// Components a [`crate::PackageFileSkeleton`] may synthesize.
pub const SKELETON_COMPS: &[&str] = &["control", "pubdirs"];
