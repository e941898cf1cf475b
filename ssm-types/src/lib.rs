//! Core value types shared across the SSM workspace.
//!
//! `ssm-types` has no filesystem or process knowledge: it only parses and
//! orders the strings that make package identity legible — names,
//! versions, and platforms.

mod error;
mod name;
mod platform;
mod version;

pub use error::Error;
pub use name::{join_pkg_ref, split_pkg_ref, PackageName};
pub use platform::{Platform, PLATFORM_ALL, PLATFORM_MULTI};
pub use version::Version;
