use std::path::PathBuf;

/// An error that can occur when parsing or validating a core SSM value type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A package name did not split into a `SHORT_VERSION_PLATFORM` triple.
    #[error("Invalid package name {name:?}: expected SHORT_VERSION_PLATFORM")]
    InvalidPackageName {
        /// The name that failed to parse.
        name: String,
    },

    /// A version string did not match the dotted-series grammar.
    #[error("Invalid version {version:?}")]
    InvalidVersion {
        /// The version string that failed to parse.
        version: String,
    },

    /// A platform label was empty.
    #[error("Platform label must not be empty")]
    EmptyPlatform,

    /// A package reference of the form `[DOMPATH/]NAME` could not be split.
    #[error("Invalid package reference {reference:?}")]
    InvalidPackageRef {
        /// The reference that failed to parse.
        reference: String,
    },

    /// A path that was expected to be absolute was not.
    #[error("Path is not absolute: {path:?}")]
    NotAbsolute {
        /// The offending path.
        path: PathBuf,
    },
}
