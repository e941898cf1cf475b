use std::path::PathBuf;

/// An error that can occur while querying or mutating a [`crate::Domain`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `create` was called on an existing domain without `force`.
    #[error("domain already exists at {path}")]
    AlreadyExists {
        /// The domain path.
        path: PathBuf,
    },

    /// The current process does not own the domain directory.
    #[error("must own domain at {path}")]
    NotOwner {
        /// The domain path.
        path: PathBuf,
    },

    /// A package file failed its own validity check.
    #[error("package file is not valid: {path}")]
    InvalidPackageFile {
        /// The archive that failed validation.
        path: PathBuf,
    },

    /// A package directory's basename does not parse into a
    /// `SHORT_VERSION_PLATFORM` name triple.
    #[error("not a valid package name: {path}")]
    InvalidPackageName {
        /// The unparseable package directory.
        path: PathBuf,
    },

    /// `install` was called without `force`/`reinstall` on an already
    /// installed package.
    #[error("package {name} is already installed")]
    AlreadyInstalled {
        /// The package name.
        name: String,
    },

    /// An operation required an installed package that isn't.
    #[error("package {name} is not installed")]
    NotInstalled {
        /// The package name.
        name: String,
    },

    /// `publish` was called without `force` on an already published
    /// package.
    #[error("package {name} is already published on {platform}")]
    AlreadyPublished {
        /// The package name.
        name: String,
        /// The platform it is published on.
        platform: String,
    },

    /// An operation required a published package that isn't.
    #[error("package {name} is not published on {platform}")]
    NotPublished {
        /// The package name.
        name: String,
        /// The platform it was expected to be published on.
        platform: String,
    },

    /// `uninstall` was refused because the package is still published.
    #[error("package {name} is published and cannot be uninstalled")]
    StillPublished {
        /// The package name.
        name: String,
    },

    /// `install` failed after partially unpacking; the partial package
    /// directory was moved under `etc/ssm.d/broken/`.
    #[error("install of {name} failed: {reason}")]
    InstallFailed {
        /// The package name.
        name: String,
        /// A human-readable explanation.
        reason: String,
    },

    /// `uninstall` failed.
    #[error("uninstall of {name} failed: {reason}")]
    UninstallFailed {
        /// The package name.
        name: String,
        /// A human-readable explanation.
        reason: String,
    },

    /// `publish` failed partway through materializing symlinks.
    #[error("publish of {name} on {platform} failed: {reason}")]
    PublishFailed {
        /// The package name.
        name: String,
        /// The target platform.
        platform: String,
        /// A human-readable explanation.
        reason: String,
    },

    /// `unpublish` failed partway through removing symlinks.
    #[error("unpublish of {name} on {platform} failed: {reason}")]
    UnpublishFailed {
        /// The package name.
        name: String,
        /// The target platform.
        platform: String,
        /// A human-readable explanation.
        reason: String,
    },

    /// `prepublish` found a requirement with no published provider.
    #[error("missing published package {name}")]
    MissingPackage {
        /// The unmet dependency's short name.
        name: String,
    },

    /// An operation that requires the current layout was called on a
    /// legacy domain.
    #[error("operation not supported on legacy domain at {path}")]
    LegacyUnsupported {
        /// The domain path.
        path: PathBuf,
    },

    /// A package file operation failed.
    #[error(transparent)]
    Package(#[from] ssm_package::Error),

    /// A control file operation failed.
    #[error(transparent)]
    Control(#[from] ssm_control::Error),

    /// A dependency resolution operation failed.
    #[error(transparent)]
    Deps(#[from] ssm_deps::Error),

    /// A filesystem primitive failed.
    #[error(transparent)]
    Fs(#[from] ssm_common::Error),

    /// A name/version/platform parse failed.
    #[error(transparent)]
    Types(#[from] ssm_types::Error),

    /// An underlying I/O operation failed.
    #[error("I/O error on {path}:\n{source}")]
    Io {
        /// The path being operated on.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
