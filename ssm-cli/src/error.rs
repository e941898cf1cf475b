//! The CLI's error type: wraps every library crate's error plus the
//! argument- and state-validation failures that only make sense at the
//! command-line boundary (bad/missing arguments, domain not found, an
//! old domain that needs `upgraded` first).

use std::path::PathBuf;

/// An error that can occur while running an `ssm` subcommand.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Arguments were missing, mutually exclusive, or otherwise
    /// malformed, matching every driver script's `exits("error:
    /// bad/missing arguments")`.
    #[error("bad/missing arguments")]
    BadArguments,

    /// No domain exists at the given path.
    #[error("cannot find domain ({0})")]
    DomainNotFound(PathBuf),

    /// The domain predates the current metadata layout.
    #[error("old domain ({0}) not supported; you may want to upgrade")]
    LegacyDomain(PathBuf),

    /// A referenced package is not installed in its domain.
    #[error("cannot find package ({0})")]
    PackageNotFound(String),

    /// A referenced package archive or repository entry is absent.
    #[error("cannot find package file ({0})")]
    PackageFileNotFound(String),

    /// `makepkg`'s basename did not split into a `SHORT_VERSION_PLATFORM`
    /// triple.
    #[error("bad package name ({0})")]
    BadPackageName(String),

    /// A source directory named by `makepkg`/`-s` does not exist.
    #[error("cannot find directory")]
    DirectoryNotFound,

    /// `build` needs a repository URL and none was given or configured.
    #[error("no repository for installing packages")]
    NoRepository,

    /// The general "operation failed" catch-all every driver script
    /// falls back to once argument parsing has succeeded.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// A domain operation failed.
    #[error(transparent)]
    Domain(#[from] ssm_domain::Error),

    /// A package operation failed.
    #[error(transparent)]
    Package(#[from] ssm_package::Error),

    /// A control file operation failed.
    #[error(transparent)]
    Control(#[from] ssm_control::Error),

    /// A dependency resolution operation failed.
    #[error(transparent)]
    Deps(#[from] ssm_deps::Error),

    /// A build operation failed.
    #[error(transparent)]
    Build(#[from] ssm_build::Error),

    /// A name/version/platform/reference parse failed.
    #[error(transparent)]
    Types(#[from] ssm_types::Error),

    /// A filesystem primitive failed.
    #[error(transparent)]
    Fs(#[from] ssm_common::Error),

    /// An underlying I/O operation failed.
    #[error("I/O error on {path}:\n{source}")]
    Io {
        /// The path being operated on.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
