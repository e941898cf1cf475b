use std::path::PathBuf;

/// An error that can occur while manipulating the filesystem on behalf of
/// a higher-level SSM operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Creating a directory (and its parents) failed.
    #[error("Failed to create directory {path}:\n{source}")]
    MakeDirs {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Creating a symlink failed.
    #[error("Failed to create symlink {link} -> {target}:\n{source}")]
    Symlink {
        /// The symlink path that could not be created.
        link: PathBuf,
        /// The intended link target.
        target: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Removing a file or symlink failed.
    #[error("Failed to remove {path}:\n{source}")]
    Remove {
        /// The path that could not be removed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Removing a directory failed.
    #[error("Failed to remove directory {path}:\n{source}")]
    RemoveDir {
        /// The directory that could not be removed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Removing a directory tree failed.
    #[error("Failed to remove directory tree {path}:\n{source}")]
    RemoveTree {
        /// The directory tree that could not be removed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Reading a directory's entries failed.
    #[error("Failed to read directory {path}:\n{source}")]
    ReadDir {
        /// The directory that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Resolving the real (canonical) path of an entry failed.
    #[error("Failed to resolve real path of {path}:\n{source}")]
    RealPath {
        /// The path that could not be resolved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
