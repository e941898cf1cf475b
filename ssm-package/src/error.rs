use std::path::PathBuf;

/// An error that can occur while validating, unpacking or executing a
/// package.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Opening the archive failed.
    #[error("Failed to open package archive {path}:\n{source}")]
    OpenArchive {
        /// The archive that could not be opened.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An archive member's name did not begin with the package name
    /// (path-traversal / wrong-package defense).
    #[error("Archive member {member:?} does not belong to package {name:?}")]
    MemberOutsidePackage {
        /// The archive's declared package name.
        name: String,
        /// The offending member path.
        member: String,
    },

    /// An archive member's normalized path escapes the extraction
    /// directory.
    #[error("Archive member {member:?} escapes the extraction directory")]
    PathTraversal {
        /// The offending member path.
        member: String,
    },

    /// Reading archive member metadata failed.
    #[error("Failed to read archive member metadata in {path}:\n{source}")]
    ReadMember {
        /// The archive being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Extracting the archive failed.
    #[error("Failed to unpack package archive {path} into {dest}:\n{source}")]
    Unpack {
        /// The archive that failed to extract.
        path: PathBuf,
        /// The destination directory.
        dest: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The unpacked package has neither a current nor legacy control
    /// file, or its `name`/`version`/`platform` do not match the
    /// archive's filename triple.
    #[error("Bad control file for package {path}: {reason}")]
    BadControl {
        /// The package directory whose control file is invalid.
        path: PathBuf,
        /// A human-readable explanation.
        reason: String,
    },

    /// A package directory did not exist where expected.
    #[error("Package does not exist at {path}")]
    NotFound {
        /// The path that does not exist.
        path: PathBuf,
    },

    /// A package's name did not parse as a valid name triple.
    #[error(transparent)]
    InvalidName(#[from] ssm_types::Error),

    /// A filesystem operation failed.
    #[error(transparent)]
    Fs(#[from] ssm_common::Error),

    /// Loading or storing the control file failed.
    #[error(transparent)]
    Control(#[from] ssm_control::Error),

    /// A pre/post-install script exists but is not executable.
    #[error("Script {path} is not executable")]
    ScriptNotExecutable {
        /// The script that is not executable.
        path: PathBuf,
    },

    /// Launching a pre/post-install script failed.
    #[error("Failed to launch script {path}:\n{source}")]
    ScriptLaunch {
        /// The script that failed to launch.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A pre/post-install script exited with a nonzero status.
    #[error("Script {path} exited with status {status}")]
    ScriptFailed {
        /// The script that failed.
        path: PathBuf,
        /// The process exit status (or -1 if killed by a signal).
        status: i32,
    },
}
