use std::path::PathBuf;

/// An error that can occur while building a package from a build spec.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to open or read a `.bssm` archive.
    #[error("cannot open build spec {path}:\n{source}")]
    OpenBssm {
        /// The archive path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A `.bssm` archive member escaped its extraction root.
    #[error("build spec {path} contains a path-traversing member: {member}")]
    PathTraversal {
        /// The archive path.
        path: PathBuf,
        /// The offending member path.
        member: String,
    },

    /// Reading or unpacking a tar member failed.
    #[error("failed reading member of build spec {path}:\n{source}")]
    ReadMember {
        /// The archive path.
        path: PathBuf,
        /// The underlying tar error.
        source: std::io::Error,
    },

    /// `bcontrol.json` is missing or does not parse as an object.
    #[error("build spec {path} has no usable bcontrol.json")]
    MissingBControl {
        /// The archive path.
        path: PathBuf,
    },

    /// `bcontrol.json` lacks a `name` or `version` field.
    #[error("build spec {path}'s bcontrol.json is missing `name` or `version`")]
    IncompleteBControl {
        /// The archive path.
        path: PathBuf,
    },

    /// The build script named by `bh-script`/`build-script` is absent
    /// from the unpacked build spec.
    #[error("build script {script} not found in unpacked build spec")]
    MissingScript {
        /// The expected script's relative path.
        script: String,
    },

    /// Neither the repository nor a from-source build produced a usable
    /// package file.
    #[error("failed to build {name}: {reason}")]
    BuildFailed {
        /// The package name being built.
        name: String,
        /// A human-readable explanation.
        reason: String,
    },

    /// Launching the build script failed.
    #[error("failed to launch build script {path}:\n{source}")]
    ScriptLaunch {
        /// The script path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A dependency-graph operation failed.
    #[error(transparent)]
    Deps(#[from] ssm_deps::Error),

    /// A control-file operation failed.
    #[error(transparent)]
    Control(#[from] ssm_control::Error),

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
