use std::path::PathBuf;

/// An error that can occur when loading or storing a [`crate::Control`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the control file failed.
    #[error("Failed to read control file {path}:\n{source}")]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The control file's JSON could not be parsed.
    #[error("Failed to parse control file {path} as JSON:\n{source}")]
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Writing the control file failed.
    #[error("Failed to write control file {path}:\n{source}")]
    Write {
        /// The file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
