//! Error types for gitperm core operations

use std::path::PathBuf;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reconciling or restoring metadata
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable repository context (not inside a work tree, git missing, ...)
    #[error("Environment error: {0}")]
    Environment(String),

    /// A store file name that does not decode to a repository path
    #[error("Malformed store key: {0:?}")]
    MalformedKey(String),

    /// A store file whose contents are not a valid metadata line
    #[error("Malformed record for {path}: {line:?}")]
    MalformedRecord { path: String, line: String },

    /// A path that is not a valid repository-relative path
    #[error("Invalid repository path: {0:?}")]
    InvalidPath(String),

    /// The stat or apply target no longer exists
    #[error("Target missing: {}", .0.display())]
    MissingTarget(PathBuf),

    /// A user or group name with no entry in the local database
    #[error("Unknown user or group: {0:?}")]
    UnknownId(String),

    /// A git invocation failed
    #[error("git {command} failed: {message}")]
    Vcs { command: String, message: String },

    /// Unparsable output from an external tool
    #[error("Unexpected output from {tool}: {output:?}")]
    ToolOutput { tool: String, output: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Map an I/O error on `path` to `MissingTarget` when the path is gone.
    pub fn from_io_at(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::MissingTarget(path.into())
        } else {
            Error::Io(err)
        }
    }
}
