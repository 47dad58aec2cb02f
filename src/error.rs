//! Error types for the log follower library.

use thiserror::Error;

/// Boxed error produced by a user-supplied transform.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for log follower operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The followed file does not exist, either at the first poll or later on.
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// I/O errors when reading the followed file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A mapping step of the subscription pipeline failed.
    #[error("Transform error: {0}")]
    Transform(#[source] BoxError),

    /// File watching errors from the notify crate.
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// Configuration rejected before following started.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Background scheduling was requested outside of a tokio runtime.
    #[error("No tokio runtime available for background following")]
    NoRuntime,
}

impl Error {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
        }
    }
}

/// A convenient Result type for log follower operations.
pub type Result<T> = std::result::Result<T, Error>;
