//! Error types for the page cache pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for cache, index and rendering operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The remote endpoint was unreachable or answered with a non-2xx status.
    #[error("failed to fetch {url}: {message}")]
    Network { url: String, message: String },

    /// The index payload did not decode into a list of entries.
    #[error("malformed index payload: {0}")]
    Format(String),

    /// The index artifact does not exist yet.
    #[error("page cache is not initialized; run `tldrpp init` first")]
    NotInitialized,

    #[error("command not found: {name}")]
    NotFound { name: String },

    #[error("no suitable example found for command: {command}")]
    NoSuitableExample { command: String },

    /// An index entry whose name or platform cannot be used as a single path segment.
    #[error("invalid page path segment: {0:?}")]
    InvalidPath(String),

    #[error("refresh cancelled before the index was written")]
    Cancelled,

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn network(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }
}
