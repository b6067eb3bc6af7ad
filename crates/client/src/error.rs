use std::io;

use reqwest::StatusCode;
use thiserror::Error;

pub use hubcache_paths::EtagError;

pub type Result<T> = std::result::Result<T, HubError>;

/// Errors surfaced by the cache and download engine.
#[derive(Debug, Error)]
pub enum HubError {
    /// The probe says the remote has no such file for the requested revision.
    #[error("file not found on the remote for the requested revision")]
    NotFound,

    /// A non-success status from the metadata or content endpoint.
    #[error("HTTP status {0}")]
    Http(StatusCode),

    /// The server advertised a total size and the bytes written differ.
    #[error("size mismatch: expected {expected} bytes, wrote {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// The server's etag could not be normalized into a blob file name.
    #[error(transparent)]
    InvalidEtag(#[from] EtagError),

    /// A filesystem or lock-acquisition failure that cannot be recovered
    /// locally.
    #[error("{context}: {source}")]
    Fs {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The caller requested cancellation.
    #[error("operation cancelled")]
    Cancelled,

    /// Transport-level failure from the HTTP client.
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

impl HubError {
    /// Whether the download retry loop may attempt this error again.
    /// Authentication failures, missing files, bad etags, size mismatches and
    /// cancellation are terminal; transport failures are not. Filesystem
    /// errors are retried only when the underlying kind is plausibly
    /// transient — a permission error or a full disk will not get better by
    /// sleeping on it.
    pub fn is_retryable(&self) -> bool {
        match self {
            HubError::Http(status) => !matches!(status.as_u16(), 401 | 403 | 404),
            HubError::Request(e) => !e.is_builder(),
            HubError::Fs { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            HubError::NotFound
            | HubError::SizeMismatch { .. }
            | HubError::InvalidEtag(_)
            | HubError::Cancelled => false,
        }
    }
}

/// Attach a human-readable operation description to an I/O failure.
pub(crate) fn fs_context(context: impl Into<String>) -> impl FnOnce(io::Error) -> HubError {
    move |source| HubError::Fs {
        context: context.into(),
        source,
    }
}
