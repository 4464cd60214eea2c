//! Error types for entity-linker.
//!
//! Only startup failures surface as [`LinkerError`] from a run; everything a
//! remote backend does wrong at linking time is a [`BackendError`] that the
//! pipeline absorbs by dropping the affected mention or candidate.

use std::path::PathBuf;

/// Alias for Results returning [`LinkerError`].
pub type Result<T> = std::result::Result<T, LinkerError>;

/// Top-level error type. Every variant is fatal to a run.
#[derive(Debug, thiserror::Error)]
pub enum LinkerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to open archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Knowledge base unavailable at {}: {source}", .path.display())]
    KnowledgeBase {
        path: PathBuf,
        #[source]
        source: BackendError,
    },

    #[error("Label search backend unreachable: {0}")]
    SearchUnreachable(#[source] BackendError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Archive reader failed: {0}")]
    Reader(String),
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Failures of a single call to a remote or local backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{backend} call timed out after {millis}ms")]
    Timeout { backend: &'static str, millis: u64 },

    #[error("{backend} unavailable: {message}")]
    Unavailable {
        backend: &'static str,
        message: String,
    },

    #[error("{backend} rejected request: HTTP {status}: {message}")]
    Rejected {
        backend: &'static str,
        status: u16,
        message: String,
    },

    #[error("{backend} returned a malformed response: {message}")]
    Decode {
        backend: &'static str,
        message: String,
    },

    #[error("Triple store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl BackendError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Timeouts, connection failures, throttling and server errors are
    /// transient; client errors and undecodable payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Timeout { .. } | BackendError::Unavailable { .. } => true,
            BackendError::Rejected { status, .. } => *status == 429 || *status >= 500,
            BackendError::Decode { .. } => false,
            BackendError::Store(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed
            ),
        }
    }

    /// Classify a reqwest failure for the named backend.
    pub(crate) fn from_http(
        backend: &'static str,
        timeout: std::time::Duration,
        err: reqwest::Error,
    ) -> Self {
        if err.is_timeout() {
            return BackendError::Timeout {
                backend,
                millis: timeout.as_millis() as u64,
            };
        }
        if let Some(status) = err.status() {
            return BackendError::Rejected {
                backend,
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        if err.is_decode() {
            return BackendError::Decode {
                backend,
                message: err.to_string(),
            };
        }
        BackendError::Unavailable {
            backend,
            message: err.to_string(),
        }
    }
}
