/// Error types for the scanning engine.
///
/// Two families: [`ScanError`] covers failures that prevent a scan from
/// starting (these are fatal to the `start_scan` call), while [`ViewError`]
/// covers failures answering a single view query (never fatal to the
/// session). Per-entry I/O failures during a scan are neither — they are
/// counted and the scan continues.
use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent a scan from starting.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied on the scan root.
    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Scan root does not exist.
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    /// Scan root exists but is not a directory.
    #[error("not a directory: {path}")]
    InvalidRoot { path: PathBuf },

    /// Any other I/O error probing the scan root.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The worker pool could not be brought up.
    #[error("failed to spawn scan worker thread")]
    WorkerSpawn {
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Create an I/O error with path context, classifying the common kinds.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors answering a directory-view query.
///
/// These never invalidate the session — a caller that passed a bad
/// navigation path can retry with a corrected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ViewError {
    /// A navigation index did not resolve to a child at that step.
    #[error("navigation index {index} out of range at depth {depth}")]
    InvalidPath { depth: usize, index: usize },

    /// No scan has been started (or the last one was cancelled).
    #[error("no scan session")]
    NoSession,

    /// The scan is still running; the tree is not yet served.
    #[error("scan still in progress")]
    ScanActive,
}
