//! Error types for the download module.
//!
//! [`DownloadError`] covers every failure a `Downloader::download` call can
//! report. The first three kinds abort the whole invocation; the rest are
//! per-chunk and collected alongside successful transfers.

use std::fmt::Write as _;
use std::path::PathBuf;

use thiserror::Error;

use super::constants::MAX_CONCURRENCY;
use crate::chunk::ChunkError;
use crate::producer::ProducerError;

/// Boxed source error for transfer failures (transport or body read).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by the download engine.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The worker count is outside `1..=MAX_CONCURRENCY`.
    #[error("invalid number of workers {value}: must be between 1 and {MAX_CONCURRENCY}")]
    InvalidWorkerCount {
        /// The rejected worker count.
        value: usize,
    },

    /// The destination directory could not be created.
    #[error("failed to create destination directory {path}: {source}")]
    DirectoryCreation {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The producer failed before yielding a stream.
    #[error("invalid chunk producer: {source}")]
    ProducerDiscovery {
        /// The producer's discovery error.
        #[source]
        source: ProducerError,
    },

    /// The producer could not build the request for a chunk.
    #[error("part {part}: chunk construction failed: {source}")]
    ChunkConstruction {
        /// Sequence number of the chunk.
        part: u64,
        /// The construction error carried by the chunk.
        #[source]
        source: ChunkError,
    },

    /// The request or the body transfer failed at the transport level.
    #[error("part {part}: transfer of {url} failed: {source}")]
    Transfer {
        /// Sequence number of the chunk.
        part: u64,
        /// Request URL.
        url: String,
        /// The underlying transport or read error.
        #[source]
        source: BoxError,
    },

    /// The server answered with a non-success status.
    #[error("part {part}: HTTP {status} fetching {url}")]
    HttpStatus {
        /// Sequence number of the chunk.
        part: u64,
        /// Request URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The server answered successfully but sent no data.
    #[error("part {part}: {file_name}: body is empty")]
    EmptyBody {
        /// Sequence number of the chunk.
        part: u64,
        /// File name the part would have been written to.
        file_name: String,
    },

    /// Writing the part to disk failed.
    #[error("part {part}: failed to save {path}: {source}")]
    FileWrite {
        /// Sequence number of the chunk.
        part: u64,
        /// Destination path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The task transferring a part panicked or was aborted.
    #[error("part {part}: download task failed: {source}")]
    TaskFailed {
        /// Sequence number of the chunk.
        part: u64,
        /// The join error of the task.
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Coarse classification of a [`DownloadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`DownloadError::InvalidWorkerCount`].
    InvalidWorkerCount,
    /// See [`DownloadError::DirectoryCreation`].
    DirectoryCreationFailed,
    /// See [`DownloadError::ProducerDiscovery`].
    ProducerDiscoveryFailed,
    /// See [`DownloadError::ChunkConstruction`].
    ChunkConstructionFailed,
    /// See [`DownloadError::Transfer`].
    TransferFailed,
    /// See [`DownloadError::HttpStatus`].
    InvalidResponseStatus,
    /// See [`DownloadError::EmptyBody`].
    EmptyBody,
    /// See [`DownloadError::FileWrite`].
    FileWriteFailed,
    /// See [`DownloadError::TaskFailed`].
    TaskFailed,
}

impl ErrorKind {
    /// Returns true for kinds that abort a download before any chunk is processed.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::InvalidWorkerCount | Self::DirectoryCreationFailed | Self::ProducerDiscoveryFailed
        )
    }
}

impl DownloadError {
    /// Creates a directory creation error.
    pub fn directory_creation(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreation {
            path: path.into(),
            source,
        }
    }

    /// Creates a transfer error.
    pub fn transfer(part: u64, url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transfer {
            part,
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(part: u64, url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            part,
            url: url.into(),
            status,
        }
    }

    /// Creates an empty body error.
    pub fn empty_body(part: u64, file_name: impl Into<String>) -> Self {
        Self::EmptyBody {
            part,
            file_name: file_name.into(),
        }
    }

    /// Creates a file write error.
    pub fn file_write(part: u64, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            part,
            path: path.into(),
            source,
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidWorkerCount { .. } => ErrorKind::InvalidWorkerCount,
            Self::DirectoryCreation { .. } => ErrorKind::DirectoryCreationFailed,
            Self::ProducerDiscovery { .. } => ErrorKind::ProducerDiscoveryFailed,
            Self::ChunkConstruction { .. } => ErrorKind::ChunkConstructionFailed,
            Self::Transfer { .. } => ErrorKind::TransferFailed,
            Self::HttpStatus { .. } => ErrorKind::InvalidResponseStatus,
            Self::EmptyBody { .. } => ErrorKind::EmptyBody,
            Self::FileWrite { .. } => ErrorKind::FileWriteFailed,
            Self::TaskFailed { .. } => ErrorKind::TaskFailed,
        }
    }

    /// Sequence number of the failed chunk, for per-chunk errors.
    #[must_use]
    pub fn part(&self) -> Option<u64> {
        match self {
            Self::ChunkConstruction { part, .. }
            | Self::Transfer { part, .. }
            | Self::HttpStatus { part, .. }
            | Self::EmptyBody { part, .. }
            | Self::FileWrite { part, .. }
            | Self::TaskFailed { part, .. } => Some(*part),
            Self::InvalidWorkerCount { .. }
            | Self::DirectoryCreation { .. }
            | Self::ProducerDiscovery { .. } => None,
        }
    }
}

/// Renders a list of download errors, one per line.
///
/// Returns an empty string for an empty list.
#[must_use]
pub fn join_errors(errors: &[DownloadError]) -> String {
    let mut out = String::new();
    for (i, error) in errors.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{error}");
    }
    out
}
