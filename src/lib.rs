//! Chunked Download Core Library
//!
//! This library downloads a large resource that can be split into
//! independently fetchable pieces ("chunks"), each described by an HTTP
//! request and persisted as its own file.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`chunk`] - The unit of work: a ready request or a carried construction error
//! - [`producer`] - The chunk-stream contract plus byte-range, gallery and playlist producers
//! - [`naming`] - Mapping of chunk sequence numbers to destination paths
//! - [`download`] - The bounded, buffer-pooled download engine
//! - [`merge`] - Reassembly of downloaded parts into a single file

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod chunk;
pub mod download;
pub mod merge;
pub mod naming;
pub mod producer;
mod user_agent;

// Re-export commonly used types
pub use chunk::{Chunk, ChunkError};
pub use download::{
    BufferPool, ConfigError, DEFAULT_WORKERS, DownloadError, Downloader, DownloaderConfig,
    ErrorKind, HttpClient, MAX_CONCURRENCY, ProgressSink, TransferBuffers, Transport, join_errors,
};
pub use merge::{MergeError, MergeSummary, merge_parts};
pub use naming::{PartFilename, PartNamer};
pub use producer::{
    ByteRangeProducer, ChunkProducer, ChunkStream, FixedChunks, GalleryProducer,
    PlaylistProducer, ProducerError,
};
