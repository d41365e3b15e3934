//! Chunked HTTP download engine.
//!
//! This module turns a stream of [`Chunk`](crate::Chunk)s into files on disk.
//!
//! # Features
//!
//! - One task per chunk, with a semaphore bounding concurrent transfers
//! - Reusable body and copy buffers shared by all transfers
//! - Per-chunk failures collected and returned together
//! - Pluggable [`Transport`] for the HTTP layer
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chunkload_core::download::{Downloader, join_errors};
//! use chunkload_core::{Chunk, FixedChunks, PartFilename};
//!
//! # async fn example() {
//! let producer = FixedChunks::new(vec![
//!     Chunk::get("https://example.com/a.bin"),
//!     Chunk::get("https://example.com/b.bin"),
//! ]);
//! let names = Arc::new(PartFilename::new("./parts"));
//! let errors = Downloader::new().download(2, &producer, names).await;
//! if !errors.is_empty() {
//!     eprintln!("{}", join_errors(&errors));
//! }
//! # }
//! ```

mod buffer_pool;
mod client;
mod config;
mod constants;
mod engine;
mod error;

pub use buffer_pool::{BufferPool, BufferPoolStats, PooledBuffer, TransferBuffers};
pub use client::{HttpClient, Transport};
pub use config::{ConfigError, DownloaderConfig};
pub use constants::{
    DEFAULT_COPY_BUFFER_SIZE, DEFAULT_MAX_IDLE_BUFFERS, DEFAULT_WORKERS, MAX_CONCURRENCY,
};
pub use engine::{Downloader, ProgressSink};
pub use error::{BoxError, DownloadError, ErrorKind, join_errors};
