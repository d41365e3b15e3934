//! Download engine for chunked downloads with bounded transfer concurrency.
//!
//! This module provides the [`Downloader`], which consumes a producer's chunk
//! stream, transfers each chunk over HTTP and writes its body to the file
//! named by a [`PartNamer`].
//!
//! # Concurrency Model
//!
//! - Every valid chunk gets its own Tokio task as soon as it arrives
//! - A task acquires a semaphore permit before touching the network; at most
//!   `workers` tasks hold one at a time
//! - The dispatch loop never awaits a permit or the network: it only waits
//!   for the next chunk or the next finished task
//! - `download` returns only after every spawned task has finished
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chunkload_core::{ByteRangeProducer, Downloader, HttpClient, PartFilename};
//!
//! # async fn example() {
//! let client = HttpClient::new();
//! let producer = ByteRangeProducer::new(client.clone(), "https://example.com/big.iso", 2 << 20);
//! let names = Arc::new(PartFilename::new("out").with_prefix("part_"));
//!
//! let downloader = Downloader::with_client(client);
//! let errors = downloader.download(24, &producer, names).await;
//! assert!(errors.is_empty());
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::TryStreamExt;
use reqwest::{Request, Response};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::io::StreamReader;
use tracing::{debug, info, instrument, warn};

use super::buffer_pool::{BufferPool, TransferBuffers};
use super::client::{HttpClient, Transport};
use super::config::{ConfigError, DownloaderConfig};
use super::constants::MAX_CONCURRENCY;
use super::error::DownloadError;
use crate::naming::PartNamer;
use crate::producer::ChunkProducer;

/// Receives human-readable progress lines such as `"Downloading part 3"`.
pub type ProgressSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Chunked download engine.
///
/// A downloader holds no per-download state: each [`download`](Self::download)
/// call is self-contained, and one downloader may run several downloads at
/// once as long as they target different destination paths.
pub struct Downloader {
    transport: Arc<dyn Transport>,
    buffers: TransferBuffers,
    progress: Option<ProgressSink>,
}

impl fmt::Debug for Downloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Downloader")
            .field("buffers", &self.buffers)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader {
    /// Creates a downloader with a default [`HttpClient`] and default buffer pools.
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(HttpClient::new())
    }

    /// Creates a downloader sending requests through `client`.
    #[must_use]
    pub fn with_client(client: HttpClient) -> Self {
        Self::with_transport(Arc::new(client))
    }

    /// Creates a downloader sending requests through an arbitrary transport.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            buffers: TransferBuffers::default(),
            progress: None,
        }
    }

    /// Creates a downloader from a [`DownloaderConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &DownloaderConfig) -> Result<Self, ConfigError> {
        let client = HttpClient::from_config(config)?;
        Ok(Self::with_client(client).with_buffers(TransferBuffers::new(
            config.copy_buffer_size,
            config.max_idle_buffers,
        )))
    }

    /// Replaces the buffer pools, e.g. to share them with another downloader.
    #[must_use]
    pub fn with_buffers(mut self, buffers: TransferBuffers) -> Self {
        self.buffers = buffers;
        self
    }

    /// Sets the progress sink. Without one, no progress lines are emitted.
    #[must_use]
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Returns the buffer pools used by this downloader.
    #[must_use]
    pub fn buffers(&self) -> &TransferBuffers {
        &self.buffers
    }

    /// Downloads every chunk `producer` yields into the files named by `namer`.
    ///
    /// Chunks are numbered from 1 in arrival order. The call returns once the
    /// stream is exhausted and every transfer has finished.
    ///
    /// # Returns
    ///
    /// Every failure encountered, in arrival order. An empty list is the only
    /// success signal. Invalid worker counts, directory creation failures and
    /// producer discovery failures end the call immediately as a single-element
    /// list; per-chunk failures never stop the other chunks.
    #[instrument(skip_all, fields(workers = workers, dest = %namer.dest_dir().display()))]
    pub async fn download(
        &self,
        workers: usize,
        producer: &dyn ChunkProducer,
        namer: Arc<dyn PartNamer>,
    ) -> Vec<DownloadError> {
        if !(1..=MAX_CONCURRENCY).contains(&workers) {
            return vec![DownloadError::InvalidWorkerCount { value: workers }];
        }

        if let Err(e) = create_dest_dir(namer.dest_dir()).await {
            return vec![e];
        }

        let mut chunks = match producer.chunk_stream().await {
            Ok(chunks) => chunks,
            Err(source) => return vec![DownloadError::ProducerDiscovery { source }],
        };

        info!("starting download");

        let ctx = Arc::new(PartContext {
            transport: Arc::clone(&self.transport),
            buffers: self.buffers.clone(),
            namer,
            progress: self.progress.clone(),
            admission: Semaphore::new(workers),
        });

        let mut tasks = JoinSet::new();
        let mut in_flight: HashMap<task::Id, u64> = HashMap::new();
        let mut errors = Vec::new();
        let mut part: u64 = 0;

        loop {
            tokio::select! {
                Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                    record_outcome(joined, &mut in_flight, &mut errors);
                }
                next = chunks.recv() => {
                    let Some(chunk) = next else {
                        break;
                    };
                    part += 1;
                    match chunk.into_request() {
                        Ok(request) => {
                            let ctx = Arc::clone(&ctx);
                            let handle = tasks.spawn(async move { ctx.run(part, request).await });
                            in_flight.insert(handle.id(), part);
                        }
                        Err(source) => {
                            warn!(part, error = %source, "chunk construction failed");
                            errors.push(DownloadError::ChunkConstruction { part, source });
                        }
                    }
                }
            }
        }

        debug!(
            parts = part,
            pending = tasks.len(),
            "chunk stream closed, waiting for transfers"
        );

        while let Some(joined) = tasks.join_next_with_id().await {
            record_outcome(joined, &mut in_flight, &mut errors);
        }

        info!(parts = part, failed = errors.len(), "download finished");
        errors
    }
}

/// Everything a part task needs, shared by all tasks of one download.
struct PartContext {
    transport: Arc<dyn Transport>,
    buffers: TransferBuffers,
    namer: Arc<dyn PartNamer>,
    progress: Option<ProgressSink>,
    admission: Semaphore,
}

impl PartContext {
    /// Waits for an admission slot, then transfers the part.
    async fn run(&self, part: u64, request: Request) -> Result<PathBuf, DownloadError> {
        let _permit = self
            .admission
            .acquire()
            .await
            .map_err(|e| DownloadError::transfer(part, request.url().as_str(), e))?;
        self.download_part(part, request).await
    }

    #[instrument(level = "debug", skip(self, request), fields(url = %request.url()))]
    async fn download_part(&self, part: u64, request: Request) -> Result<PathBuf, DownloadError> {
        if let Some(progress) = &self.progress {
            progress(&format!("Downloading part {part}"));
        }

        let url = request.url().to_string();
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| DownloadError::transfer(part, &url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(part, url, status.as_u16()));
        }

        let mut body = self.buffers.body.acquire();
        read_body(response, &mut body, &self.buffers.copy)
            .await
            .map_err(|e| DownloadError::transfer(part, &url, e))?;

        if body.is_empty() {
            return Err(DownloadError::empty_body(part, self.namer.file_name(part)));
        }

        let path = self.namer.path_of(part);
        write_part(&path, &body)
            .await
            .map_err(|e| DownloadError::file_write(part, &path, e))?;

        debug!(part, bytes = body.len(), path = %path.display(), "part saved");
        Ok(path)
    }
}

/// Creates the destination directory; an existing directory is fine.
async fn create_dest_dir(dir: &Path) -> Result<(), DownloadError> {
    match tokio::fs::create_dir(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(DownloadError::directory_creation(dir, e)),
    }
}

/// Copies the response body into `body` through a pooled scratch buffer.
async fn read_body(
    response: Response,
    body: &mut Vec<u8>,
    copy: &Arc<BufferPool>,
) -> std::io::Result<()> {
    let reader = StreamReader::new(response.bytes_stream().map_err(std::io::Error::other));
    tokio::pin!(reader);

    let mut scratch = copy.acquire();
    loop {
        let n = reader.read(&mut scratch[..]).await?;
        if n == 0 {
            return Ok(());
        }
        body.extend_from_slice(&scratch[..n]);
    }
}

/// Writes `body` to a fresh file at `path`, truncating any existing one.
async fn write_part(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(body).await?;
    file.flush().await
}

fn record_outcome(
    joined: Result<(task::Id, Result<PathBuf, DownloadError>), JoinError>,
    in_flight: &mut HashMap<task::Id, u64>,
    errors: &mut Vec<DownloadError>,
) {
    match joined {
        Ok((id, Ok(_path))) => {
            in_flight.remove(&id);
        }
        Ok((id, Err(e))) => {
            in_flight.remove(&id);
            warn!(part = e.part(), error = %e, "part failed");
            errors.push(e);
        }
        Err(source) => {
            let part = in_flight.remove(&source.id()).unwrap_or_default();
            warn!(part, error = %source, "download task panicked");
            errors.push(DownloadError::TaskFailed { part, source });
        }
    }
}
