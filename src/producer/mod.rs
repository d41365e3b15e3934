//! Chunk producers: the source side of a download.
//!
//! A producer performs whatever discovery it needs (a `HEAD` request, a
//! playlist fetch), then hands the engine a [`ChunkStream`] fed by a
//! background task. The stream is bounded, so a slow engine slows the
//! producer down instead of growing memory, and a producer stops as soon as
//! the engine drops the stream.
//!
//! Shipped producers:
//! - [`ByteRangeProducer`] - consecutive byte ranges of one resource
//! - [`GalleryProducer`] - one image per page of a paginated gallery
//! - [`PlaylistProducer`] - the segments listed in a media playlist
//! - [`FixedChunks`] - a pre-built list of chunks

mod byte_range;
mod error;
mod gallery;
mod playlist;

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::chunk::Chunk;

pub use byte_range::{ByteRangeProducer, DEFAULT_CHUNK_SIZE, byte_ranges};
pub use error::ProducerError;
pub use gallery::{DEFAULT_IMAGE_PATTERN, DEFAULT_SCHEME_PREFIX, GalleryProducer};
pub use playlist::{PlaylistProducer, segment_urls};

/// The receiving end of a producer's chunk sequence.
///
/// The sequence ends when `recv` returns `None`.
pub type ChunkStream = mpsc::Receiver<Chunk>;

/// A source of chunks for the download engine.
#[async_trait]
pub trait ChunkProducer: Send + Sync {
    /// Runs discovery and returns the chunk stream.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError`] when discovery fails; nothing has been
    /// produced in that case.
    async fn chunk_stream(&self) -> Result<ChunkStream, ProducerError>;
}

/// Producer over a fixed list of chunks.
///
/// The chunks are handed out by the first call to
/// [`chunk_stream`](ChunkProducer::chunk_stream); later calls yield an
/// empty stream.
#[derive(Debug)]
pub struct FixedChunks {
    chunks: Mutex<Option<Vec<Chunk>>>,
}

impl FixedChunks {
    /// Creates a producer yielding `chunks` in order.
    #[must_use]
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self {
            chunks: Mutex::new(Some(chunks)),
        }
    }
}

impl FromIterator<Chunk> for FixedChunks {
    fn from_iter<I: IntoIterator<Item = Chunk>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[async_trait]
impl ChunkProducer for FixedChunks {
    async fn chunk_stream(&self) -> Result<ChunkStream, ProducerError> {
        let chunks = self
            .chunks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default();

        // Sized to hold every chunk, so filling it never waits on the consumer.
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            if tx.try_send(chunk).is_err() {
                break;
            }
        }
        Ok(rx)
    }
}
