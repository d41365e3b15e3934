//! Byte-range producer: splits one resource into consecutive ranges.

use async_trait::async_trait;
use reqwest::header::{ACCEPT_RANGES, CONNECTION, CONTENT_LENGTH, HeaderMap, RANGE};
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use super::{ChunkProducer, ChunkStream, ProducerError};
use crate::chunk::Chunk;
use crate::download::HttpClient;

/// Chunk size used when the configured size is zero (1 KiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 1024;

const CHANNEL_CAPACITY: usize = 4;

/// Produces one `Range` request per `chunk_size` bytes of a resource.
///
/// Discovery issues a `HEAD` request and requires `Accept-Ranges: bytes`
/// and a numeric `Content-Length`.
#[derive(Debug, Clone)]
pub struct ByteRangeProducer {
    client: HttpClient,
    url: String,
    chunk_size: u64,
}

impl ByteRangeProducer {
    /// Creates a producer for `url`. A `chunk_size` of 0 selects
    /// [`DEFAULT_CHUNK_SIZE`].
    #[must_use]
    pub fn new(client: HttpClient, url: impl Into<String>, chunk_size: u64) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            client,
            url: url.into(),
            chunk_size,
        }
    }

    /// Returns the effective chunk size.
    #[must_use]
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Reads the resource length from a `HEAD` response.
    async fn discover_length(&self) -> Result<u64, ProducerError> {
        let response = self
            .client
            .inner()
            .head(&self.url)
            .send()
            .await
            .map_err(|e| ProducerError::request(&self.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProducerError::http_status(&self.url, status.as_u16()));
        }

        let headers = response.headers();
        if !accepts_byte_ranges(headers) {
            return Err(ProducerError::RangesUnsupported {
                url: self.url.clone(),
            });
        }

        let raw = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        raw.trim()
            .parse::<u64>()
            .map_err(|_| ProducerError::InvalidContentLength {
                url: self.url.clone(),
                value: raw.to_string(),
            })
    }
}

#[async_trait]
impl ChunkProducer for ByteRangeProducer {
    #[instrument(skip(self), fields(url = %self.url, chunk_size = self.chunk_size))]
    async fn chunk_stream(&self) -> Result<ChunkStream, ProducerError> {
        let length = self.discover_length().await?;
        debug!(length, "resource supports byte ranges");

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let url = self.url.clone();
        let chunk_size = self.chunk_size;

        tokio::spawn(async move {
            for (start, end) in byte_ranges(length, chunk_size) {
                let chunk = Chunk::get(&url)
                    .with_header(CONNECTION, "keep-alive")
                    .with_header(RANGE, &format!("bytes={start}-{end}"));
                if tx.send(chunk).await.is_err() {
                    debug!("chunk stream dropped, stopping range producer");
                    return;
                }
            }
        });

        Ok(rx)
    }
}

fn accepts_byte_ranges(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT_RANGES)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|unit| unit.trim().eq_ignore_ascii_case("bytes"))
}

/// Splits `[0, length)` into inclusive `(start, end)` ranges of `chunk_size`
/// bytes; the last range may be shorter. A zero length yields no ranges.
///
/// # Example
///
/// ```
/// use chunkload_core::producer::byte_ranges;
///
/// let ranges: Vec<_> = byte_ranges(10, 4).collect();
/// assert_eq!(ranges, vec![(0, 3), (4, 7), (8, 9)]);
/// ```
pub fn byte_ranges(length: u64, chunk_size: u64) -> impl Iterator<Item = (u64, u64)> {
    let step = chunk_size.max(1);
    (0..length)
        .step_by(usize::try_from(step).unwrap_or(usize::MAX))
        .map(move |start| (start, start.saturating_add(step).min(length) - 1))
}
