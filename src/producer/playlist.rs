//! Playlist producer: the segments listed in a media playlist.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, instrument};
use url::Url;

use super::{ChunkProducer, ChunkStream, ProducerError};
use crate::chunk::{Chunk, ChunkError};
use crate::download::HttpClient;

const CHANNEL_CAPACITY: usize = 4;

/// Produces one chunk per segment line of a playlist.
///
/// Lines starting with `#` (tags and comments) and blank lines are skipped.
#[derive(Debug, Clone)]
pub struct PlaylistProducer {
    client: HttpClient,
    playlist_url: String,
    segment_prefix: Option<String>,
}

impl PlaylistProducer {
    /// Creates a producer for the playlist at `playlist_url`. Segment lines
    /// are resolved against the playlist URL.
    #[must_use]
    pub fn new(client: HttpClient, playlist_url: impl Into<String>) -> Self {
        Self {
            client,
            playlist_url: playlist_url.into(),
            segment_prefix: None,
        }
    }

    /// Builds segment URLs as `{prefix}/{line}` instead of resolving them.
    #[must_use]
    pub fn with_segment_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.segment_prefix = Some(prefix.into());
        self
    }

    async fn fetch_playlist(&self) -> Result<String, ProducerError> {
        let response = self
            .client
            .inner()
            .get(&self.playlist_url)
            .send()
            .await
            .map_err(|e| ProducerError::request(&self.playlist_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProducerError::http_status(&self.playlist_url, status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| ProducerError::request(&self.playlist_url, e))
    }
}

#[async_trait]
impl ChunkProducer for PlaylistProducer {
    #[instrument(skip(self), fields(playlist_url = %self.playlist_url))]
    async fn chunk_stream(&self) -> Result<ChunkStream, ProducerError> {
        let base = Url::parse(&self.playlist_url).map_err(|source| ProducerError::InvalidUrl {
            url: self.playlist_url.clone(),
            source,
        })?;
        let playlist = self.fetch_playlist().await?;
        let segments = segment_urls(&playlist, &base, self.segment_prefix.as_deref());
        debug!(segments = segments.len(), "playlist parsed");

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            for segment in segments {
                let chunk = match segment {
                    Ok(url) => Chunk::get(&url),
                    Err(e) => Chunk::failed(e),
                };
                if tx.send(chunk).await.is_err() {
                    debug!("chunk stream dropped, stopping playlist producer");
                    return;
                }
            }
        });

        Ok(rx)
    }
}

/// Extracts segment URLs from playlist text.
///
/// With a `prefix`, each segment is `{prefix}/{line}`; otherwise the line is
/// resolved against `base`. A line that cannot be resolved is kept as an
/// error so that it still occupies its position in the sequence.
#[must_use]
pub fn segment_urls(
    playlist: &str,
    base: &Url,
    prefix: Option<&str>,
) -> Vec<Result<String, ChunkError>> {
    playlist
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match prefix {
            Some(prefix) => Ok(format!("{}/{line}", prefix.trim_end_matches('/'))),
            None => base
                .join(line)
                .map(String::from)
                .map_err(|e| ChunkError::invalid_url(line, e)),
        })
        .collect()
}
