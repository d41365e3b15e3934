//! Gallery producer: one image per page of a paginated gallery.
//!
//! Pages live at `{base_url}/{n}.html` for n = 1, 2, ... and the image of
//! each page is found by a regex whose first capture group is its URL.
//! Production stops at the first page that cannot be fetched.

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tracing::{debug, instrument};
use url::Url;

use super::{ChunkProducer, ChunkStream, ProducerError};
use crate::chunk::{Chunk, ChunkError};
use crate::download::HttpClient;

/// Image tag pattern of the default gallery layout.
pub const DEFAULT_IMAGE_PATTERN: &str =
    r#"<img src="([^"]+)" style="margin:0 auto;" id="image" />"#;

/// Scheme prepended to scheme-relative (`//host/...`) image URLs.
pub const DEFAULT_SCHEME_PREFIX: &str = "https:";

const CHANNEL_CAPACITY: usize = 24;

/// Produces the image of every gallery page, in page order.
#[derive(Debug, Clone)]
pub struct GalleryProducer {
    client: HttpClient,
    base_url: String,
    pattern: Regex,
    scheme_prefix: String,
    max_pages: Option<u64>,
}

impl GalleryProducer {
    /// Creates a producer for the gallery rooted at `base_url`, e.g.
    /// `https://gallery.example/book/c001/`. A trailing slash is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::InvalidPattern`] if the built-in pattern
    /// fails to compile.
    pub fn new(client: HttpClient, base_url: impl Into<String>) -> Result<Self, ProducerError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            pattern: Regex::new(DEFAULT_IMAGE_PATTERN)?,
            scheme_prefix: DEFAULT_SCHEME_PREFIX.to_string(),
            max_pages: None,
        })
    }

    /// Replaces the image pattern. Its first capture group must be the image URL.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::InvalidPattern`] if `pattern` is not a valid regex.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, ProducerError> {
        self.pattern = Regex::new(pattern)?;
        Ok(self)
    }

    /// Sets the scheme used for scheme-relative image URLs.
    #[must_use]
    pub fn with_scheme_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.scheme_prefix = prefix.into();
        self
    }

    /// Stops after `max_pages` pages even if more exist.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// URL of page `page`.
    #[must_use]
    pub fn page_url(&self, page: u64) -> String {
        format!("{}/{page}.html", self.base_url)
    }

    /// Extracts the image URL from a page body, if the page has one.
    ///
    /// Lines are matched one by one; the first match wins.
    #[must_use]
    pub fn image_url(&self, page_url: &str, body: &str) -> Option<String> {
        let src = body
            .lines()
            .find_map(|line| self.pattern.captures(line))?
            .get(1)?
            .as_str();

        if src.starts_with("//") {
            return Some(format!("{}{src}", self.scheme_prefix));
        }
        match Url::parse(src) {
            Ok(url) => Some(url.into()),
            Err(_) => Url::parse(page_url)
                .and_then(|base| base.join(src))
                .ok()
                .map(Into::into),
        }
    }

    /// Fetches one page, returning `None` when the gallery has ended.
    async fn fetch_page(&self, page_url: &str) -> Option<Result<String, ChunkError>> {
        let response = match self.client.inner().get(page_url).send().await {
            Ok(response) if response.status() == StatusCode::OK => response,
            Ok(response) => {
                debug!(page_url, status = response.status().as_u16(), "gallery ended");
                return None;
            }
            Err(e) => {
                debug!(page_url, error = %e, "gallery ended");
                return None;
            }
        };
        Some(
            response
                .text()
                .await
                .map_err(|e| ChunkError::Other(format!("failed to read {page_url}: {e}"))),
        )
    }
}

#[async_trait]
impl ChunkProducer for GalleryProducer {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn chunk_stream(&self) -> Result<ChunkStream, ProducerError> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let producer = self.clone();

        tokio::spawn(async move {
            let mut page: u64 = 1;
            while producer.max_pages.is_none_or(|max| page <= max) {
                let page_url = producer.page_url(page);
                page += 1;

                let chunk = match producer.fetch_page(&page_url).await {
                    None => return,
                    Some(Err(e)) => Chunk::failed(e),
                    Some(Ok(body)) => match producer.image_url(&page_url, &body) {
                        Some(image_url) => Chunk::get(&image_url),
                        None => {
                            debug!(page_url = %page_url, "no image on page");
                            continue;
                        }
                    },
                };

                if tx.send(chunk).await.is_err() {
                    debug!("chunk stream dropped, stopping gallery producer");
                    return;
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn producer() -> GalleryProducer {
        GalleryProducer::new(HttpClient::new(), "https://gallery.example/book/c001/").unwrap()
    }

    #[test]
    fn test_trailing_slash_trimmed_from_base() {
        assert_eq!(
            producer().page_url(3),
            "https://gallery.example/book/c001/3.html"
        );
    }

    #[test]
    fn test_image_url_scheme_relative_gets_prefix() {
        let body = "<html>\n<img src=\"//cdn.example/p/1.jpg\" style=\"margin:0 auto;\" id=\"image\" />\n</html>";
        assert_eq!(
            producer().image_url("https://gallery.example/book/c001/1.html", body),
            Some("https://cdn.example/p/1.jpg".to_string())
        );
    }

    #[test]
    fn test_image_url_relative_resolved_against_page() {
        let body = r#"<img src="img/1.png" style="margin:0 auto;" id="image" />"#;
        assert_eq!(
            producer().image_url("https://gallery.example/book/c001/1.html", body),
            Some("https://gallery.example/book/c001/img/1.png".to_string())
        );
    }

    #[test]
    fn test_image_url_absolute_kept() {
        let body = r#"<img src="http://other.example/a.jpg" style="margin:0 auto;" id="image" />"#;
        assert_eq!(
            producer().image_url("https://gallery.example/1.html", body),
            Some("http://other.example/a.jpg".to_string())
        );
    }

    #[test]
    fn test_image_url_missing() {
        assert_eq!(
            producer().image_url("https://gallery.example/1.html", "<p>nothing</p>"),
            None
        );
    }

    #[test]
    fn test_custom_pattern_and_prefix() {
        let producer = producer()
            .with_pattern(r#"data-full="([^"]+)""#)
            .unwrap()
            .with_scheme_prefix("http:");
        assert_eq!(
            producer.image_url("https://g.example/1.html", r#"<a data-full="//c.example/x.png">"#),
            Some("http://c.example/x.png".to_string())
        );
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(matches!(
            producer().with_pattern("(unclosed"),
            Err(ProducerError::InvalidPattern(_))
        ));
    }
}
