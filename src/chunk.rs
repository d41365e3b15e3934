//! The unit of work handed from a producer to the download engine.
//!
//! A [`Chunk`] is either a ready-to-execute [`reqwest::Request`] or the
//! error that prevented one from being built. Errors travel through the
//! chunk stream as values, so one malformed chunk never ends the stream.

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Body, Method, Request};
use thiserror::Error;
use url::Url;

/// Errors raised while building the request of a chunk.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// The chunk URL could not be parsed.
    #[error("invalid chunk URL {url}: {source}")]
    InvalidUrl {
        /// The URL as given by the producer.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// A header value contained bytes not allowed in HTTP headers.
    #[error("invalid value for header {name}")]
    InvalidHeader {
        /// Name of the rejected header.
        name: String,
    },

    /// Any other producer-side failure tied to one chunk.
    #[error("{0}")]
    Other(String),
}

impl ChunkError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }
}

/// One chunk of a larger download.
///
/// The chunk is immutable once produced; the engine consumes it exactly once.
#[derive(Debug)]
pub struct Chunk {
    request: Result<Request, ChunkError>,
}

impl Chunk {
    /// Builds a chunk for `method` and `url`.
    ///
    /// An unparsable URL does not fail here: it is carried inside the chunk
    /// and reported by the engine at this chunk's sequence position.
    #[must_use]
    pub fn new(method: Method, url: &str) -> Self {
        match Url::parse(url) {
            Ok(parsed) => Self::from_request(Request::new(method, parsed)),
            Err(e) => Self::failed(ChunkError::invalid_url(url, e)),
        }
    }

    /// Builds a GET chunk.
    #[must_use]
    pub fn get(url: &str) -> Self {
        Self::new(Method::GET, url)
    }

    /// Wraps an already-built request.
    #[must_use]
    pub fn from_request(request: Request) -> Self {
        Self {
            request: Ok(request),
        }
    }

    /// Builds a chunk that only carries a construction error.
    #[must_use]
    pub fn failed(error: ChunkError) -> Self {
        Self {
            request: Err(error),
        }
    }

    /// Applies `setup` to the request. Failed chunks pass through untouched.
    #[must_use]
    pub fn setup(mut self, setup: impl FnOnce(&mut Request)) -> Self {
        if let Ok(request) = self.request.as_mut() {
            setup(request);
        }
        self
    }

    /// Sets a header, turning the chunk into a failed one if `value` is not a
    /// valid header value.
    #[must_use]
    pub fn with_header(self, name: HeaderName, value: &str) -> Self {
        let mut request = match self.request {
            Ok(request) => request,
            Err(e) => return Self::failed(e),
        };
        match HeaderValue::from_str(value) {
            Ok(value) => {
                request.headers_mut().insert(name, value);
                Self::from_request(request)
            }
            Err(_) => Self::failed(ChunkError::InvalidHeader {
                name: name.to_string(),
            }),
        }
    }

    /// Attaches a request body.
    #[must_use]
    pub fn with_body(self, body: impl Into<Body>) -> Self {
        self.setup(|request| {
            *request.body_mut() = Some(body.into());
        })
    }

    /// Returns the request, if the chunk is valid.
    #[must_use]
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref().ok()
    }

    /// Returns the construction error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ChunkError> {
        self.request.as_ref().err()
    }

    /// Returns true when the chunk carries a construction error.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.request.is_err()
    }

    /// Consumes the chunk, yielding the request or its construction error.
    ///
    /// # Errors
    ///
    /// Returns the [`ChunkError`] the chunk was produced with.
    pub fn into_request(self) -> Result<Request, ChunkError> {
        self.request
    }
}

impl From<Request> for Chunk {
    fn from(request: Request) -> Self {
        Self::from_request(request)
    }
}

impl From<ChunkError> for Chunk {
    fn from(error: ChunkError) -> Self {
        Self::failed(error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::header::RANGE;

    use super::*;

    #[test]
    fn test_chunk_get_builds_request() {
        let chunk = Chunk::get("https://example.com/file.bin");
        assert!(!chunk.is_failed());
        let request = chunk.request().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().as_str(), "https://example.com/file.bin");
    }

    #[test]
    fn test_chunk_invalid_url_is_carried() {
        let chunk = Chunk::get("not a url");
        assert!(chunk.is_failed());
        assert!(chunk.request().is_none());
        let msg = chunk.error().unwrap().to_string();
        assert!(msg.contains("not a url"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_chunk_setup_applies_to_valid_chunk() {
        let chunk = Chunk::get("https://example.com/a").setup(|req| {
            req.headers_mut()
                .insert(RANGE, HeaderValue::from_static("bytes=0-9"));
        });
        let request = chunk.into_request().unwrap();
        assert_eq!(request.headers()[RANGE], "bytes=0-9");
    }

    #[test]
    fn test_chunk_setup_skips_failed_chunk() {
        let mut called = false;
        let chunk = Chunk::get("::bad::").setup(|_| called = true);
        assert!(chunk.is_failed());
        assert!(!called);
    }

    #[test]
    fn test_chunk_with_header_invalid_value_fails_chunk() {
        let chunk = Chunk::get("https://example.com/a").with_header(RANGE, "bytes\n=0-1");
        assert!(matches!(
            chunk.error(),
            Some(ChunkError::InvalidHeader { name }) if name == "range"
        ));
    }

    #[test]
    fn test_chunk_with_body_sets_body() {
        let chunk = Chunk::new(Method::POST, "https://example.com/a").with_body("payload");
        let request = chunk.into_request().unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.body().and_then(reqwest::Body::as_bytes),
            Some(&b"payload"[..])
        );
    }
}
