//! Error types for chunk producers.

use thiserror::Error;

/// Discovery-phase failures of a chunk producer.
///
/// These are returned before any chunk is produced; failures tied to a
/// single chunk travel inside the stream as [`ChunkError`](crate::ChunkError)s.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// A discovery request could not be sent or its body could not be read.
    #[error("request to {url} failed: {source}")]
    Request {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// A discovery request returned a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The server does not advertise byte-range support.
    #[error("{url} does not support byte ranges")]
    RangesUnsupported {
        /// The resource URL.
        url: String,
    },

    /// The `Content-Length` header is missing or not a number.
    #[error("invalid content length {value:?} for {url}")]
    InvalidContentLength {
        /// The resource URL.
        url: String,
        /// The raw header value (empty when absent).
        value: String,
    },

    /// A producer URL could not be parsed.
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        /// The URL as given.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// A user-supplied extraction pattern is not a valid regex.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl ProducerError {
    /// Creates a request error.
    pub fn request(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }
}
