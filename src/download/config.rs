//! Tunables for building a [`Downloader`](super::Downloader).

use serde::Deserialize;
use thiserror::Error;

use super::constants::{
    DEFAULT_COPY_BUFFER_SIZE, DEFAULT_MAX_IDLE_BUFFERS, MAX_CONCURRENCY, MAX_COPY_BUFFER_SIZE,
    MIN_COPY_BUFFER_SIZE,
};

/// Errors raised while turning a [`DownloaderConfig`] into a downloader.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field is outside its accepted range.
    #[error("invalid config value for `{field}`: {value}. Expected range: {expected}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: usize,
        /// Human-readable accepted range.
        expected: &'static str,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Engine and transport settings.
///
/// Every field has a default, so a partial JSON document deserializes into
/// a complete config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Idle keep-alive connections retained per host.
    pub max_idle_per_host: usize,
    /// Size in bytes of the scratch buffers used to copy bodies.
    pub copy_buffer_size: usize,
    /// Released buffers each pool keeps for reuse.
    pub max_idle_buffers: usize,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: MAX_CONCURRENCY,
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            max_idle_buffers: DEFAULT_MAX_IDLE_BUFFERS,
        }
    }
}

impl DownloaderConfig {
    /// Checks every field against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first out-of-range field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_idle_per_host > MAX_CONCURRENCY {
            return Err(ConfigError::InvalidValue {
                field: "max_idle_per_host",
                value: self.max_idle_per_host,
                expected: "0..=1024",
            });
        }
        if !(MIN_COPY_BUFFER_SIZE..=MAX_COPY_BUFFER_SIZE).contains(&self.copy_buffer_size) {
            return Err(ConfigError::InvalidValue {
                field: "copy_buffer_size",
                value: self.copy_buffer_size,
                expected: "512..=1048576",
            });
        }
        if !(1..=MAX_CONCURRENCY).contains(&self.max_idle_buffers) {
            return Err(ConfigError::InvalidValue {
                field: "max_idle_buffers",
                value: self.max_idle_buffers,
                expected: "1..=1024",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DownloaderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_idle_per_host, 1024);
        assert_eq!(config.copy_buffer_size, 4096);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: DownloaderConfig =
            serde_json::from_str(r#"{"copy_buffer_size": 8192}"#).unwrap();
        assert_eq!(config.copy_buffer_size, 8192);
        assert_eq!(config.max_idle_per_host, MAX_CONCURRENCY);
        assert_eq!(config.max_idle_buffers, DEFAULT_MAX_IDLE_BUFFERS);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let config: DownloaderConfig = serde_json::from_str(r#"{"workers": 8}"#).unwrap();
        assert_eq!(config, DownloaderConfig::default());
    }

    #[test]
    fn test_validate_rejects_idle_per_host_over_max() {
        let config = DownloaderConfig {
            max_idle_per_host: 1025,
            ..DownloaderConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "max_idle_per_host",
                value: 1025,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_tiny_copy_buffer() {
        let config = DownloaderConfig {
            copy_buffer_size: 16,
            ..DownloaderConfig::default()
        };
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("copy_buffer_size"), "got: {msg}");
    }

    #[test]
    fn test_validate_rejects_zero_idle_buffers() {
        let config = DownloaderConfig {
            max_idle_buffers: 0,
            ..DownloaderConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
