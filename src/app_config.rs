//! Application configuration loading for CLI defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chunkload_core::{DEFAULT_WORKERS, DownloaderConfig, MAX_CONCURRENCY};
use serde::Deserialize;

use crate::cli::Args;

/// Output directory used when neither a flag nor the config file names one.
pub const DEFAULT_OUTPUT_DIR: &str = "out";

/// JSON-backed file configuration for `chunkload` defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Default worker limit (same range as CLI).
    pub workers: Option<usize>,
    /// Default directory the parts are written to.
    pub output_dir: Option<PathBuf>,
    /// Default part file name prefix.
    pub prefix: Option<String>,
    /// Default part file name suffix.
    pub suffix: Option<String>,
    /// Idle keep-alive connections kept per host.
    pub max_idle_per_host: Option<usize>,
    /// Size in bytes of each body copy buffer.
    pub copy_buffer_size: Option<usize>,
    /// Released buffers each pool keeps for reuse.
    pub max_idle_buffers: Option<usize>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(workers) = self.workers
            && !(1..=MAX_CONCURRENCY).contains(&workers)
        {
            bail!("Invalid config value for `workers`: {workers}. Expected range: 1..=1024");
        }
        self.downloader_config(None).validate()?;
        Ok(())
    }

    /// Engine settings from this file, with `max_idle_per_host` optionally
    /// overridden by the command line.
    fn downloader_config(&self, max_idle_override: Option<usize>) -> DownloaderConfig {
        let defaults = DownloaderConfig::default();
        DownloaderConfig {
            max_idle_per_host: max_idle_override
                .or(self.max_idle_per_host)
                .unwrap_or(defaults.max_idle_per_host),
            copy_buffer_size: self.copy_buffer_size.unwrap_or(defaults.copy_buffer_size),
            max_idle_buffers: self.max_idle_buffers.unwrap_or(defaults.max_idle_buffers),
        }
    }
}

/// Loads and validates the config file at `path`.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = serde_json::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Worker limit passed to the engine.
    pub workers: usize,
    /// Directory the parts are written to.
    pub output_dir: PathBuf,
    /// Part file name prefix.
    pub prefix: String,
    /// Part file name suffix.
    pub suffix: String,
    /// Engine and transport settings.
    pub downloader: DownloaderConfig,
}

impl Settings {
    /// Resolves settings with priority: explicit CLI flag > config file >
    /// subcommand default > built-in default.
    #[must_use]
    pub fn resolve(args: &Args, file: &FileConfig) -> Self {
        let (default_prefix, default_suffix) = args.command.default_affixes();
        Self {
            workers: args
                .workers
                .map(usize::from)
                .or(file.workers)
                .unwrap_or(DEFAULT_WORKERS),
            output_dir: args
                .output
                .clone()
                .or_else(|| file.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            prefix: args
                .prefix
                .clone()
                .or_else(|| file.prefix.clone())
                .unwrap_or_else(|| default_prefix.to_string()),
            suffix: args
                .suffix
                .clone()
                .or_else(|| file.suffix.clone())
                .unwrap_or_else(|| default_suffix.to_string()),
            downloader: file.downloader_config(args.max_idle_per_host.map(usize::from)),
        }
    }
}
