//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default chunk size of the `range` subcommand (2 MiB).
pub const DEFAULT_RANGE_CHUNK_SIZE: u64 = 2 * 1024 * 1024;

/// Download a resource in numbered chunks, concurrently.
///
/// Each chunk is fetched by its own HTTP request and written to its own file
/// (`{prefix}{NNNNNNNN}{suffix}` inside the output directory). Use `merge` to
/// reassemble the parts afterwards.
#[derive(Parser, Debug)]
#[command(name = "chunkload")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Maximum concurrent transfers (1-1024) [default: 24]
    #[arg(short = 'w', long, global = true, value_parser = clap::value_parser!(u16).range(1..=1024))]
    pub workers: Option<u16>,

    /// Directory the parts are written to [default: out]
    #[arg(short = 'o', long, global = true)]
    pub output: Option<PathBuf>,

    /// File name prefix of each part (overrides the subcommand default)
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// File name suffix of each part (overrides the subcommand default)
    #[arg(long, global = true)]
    pub suffix: Option<String>,

    /// Idle keep-alive connections kept per host (0-1024) [default: 1024]
    #[arg(long, global = true, value_parser = clap::value_parser!(u16).range(0..=1024))]
    pub max_idle_per_host: Option<u16>,

    /// JSON file with default settings; explicit flags take precedence
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// What to download, or which parts to merge.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Download one resource as consecutive byte ranges
    Range {
        /// URL of a resource whose server supports byte ranges
        url: String,

        /// Bytes per chunk
        #[arg(long, default_value_t = DEFAULT_RANGE_CHUNK_SIZE)]
        chunk_size: u64,
    },

    /// Download the image of every page of a paginated gallery
    Gallery {
        /// Gallery root; pages are fetched as {BASE_URL}/1.html, 2.html, ...
        base_url: String,

        /// Regex whose first capture group is the image URL
        #[arg(long)]
        pattern: Option<String>,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u64>,
    },

    /// Download every segment listed in a media playlist
    Playlist {
        /// URL of the playlist
        url: String,

        /// Build segment URLs as {PREFIX}/{line} instead of resolving lines
        #[arg(long)]
        segment_prefix: Option<String>,
    },

    /// Concatenate downloaded parts, in file-name order, into one file
    Merge {
        /// Directory holding the parts
        dir: PathBuf,

        /// Destination file (created or truncated)
        dest: PathBuf,

        /// Delete the parts and their directory after merging
        #[arg(long)]
        remove_parts: bool,
    },
}

impl Command {
    /// Default part file name prefix and suffix for this kind of download.
    #[must_use]
    pub fn default_affixes(&self) -> (&'static str, &'static str) {
        match self {
            Self::Range { .. } | Self::Merge { .. } => ("part_", ""),
            Self::Gallery { .. } => ("page", ".jpeg"),
            Self::Playlist { .. } => ("part_", ".ts"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/file.bin";

    #[test]
    fn test_cli_range_defaults() {
        let args = Args::try_parse_from(["chunkload", "range", URL]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.workers, None);
        assert_eq!(args.output, None);
        assert_eq!(
            args.command,
            Command::Range {
                url: URL.to_string(),
                chunk_size: DEFAULT_RANGE_CHUNK_SIZE,
            }
        );
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["chunkload", "-v", "range", URL]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["chunkload", "-vv", "range", URL]).unwrap();
        assert_eq!(args.verbose, 2);

        let args = Args::try_parse_from(["chunkload", "range", URL, "--verbose"]).unwrap();
        assert_eq!(args.verbose, 1);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["chunkload", "-q", "range", URL]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["chunkload", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["chunkload", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["chunkload", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_missing_subcommand_returns_error() {
        assert!(Args::try_parse_from(["chunkload"]).is_err());
    }

    #[test]
    fn test_cli_workers_short_and_long_flag() {
        let args = Args::try_parse_from(["chunkload", "-w", "5", "range", URL]).unwrap();
        assert_eq!(args.workers, Some(5));

        let args = Args::try_parse_from(["chunkload", "range", URL, "--workers", "1024"]).unwrap();
        assert_eq!(args.workers, Some(1024));
    }

    #[test]
    fn test_cli_workers_zero_rejected() {
        let err = Args::try_parse_from(["chunkload", "-w", "0", "range", URL]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_workers_over_max_rejected() {
        let err = Args::try_parse_from(["chunkload", "-w", "1025", "range", URL]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_max_idle_per_host_zero_allowed() {
        let args =
            Args::try_parse_from(["chunkload", "--max-idle-per-host", "0", "range", URL]).unwrap();
        assert_eq!(args.max_idle_per_host, Some(0));
    }

    #[test]
    fn test_cli_range_chunk_size() {
        let args =
            Args::try_parse_from(["chunkload", "range", URL, "--chunk-size", "4096"]).unwrap();
        assert!(matches!(args.command, Command::Range { chunk_size: 4096, .. }));
    }

    #[test]
    fn test_cli_gallery_options() {
        let args = Args::try_parse_from([
            "chunkload",
            "gallery",
            "https://g.example/book/",
            "--pattern",
            "src=\"([^\"]+)\"",
            "--max-pages",
            "3",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Command::Gallery {
                base_url: "https://g.example/book/".to_string(),
                pattern: Some("src=\"([^\"]+)\"".to_string()),
                max_pages: Some(3),
            }
        );
    }

    #[test]
    fn test_cli_playlist_segment_prefix() {
        let args = Args::try_parse_from([
            "chunkload",
            "playlist",
            "https://m.example/index.m3u8",
            "--segment-prefix",
            "https://cdn.example/v",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Playlist { segment_prefix: Some(ref p), .. } if p == "https://cdn.example/v"
        ));
    }

    #[test]
    fn test_cli_merge_positional_args() {
        let args =
            Args::try_parse_from(["chunkload", "merge", "out", "file.bin", "--remove-parts"])
                .unwrap();
        assert_eq!(
            args.command,
            Command::Merge {
                dir: PathBuf::from("out"),
                dest: PathBuf::from("file.bin"),
                remove_parts: true,
            }
        );
    }

    #[test]
    fn test_default_affixes_per_subcommand() {
        let gallery = Command::Gallery {
            base_url: String::new(),
            pattern: None,
            max_pages: None,
        };
        assert_eq!(gallery.default_affixes(), ("page", ".jpeg"));

        let playlist = Command::Playlist {
            url: String::new(),
            segment_prefix: None,
        };
        assert_eq!(playlist.default_affixes(), ("part_", ".ts"));

        let range = Command::Range {
            url: String::new(),
            chunk_size: 1,
        };
        assert_eq!(range.default_affixes(), ("part_", ""));
    }
}
