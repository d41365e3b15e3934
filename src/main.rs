//! CLI entry point for the chunkload tool.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Result, bail};
use chunkload_core::{
    ByteRangeProducer, ChunkProducer, Downloader, GalleryProducer, HttpClient, PartFilename,
    PlaylistProducer, TransferBuffers, join_errors, merge_parts,
};
use clap::Parser;
use tracing::{debug, info};

mod app_config;
mod cli;
mod progress;

use app_config::{FileConfig, Settings, load_file_config};
use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file_config = match args.config.as_deref() {
        Some(path) => load_file_config(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(&args, &file_config);
    debug!(?settings, "settings resolved");

    if let Command::Merge {
        dir,
        dest,
        remove_parts,
    } = &args.command
    {
        let summary = merge_parts(dir, dest, *remove_parts).await?;
        info!(
            parts = summary.parts,
            bytes = summary.bytes,
            dest = %dest.display(),
            "Merge complete"
        );
        return Ok(());
    }

    // Discovery and transfers share one connection pool.
    let client = HttpClient::from_config(&settings.downloader)?;
    let producer = build_producer(&args.command, &client)?;

    let spinner = progress::spawn_spinner(!args.quiet && io::stderr().is_terminal());
    let mut downloader = Downloader::with_client(client).with_buffers(TransferBuffers::new(
        settings.downloader.copy_buffer_size,
        settings.downloader.max_idle_buffers,
    ));
    if let Some(spinner) = &spinner {
        downloader = downloader.with_progress(progress::spinner_sink(spinner));
    }

    let namer = Arc::new(
        PartFilename::new(&settings.output_dir)
            .with_prefix(settings.prefix.as_str())
            .with_suffix(settings.suffix.as_str()),
    );

    info!(
        workers = settings.workers,
        output = %settings.output_dir.display(),
        "Chunkload starting"
    );
    let errors = downloader
        .download(settings.workers, producer.as_ref(), namer)
        .await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let stats = downloader.buffers().body.stats();
    debug!(
        allocations = stats.allocations,
        reuses = stats.reuses,
        "body buffer pool"
    );

    if !errors.is_empty() {
        bail!(
            "{} chunk(s) failed:\n{}",
            errors.len(),
            join_errors(&errors)
        );
    }

    info!(output = %settings.output_dir.display(), "Download complete");
    Ok(())
}

/// Builds the chunk producer of a download subcommand.
fn build_producer(command: &Command, client: &HttpClient) -> Result<Box<dyn ChunkProducer>> {
    let producer: Box<dyn ChunkProducer> = match command {
        Command::Range { url, chunk_size } => Box::new(ByteRangeProducer::new(
            client.clone(),
            url.as_str(),
            *chunk_size,
        )),
        Command::Gallery {
            base_url,
            pattern,
            max_pages,
        } => {
            let mut producer = GalleryProducer::new(client.clone(), base_url.as_str())?;
            if let Some(pattern) = pattern {
                producer = producer.with_pattern(pattern)?;
            }
            if let Some(max_pages) = max_pages {
                producer = producer.with_max_pages(*max_pages);
            }
            Box::new(producer)
        }
        Command::Playlist {
            url,
            segment_prefix,
        } => {
            let mut producer = PlaylistProducer::new(client.clone(), url.as_str());
            if let Some(prefix) = segment_prefix {
                producer = producer.with_segment_prefix(prefix.as_str());
            }
            Box::new(producer)
        }
        Command::Merge { .. } => bail!("merge does not download"),
    };
    Ok(producer)
}
