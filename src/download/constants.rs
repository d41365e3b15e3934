//! Constants for the download module (concurrency limits, buffer sizing).

/// Upper bound for the worker count and for idle connections kept per host.
pub const MAX_CONCURRENCY: usize = 1024;

/// Worker count used by the CLI when none is configured.
pub const DEFAULT_WORKERS: usize = 24;

/// Size of the scratch buffers used to copy response bodies.
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 4096;

/// Smallest accepted copy buffer size.
pub const MIN_COPY_BUFFER_SIZE: usize = 512;

/// Largest accepted copy buffer size (1 MiB).
pub const MAX_COPY_BUFFER_SIZE: usize = 1024 * 1024;

/// Number of released buffers each pool keeps for reuse.
pub const DEFAULT_MAX_IDLE_BUFFERS: usize = 64;
