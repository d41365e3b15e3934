//! Reusable byte buffers for body transfers.
//!
//! Two pools back every transfer: a *body* pool of grow-as-needed buffers
//! that accumulate a response body, and a *copy* pool of fixed-size scratch
//! buffers used to move bytes from the response stream into the body.
//!
//! Buffers are handed out as [`PooledBuffer`] guards that return themselves
//! to their pool on drop, so a buffer goes back whether the transfer
//! succeeded or failed. A guard is owned by exactly one transfer.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

use super::constants::{DEFAULT_COPY_BUFFER_SIZE, DEFAULT_MAX_IDLE_BUFFERS};

/// Shape of the buffers a pool hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferKind {
    /// Empty on acquire, grows as data is appended.
    Growable,
    /// Exactly `len` zeroed bytes on acquire.
    Fixed(usize),
}

/// Statistics for buffer pool operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolStats {
    /// Number of buffers allocated because the pool was empty.
    pub allocations: u64,
    /// Number of acquisitions served from the pool.
    pub reuses: u64,
    /// Number of buffers currently idle in the pool.
    pub idle: usize,
}

/// Thread-safe pool of byte buffers.
///
/// The pool is always used through an `Arc` so that guards can outlive the
/// borrow of the pool and travel into spawned tasks.
#[derive(Debug)]
pub struct BufferPool {
    kind: BufferKind,
    max_idle: usize,
    idle: Mutex<Vec<Vec<u8>>>,
    allocations: AtomicU64,
    reuses: AtomicU64,
}

impl BufferPool {
    /// Creates a pool of grow-as-needed buffers.
    #[must_use]
    pub fn growable(max_idle: usize) -> Arc<Self> {
        Arc::new(Self::with_kind(BufferKind::Growable, max_idle))
    }

    /// Creates a pool of fixed-size scratch buffers of `size` bytes.
    #[must_use]
    pub fn fixed(size: usize, max_idle: usize) -> Arc<Self> {
        Arc::new(Self::with_kind(BufferKind::Fixed(size), max_idle))
    }

    fn with_kind(kind: BufferKind, max_idle: usize) -> Self {
        Self {
            kind,
            max_idle,
            idle: Mutex::new(Vec::new()),
            allocations: AtomicU64::new(0),
            reuses: AtomicU64::new(0),
        }
    }

    /// Takes a buffer from the pool, allocating one if the pool is empty.
    ///
    /// Growable buffers are returned empty; fixed buffers are returned at
    /// their full size with zeroed contents.
    #[must_use]
    pub fn acquire(self: &Arc<Self>) -> PooledBuffer {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let buffer = if let Some(buffer) = reused {
            self.reuses.fetch_add(1, Ordering::Relaxed);
            buffer
        } else {
            self.allocations.fetch_add(1, Ordering::Relaxed);
            trace!(kind = ?self.kind, "buffer pool empty, allocating");
            match self.kind {
                BufferKind::Growable => Vec::new(),
                BufferKind::Fixed(size) => vec![0; size],
            }
        };

        PooledBuffer {
            buffer: Some(buffer),
            pool: Arc::clone(self),
        }
    }

    /// Clears `buffer` and keeps it for reuse, unless the pool is full.
    fn release(&self, mut buffer: Vec<u8>) {
        match self.kind {
            BufferKind::Growable => buffer.clear(),
            BufferKind::Fixed(size) => {
                buffer.clear();
                buffer.resize(size, 0);
            }
        }

        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(buffer);
        }
    }

    /// Returns current pool statistics.
    #[must_use]
    pub fn stats(&self) -> BufferPoolStats {
        let idle = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        BufferPoolStats {
            allocations: self.allocations.load(Ordering::Relaxed),
            reuses: self.reuses.load(Ordering::Relaxed),
            idle,
        }
    }
}

/// A buffer borrowed from a [`BufferPool`]; returned to the pool on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    buffer: Option<Vec<u8>>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        // Only `drop` takes the buffer out.
        self.buffer.as_ref().map_or(&EMPTY, |b| b)
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        self.buffer.get_or_insert_with(Vec::new)
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.release(buffer);
        }
    }
}

static EMPTY: Vec<u8> = Vec::new();

/// The body and copy pools shared by all transfers of a downloader.
///
/// Cloning is cheap and shares the underlying pools, so several downloaders
/// can draw from the same buffers.
#[derive(Debug, Clone)]
pub struct TransferBuffers {
    /// Grow-as-needed buffers accumulating response bodies.
    pub body: Arc<BufferPool>,
    /// Fixed-size scratch buffers for stream copies.
    pub copy: Arc<BufferPool>,
}

impl TransferBuffers {
    /// Creates pools with `copy_size`-byte scratch buffers, each pool keeping
    /// at most `max_idle` released buffers.
    #[must_use]
    pub fn new(copy_size: usize, max_idle: usize) -> Self {
        Self {
            body: BufferPool::growable(max_idle),
            copy: BufferPool::fixed(copy_size, max_idle),
        }
    }
}

impl Default for TransferBuffers {
    fn default() -> Self {
        Self::new(DEFAULT_COPY_BUFFER_SIZE, DEFAULT_MAX_IDLE_BUFFERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growable_acquire_allocates_when_empty() {
        let pool = BufferPool::growable(4);
        let buffer = pool.acquire();
        assert!(buffer.is_empty());

        let stats = pool.stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.reuses, 0);
        assert_eq!(stats.idle, 0);
    }

    #[test]
    fn test_drop_returns_buffer_cleared() {
        let pool = BufferPool::growable(4);
        {
            let mut buffer = pool.acquire();
            buffer.extend_from_slice(b"secret body");
        }
        assert_eq!(pool.stats().idle, 1);

        let buffer = pool.acquire();
        assert!(buffer.is_empty(), "reused buffer must be cleared");
        assert!(buffer.capacity() >= b"secret body".len(), "capacity retained");

        let stats = pool.stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.reuses, 1);
    }

    #[test]
    fn test_fixed_buffers_have_full_size_and_are_zeroed() {
        let pool = BufferPool::fixed(16, 4);
        {
            let mut buffer = pool.acquire();
            assert_eq!(buffer.len(), 16);
            buffer.fill(0xAB);
            buffer.truncate(3);
        }
        let buffer = pool.acquire();
        assert_eq!(buffer.len(), 16);
        assert!(buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_max_idle_bounds_retained_buffers() {
        let pool = BufferPool::growable(2);
        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();
        drop(a);
        drop(b);
        drop(c);
        assert_eq!(pool.stats().idle, 2);
    }

    #[test]
    fn test_concurrent_guards_never_share_a_buffer() {
        let pool = BufferPool::growable(8);
        let mut first = pool.acquire();
        let mut second = pool.acquire();
        first.push(1);
        second.push(2);
        assert_eq!(first.as_slice(), &[1]);
        assert_eq!(second.as_slice(), &[2]);
        assert_eq!(pool.stats().allocations, 2);
    }

    #[test]
    fn test_pool_shared_across_threads() {
        let pool = BufferPool::fixed(64, 16);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let buffer = pool.acquire();
                        assert_eq!(buffer.len(), 64);
                    }
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }
        let stats = pool.stats();
        assert_eq!(stats.allocations + stats.reuses, 800);
        assert!(stats.idle <= 16);
    }

    #[test]
    fn test_transfer_buffers_default_copy_size() {
        let buffers = TransferBuffers::default();
        assert_eq!(buffers.copy.acquire().len(), DEFAULT_COPY_BUFFER_SIZE);
        assert!(buffers.body.acquire().is_empty());
    }
}
