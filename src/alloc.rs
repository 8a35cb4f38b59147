//! Buffer allocation
//!
//! Write buffers and cache segments are taken from a `BufferAllocator` at
//! construction and handed back on close.

use bytes::BytesMut;
use crossbeam::queue::ArrayQueue;

/// Source of byte buffers for channels and caches
pub trait BufferAllocator: Send + Sync {
    /// Get an empty buffer with at least `capacity` bytes of room
    fn allocate(&self, capacity: usize) -> BytesMut;

    /// Return a buffer previously obtained from `allocate`
    fn release(&self, buf: BytesMut);
}

/// Allocates fresh heap buffers and drops released ones
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl BufferAllocator for HeapAllocator {
    fn allocate(&self, capacity: usize) -> BytesMut {
        BytesMut::with_capacity(capacity)
    }

    fn release(&self, _buf: BytesMut) {}
}

/// Recycles released buffers through a bounded lock-free queue
///
/// ## Concurrency:
/// - `pool`: crossbeam `ArrayQueue` (lock-free push/pop)
/// - A released buffer is dropped when the pool is full
pub struct PooledAllocator {
    pool: ArrayQueue<BytesMut>,
}

impl PooledAllocator {
    /// Create an allocator keeping at most `max_pooled` idle buffers
    pub fn new(max_pooled: usize) -> Self {
        Self {
            pool: ArrayQueue::new(max_pooled.max(1)),
        }
    }

    /// Number of idle buffers currently held
    pub fn pooled(&self) -> usize {
        self.pool.len()
    }
}

impl BufferAllocator for PooledAllocator {
    fn allocate(&self, capacity: usize) -> BytesMut {
        // Only look at what is there right now; a too-small buffer is dropped
        // so the pool drifts toward the sizes actually requested.
        for _ in 0..self.pool.len() {
            match self.pool.pop() {
                Some(buf) if buf.capacity() >= capacity => return buf,
                Some(_) => continue,
                None => break,
            }
        }
        BytesMut::with_capacity(capacity)
    }

    fn release(&self, mut buf: BytesMut) {
        buf.clear();
        if self.pool.push(buf).is_err() {
            tracing::trace!("Buffer pool full, dropping released buffer");
        }
    }
}
