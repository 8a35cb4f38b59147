//! Write Cache implementation
//!
//! Segmented arena storage + sharded ordered index.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::alloc::BufferAllocator;
use crate::config::Config;
use crate::error::{LedgerError, Result};

use super::index::{check_log_id, EntryIndex, EntryKey, EntryLocation};
use super::ByteArena;

const DEFAULT_INDEX_SHARDS: usize = 16;

/// Capacity-bounded cache of recently written records
///
/// ## Concurrency:
/// - `size`: capacity is reserved with an atomic `fetch_update` before any copy
/// - `active_segment`: atomic index; arenas claim byte ranges lock-free
/// - `index`: sharded by log id, RwLock per shard
/// - `segments`: the RwLock doubles as a quiescence gate. put/get hold the
///   read side; clear/close take the write side and so never overlap with
///   an operation in flight. `None` once closed.
pub struct WriteCache {
    allocator: Arc<dyn BufferAllocator>,

    /// Max bytes charged across all entries
    capacity: usize,

    /// Capacity of one arena; no entry may be larger
    segment_size: usize,

    segments: RwLock<Option<Vec<ByteArena>>>,

    /// Arena currently receiving new entries
    active_segment: AtomicUsize,

    /// Bytes charged, including overwritten entries until clear()
    size: AtomicUsize,

    index: EntryIndex,
}

impl WriteCache {
    /// Single-segment cache of `capacity` bytes
    pub fn new(allocator: Arc<dyn BufferAllocator>, capacity: usize) -> Result<Self> {
        Self::with_segment_size(allocator, capacity, capacity)
    }

    /// Cache of `capacity` bytes split into arenas of `segment_size` bytes
    pub fn with_segment_size(
        allocator: Arc<dyn BufferAllocator>,
        capacity: usize,
        segment_size: usize,
    ) -> Result<Self> {
        let config = Config::builder()
            .cache_capacity(capacity)
            .cache_segment_size(segment_size)
            .index_shards(DEFAULT_INDEX_SHARDS)
            .build();
        Self::from_config(allocator, &config)
    }

    /// Cache sized by `config`
    pub fn from_config(allocator: Arc<dyn BufferAllocator>, config: &Config) -> Result<Self> {
        config.validate()?;

        let capacity = config.cache_capacity;
        let segment_size = config.segment_size();
        let segment_count = capacity.div_ceil(segment_size);

        let segments = (0..segment_count)
            .map(|_| ByteArena::new(allocator.allocate(segment_size), segment_size))
            .collect();

        tracing::debug!(capacity, segment_size, segment_count, "Created write cache");

        Ok(Self {
            allocator,
            capacity,
            segment_size,
            segments: RwLock::new(Some(segments)),
            active_segment: AtomicUsize::new(0),
            size: AtomicUsize::new(0),
            index: EntryIndex::new(config.index_shards),
        })
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Store a copy of `data` under (log_id, record_id)
    ///
    /// Returns:
    /// - `Ok(true)`: stored; any previous entry for the key is replaced
    /// - `Ok(false)`: larger than a segment, or the cache is full
    pub fn put(&self, log_id: i64, record_id: i64, data: &[u8]) -> Result<bool> {
        let key = EntryKey::new(log_id, record_id)?;

        let guard = self.segments.read();
        let segments = guard.as_ref().ok_or_else(|| LedgerError::closed("write cache"))?;

        let len = data.len();
        if len > self.segment_size {
            tracing::debug!(log_id, record_id, len, "Entry larger than a segment, rejecting");
            return Ok(false);
        }

        // Charge the full length up front
        let reserved = self
            .size
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |size| {
                let next = size.checked_add(len)?;
                (next <= self.capacity).then_some(next)
            });
        if reserved.is_err() {
            tracing::debug!(log_id, record_id, len, "Write cache full, rejecting");
            return Ok(false);
        }

        let (segment, offset) = match self.claim(segments, len) {
            Some(slot) => slot,
            None => {
                self.size.fetch_sub(len, Ordering::AcqRel);
                tracing::debug!(log_id, record_id, len, "No segment room left, rejecting");
                return Ok(false);
            }
        };

        segments[segment].write_at(offset, data);

        self.index.insert(key, EntryLocation { segment, offset, len });

        tracing::trace!(log_id, record_id, segment, offset, len, "Cached entry");
        Ok(true)
    }

    /// Claim `len` bytes in the active arena, moving on to the next arena
    /// when it lacks room. Entries are never split.
    fn claim(&self, segments: &[ByteArena], len: usize) -> Option<(usize, usize)> {
        loop {
            let current = self.active_segment.load(Ordering::Acquire);
            let arena = segments.get(current)?;

            if let Some(offset) = arena.try_claim(len) {
                return Some((current, offset));
            }

            // Last arena stays active so smaller entries can still use its tail
            if current + 1 >= segments.len() {
                return None;
            }

            // Losing this race just means someone else already moved on
            let _ = self.active_segment.compare_exchange(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Bytes stored under (log_id, record_id)
    pub fn get(&self, log_id: i64, record_id: i64) -> Result<Option<Bytes>> {
        let key = EntryKey::new(log_id, record_id)?;

        let guard = self.segments.read();
        let segments = guard.as_ref().ok_or_else(|| LedgerError::closed("write cache"))?;

        Ok(self
            .index
            .get(&key)
            .map(|loc| segments[loc.segment].read(loc.offset, loc.len)))
    }

    pub fn has_entry(&self, log_id: i64, record_id: i64) -> Result<bool> {
        let key = EntryKey::new(log_id, record_id)?;

        let guard = self.segments.read();
        if guard.is_none() {
            return Err(LedgerError::closed("write cache"));
        }

        Ok(self.index.contains(&key))
    }

    /// Bytes stored under the highest record id of `log_id`
    pub fn get_last_entry(&self, log_id: i64) -> Result<Option<Bytes>> {
        check_log_id(log_id)?;

        let guard = self.segments.read();
        let segments = guard.as_ref().ok_or_else(|| LedgerError::closed("write cache"))?;

        Ok(self
            .index
            .last(log_id)
            .map(|(_, loc)| segments[loc.segment].read(loc.offset, loc.len)))
    }

    /// Visit every live entry in (log id, record id) order
    ///
    /// Entries are copied out under the gate and `f` runs after it is
    /// released, so `f` may call back into the cache (including `clear`).
    /// Stops at the first error returned by `f`.
    pub fn for_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(i64, i64, Bytes) -> Result<()>,
    {
        let entries: Vec<(EntryKey, Bytes)> = {
            let guard = self.segments.read();
            let segments = guard.as_ref().ok_or_else(|| LedgerError::closed("write cache"))?;

            self.index
                .snapshot()
                .into_iter()
                .map(|(key, loc)| (key, segments[loc.segment].read(loc.offset, loc.len)))
                .collect()
        };

        for (key, data) in entries {
            f(key.log_id, key.record_id, data)?;
        }
        Ok(())
    }

    /// Forget every entry of `log_id`
    ///
    /// The bytes stay charged against the capacity until `clear`.
    pub fn delete_log(&self, log_id: i64) -> Result<usize> {
        check_log_id(log_id)?;

        let guard = self.segments.read();
        if guard.is_none() {
            return Err(LedgerError::closed("write cache"));
        }

        let removed = self.index.remove_log(log_id);

        tracing::debug!(log_id, removed, "Deleted log from write cache");
        Ok(removed)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Drop all entries and rewind every segment
    pub fn clear(&self) -> Result<()> {
        let guard = self.segments.write();
        let segments = guard.as_ref().ok_or_else(|| LedgerError::closed("write cache"))?;

        for arena in segments {
            arena.reset();
        }
        self.reset_bookkeeping();

        tracing::debug!("Cleared write cache");
        Ok(())
    }

    /// Clear and hand every segment buffer back to the allocator
    pub fn close(&self) -> Result<()> {
        let mut guard = self.segments.write();
        let segments = guard.take().ok_or_else(|| LedgerError::closed("write cache"))?;

        self.reset_bookkeeping();
        for arena in segments {
            self.allocator.release(arena.into_inner());
        }

        tracing::info!(capacity = self.capacity, "Closed write cache");
        Ok(())
    }

    fn reset_bookkeeping(&self) {
        self.index.clear();
        self.active_segment.store(0, Ordering::Release);
        self.size.store(0, Ordering::Release);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Bytes currently charged against the capacity
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Number of live entries
    pub fn count(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    pub fn segment_count(&self) -> usize {
        self.capacity.div_ceil(self.segment_size)
    }

    pub fn is_open(&self) -> bool {
        self.segments.read().is_some()
    }
}
