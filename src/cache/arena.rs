//! Byte arena
//!
//! Fixed-capacity region with an append-only cursor. One arena backs one
//! write cache segment.

use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;

/// Fixed-capacity append-only byte region
///
/// ## Concurrency:
/// - `cursor`: ranges are claimed with a CAS loop, so two writers never get
///   overlapping offsets
/// - `data`: RwLock held only while copying bytes in or out. Copies into the
///   same arena serialize on the write side and readers of that arena wait
///   behind them. A single-segment cache funnels every put and get through
///   this one lock; splitting the capacity into more segments spreads it.
pub struct ByteArena {
    capacity: usize,
    cursor: AtomicUsize,
    data: RwLock<BytesMut>,
}

impl ByteArena {
    /// Wrap `buf` as an arena of exactly `capacity` bytes
    pub fn new(mut buf: BytesMut, capacity: usize) -> Self {
        buf.clear();
        buf.resize(capacity, 0);

        Self {
            capacity,
            cursor: AtomicUsize::new(0),
            data: RwLock::new(buf),
        }
    }

    /// Reserve `len` bytes at the cursor; None if they do not fit
    pub fn try_claim(&self, len: usize) -> Option<usize> {
        self.cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |offset| {
                let end = offset.checked_add(len)?;
                (end <= self.capacity).then_some(end)
            })
            .ok()
    }

    /// Copy `data` into a range previously returned by `try_claim`
    pub fn write_at(&self, offset: usize, data: &[u8]) {
        self.data.write()[offset..offset + data.len()].copy_from_slice(data);
    }

    /// Claim a range and copy `data` into it
    pub fn append(&self, data: &[u8]) -> Option<usize> {
        let offset = self.try_claim(data.len())?;
        self.write_at(offset, data);
        Some(offset)
    }

    /// Copy out `len` bytes at `offset`
    pub fn read(&self, offset: usize, len: usize) -> Bytes {
        Bytes::copy_from_slice(&self.data.read()[offset..offset + len])
    }

    /// Rewind the cursor; old bytes are overwritten by later claims
    pub fn reset(&self) {
        self.cursor.store(0, Ordering::Release);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes claimed so far
    pub fn used(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.used()
    }

    /// Give the backing buffer back (e.g. to an allocator)
    pub fn into_inner(self) -> BytesMut {
        self.data.into_inner()
    }
}
