//! Buffered Channel
//!
//! Write buffer + read-ahead window in front of one append-only file.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use parking_lot::Mutex;

use crate::alloc::BufferAllocator;
use crate::config::Config;
use crate::error::{LedgerError, Result};

use super::{FileHandle, LogFile, WriteSource};

/// Buffered append channel over a `LogFile`
///
/// ## Concurrency Model: Single Writer / Concurrent Readers
///
/// - `state`: one Mutex guards the write buffer, the durable file length,
///   the file handle and the read-ahead window. A flush (append, reset buffer,
///   publish new file length) happens entirely under it, so readers never see
///   bytes that left the buffer but are not in the file yet.
/// - `position`: published copy of the logical position, read without locking.
pub struct BufferedChannel<F: LogFile = FileHandle> {
    allocator: Arc<dyn BufferAllocator>,

    /// Write buffer capacity (0 = unbuffered)
    write_capacity: usize,

    /// Read-ahead window capacity (0 = read the file directly)
    read_capacity: usize,

    /// Flush + sync once this many written bytes are not yet synced
    unpersisted_bytes_bound: Option<u64>,

    /// file_position + buffered bytes, updated under `state`
    position: AtomicU64,

    state: Mutex<ChannelState<F>>,
}

struct ChannelState<F> {
    /// None once the channel is closed
    file: Option<F>,

    /// Bytes logically located after `file_position`
    write_buf: BytesMut,

    /// Durable file length
    file_position: u64,

    /// Cached copy of file bytes starting at `read_start`
    read_buf: BytesMut,
    read_start: u64,

    /// Bytes written since the last sync
    unpersisted: u64,
}

impl<F: LogFile> BufferedChannel<F> {
    /// Channel with capacities and sync bound taken from `config`
    pub fn from_config(allocator: Arc<dyn BufferAllocator>, file: F, config: &Config) -> Result<Self> {
        Self::build(
            allocator,
            file,
            config.write_buffer_capacity,
            config.read_capacity(),
            config.unpersisted_bytes_bound,
        )
    }

    /// Create a channel whose read-ahead window matches the write buffer
    ///
    /// The logical position starts at the file's current length.
    pub fn new(allocator: Arc<dyn BufferAllocator>, file: F, write_capacity: usize) -> Result<Self> {
        Self::build(allocator, file, write_capacity, write_capacity, None)
    }

    /// Create a channel with separate write and read-ahead capacities
    pub fn with_capacities(
        allocator: Arc<dyn BufferAllocator>,
        file: F,
        write_capacity: usize,
        read_capacity: usize,
    ) -> Result<Self> {
        Self::build(allocator, file, write_capacity, read_capacity, None)
    }

    /// Create a channel that syncs after `bound` unsynced bytes
    pub fn with_unpersisted_bound(
        allocator: Arc<dyn BufferAllocator>,
        file: F,
        write_capacity: usize,
        bound: u64,
    ) -> Result<Self> {
        Self::build(allocator, file, write_capacity, write_capacity, Some(bound))
    }

    fn build(
        allocator: Arc<dyn BufferAllocator>,
        mut file: F,
        write_capacity: usize,
        read_capacity: usize,
        unpersisted_bytes_bound: Option<u64>,
    ) -> Result<Self> {
        let file_position = file.size()?;
        let write_buf = allocator.allocate(write_capacity);
        let read_buf = allocator.allocate(read_capacity);

        tracing::debug!(
            write_capacity,
            read_capacity,
            file_position,
            "Opened buffered channel"
        );

        Ok(Self {
            allocator,
            write_capacity,
            read_capacity,
            unpersisted_bytes_bound: unpersisted_bytes_bound.filter(|&b| b > 0),
            position: AtomicU64::new(file_position),
            state: Mutex::new(ChannelState {
                file: Some(file),
                write_buf,
                file_position,
                read_buf,
                read_start: 0,
                unpersisted: 0,
            }),
        })
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Append the readable bytes of `src`
    ///
    /// Bytes are copied into the write buffer, which is flushed to the file
    /// every time it fills up. Returns the number of bytes consumed; a source
    /// reporting a negative length, or more bytes than it holds, is consumed
    /// as empty.
    ///
    /// If the file rejects a flush, the error is returned and `position()`
    /// only covers the bytes consumed before the failure.
    pub fn write<S: WriteSource + ?Sized>(&self, src: Option<&S>) -> Result<usize> {
        let src = src.ok_or_else(|| LedgerError::invalid("write source is absent"))?;

        let mut state = self.state.lock();
        state.ensure_open()?;

        let readable = src.readable_bytes();
        if readable <= 0 {
            if readable < 0 {
                tracing::debug!(readable, "Ignoring write source with negative length");
            }
            return Ok(0);
        }

        let chunk = src.chunk();
        let len = readable as usize;
        if len > chunk.len() {
            tracing::debug!(
                readable,
                available = chunk.len(),
                "Ignoring write source with overstated length"
            );
            return Ok(0);
        }
        let result = self.write_locked(&mut state, &chunk[..len]);
        self.publish(&state);
        result?;

        if let Some(bound) = self.unpersisted_bytes_bound {
            if state.unpersisted >= bound {
                state.flush()?;
                state.sync()?;
                self.publish(&state);
            }
        }

        Ok(len)
    }

    /// Fill-flush loop; never recurses regardless of `data.len()`
    fn write_locked(&self, state: &mut ChannelState<F>, mut data: &[u8]) -> Result<()> {
        if self.write_capacity == 0 {
            return state.append_direct(data);
        }

        while !data.is_empty() {
            let room = self.write_capacity - state.write_buf.len();
            let copied = room.min(data.len());

            state.write_buf.extend_from_slice(&data[..copied]);
            state.unpersisted += copied as u64;
            data = &data[copied..];

            if state.write_buf.len() == self.write_capacity {
                state.flush()?;
            }
        }

        Ok(())
    }

    /// Append any buffered bytes to the file
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        let result = state.flush();
        self.publish(&state);
        result
    }

    /// Flush, then make everything appended so far durable
    pub fn sync(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.flush()?;
        state.sync()
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Read `length` bytes starting at `position` into the front of `dest`
    ///
    /// Bytes below `file_position()` come from the file, the rest from the
    /// write buffer. Returns `length`.
    pub fn read(&self, dest: &mut [u8], position: i64, length: i64) -> Result<usize> {
        if position < 0 {
            return Err(LedgerError::invalid(format!("negative position {}", position)));
        }
        if length < 0 {
            return Err(LedgerError::invalid(format!("negative length {}", length)));
        }
        let length = length as usize;
        if length > dest.len() {
            return Err(LedgerError::invalid(format!(
                "length {} exceeds destination capacity {}",
                length,
                dest.len()
            )));
        }

        let mut state = self.state.lock();
        state.ensure_open()?;

        let (start, end) = checked_range(position, length as i64, state.position())?;

        let durable = state.file_position;
        let mut copied = 0;

        // Low part: file (via read-ahead)
        if start < durable {
            copied = (end.min(durable) - start) as usize;
            self.read_file(&mut state, &mut dest[..copied], start)?;
        }

        // High part: write buffer
        if end > durable {
            let offset = (start.max(durable) - durable) as usize;
            let n = length - copied;
            dest[copied..length].copy_from_slice(&state.write_buf[offset..offset + n]);
        }

        Ok(length)
    }

    fn read_file(&self, state: &mut ChannelState<F>, dest: &mut [u8], mut position: u64) -> Result<()> {
        if self.read_capacity == 0 {
            return state.read_exact_at(dest, position);
        }

        let mut filled = 0;
        while filled < dest.len() {
            if let Some(window) = state.read_window(position) {
                let n = window.len().min(dest.len() - filled);
                dest[filled..filled + n].copy_from_slice(&window[..n]);
                filled += n;
                position += n as u64;
                continue;
            }
            state.fill_read_window(position, self.read_capacity)?;
        }

        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Drop buffered bytes without flushing and resync with the file length
    pub fn clear(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        let dropped = state.write_buf.len() as u64;
        state.write_buf.clear();
        state.read_buf.clear();
        state.unpersisted = state.unpersisted.saturating_sub(dropped);

        let ChannelState { file, file_position, .. } = &mut *state;
        if let Some(file) = file.as_mut() {
            *file_position = file.size()?;
        }
        self.publish(&state);

        tracing::debug!(dropped, position = state.file_position, "Cleared buffered channel");
        Ok(())
    }

    /// Flush remaining bytes and release the file handle
    ///
    /// If the final flush fails the channel stays open.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.flush()?;

        if let Some(mut file) = state.file.take() {
            file.close()?;
        }
        self.allocator.release(std::mem::take(&mut state.write_buf));
        self.allocator.release(std::mem::take(&mut state.read_buf));
        self.publish(&state);

        tracing::info!(position = state.file_position, "Closed buffered channel");
        Ok(())
    }

    /// Validate a read range against the current position without reading
    ///
    /// Lets a caller reject a bad range before allocating a destination.
    pub fn check_range(&self, position: i64, length: i64) -> Result<()> {
        checked_range(position, length, self.position()).map(|_| ())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Durable length + buffered length
    ///
    /// Unlike the operations, this accessor keeps working after `close` and
    /// reports the final position.
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Acquire)
    }

    /// Durable length of the file
    pub fn file_position(&self) -> u64 {
        self.state.lock().file_position
    }

    /// Bytes waiting in the write buffer
    pub fn buffered_bytes(&self) -> usize {
        self.state.lock().write_buf.len()
    }

    /// Copy of the bytes waiting in the write buffer
    pub fn buffered_data(&self) -> Vec<u8> {
        self.state.lock().write_buf.to_vec()
    }

    /// Bytes written since the last sync
    pub fn unpersisted_bytes(&self) -> u64 {
        self.state.lock().unpersisted
    }

    pub fn write_capacity(&self) -> usize {
        self.write_capacity
    }

    pub fn read_capacity(&self) -> usize {
        self.read_capacity
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().file.is_some()
    }

    fn publish(&self, state: &ChannelState<F>) {
        self.position.store(state.position(), Ordering::Release);
    }
}

/// `position..position + length` as offsets, if it lies below `written`
fn checked_range(position: i64, length: i64, written: u64) -> Result<(u64, u64)> {
    if position < 0 {
        return Err(LedgerError::invalid(format!("negative position {}", position)));
    }
    if length < 0 {
        return Err(LedgerError::invalid(format!("negative length {}", length)));
    }

    let start = position as u64;
    match start.checked_add(length as u64) {
        Some(end) if end <= written => Ok((start, end)),
        _ => Err(LedgerError::invalid(format!(
            "range {}+{} is past position {}",
            start, length, written
        ))),
    }
}

impl<F: LogFile> Drop for BufferedChannel<F> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.file.is_none() {
            return;
        }
        if let Err(e) = state.flush() {
            tracing::warn!("Failed to flush buffered channel on drop: {}", e);
        }
        if let Some(mut file) = state.file.take() {
            if let Err(e) = file.close() {
                tracing::warn!("Failed to close file on drop: {}", e);
            }
        }
    }
}

// =============================================================================
// Locked State Helpers
// =============================================================================

impl<F: LogFile> ChannelState<F> {
    fn ensure_open(&self) -> Result<()> {
        if self.file.is_none() {
            return Err(LedgerError::closed("buffered channel"));
        }
        Ok(())
    }

    fn file(&mut self) -> Result<&mut F> {
        self.file
            .as_mut()
            .ok_or_else(|| LedgerError::closed("buffered channel"))
    }

    fn position(&self) -> u64 {
        self.file_position + self.write_buf.len() as u64
    }

    fn flush(&mut self) -> Result<()> {
        if self.write_buf.is_empty() {
            return Ok(());
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| LedgerError::closed("buffered channel"))?;
        file.append(&self.write_buf)?;

        let flushed = self.write_buf.len();
        self.file_position += flushed as u64;
        self.write_buf.clear();

        tracing::debug!(flushed, file_position = self.file_position, "Flushed write buffer");
        Ok(())
    }

    fn append_direct(&mut self, data: &[u8]) -> Result<()> {
        self.file()?.append(data)?;
        self.file_position += data.len() as u64;
        self.unpersisted += data.len() as u64;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.file()?.sync()?;
        self.unpersisted = 0;
        Ok(())
    }

    /// Cached bytes starting at `position`, if the window covers it
    fn read_window(&self, position: u64) -> Option<&[u8]> {
        let window_end = self.read_start + self.read_buf.len() as u64;
        if self.read_buf.is_empty() || position < self.read_start || position >= window_end {
            return None;
        }
        Some(&self.read_buf[(position - self.read_start) as usize..])
    }

    /// Load up to `capacity` durable bytes starting at `position`
    fn fill_read_window(&mut self, position: u64, capacity: usize) -> Result<()> {
        let n = (self.file_position - position).min(capacity as u64) as usize;

        let mut window = std::mem::take(&mut self.read_buf);
        window.clear();
        window.resize(n, 0);

        let result = self.read_exact_at(&mut window, position);
        if result.is_err() {
            window.clear();
        }
        self.read_buf = window;
        self.read_start = position;
        result
    }

    fn read_exact_at(&mut self, dest: &mut [u8], mut position: u64) -> Result<()> {
        let file = self.file()?;
        let mut filled = 0;
        while filled < dest.len() {
            let n = file.read_at(&mut dest[filled..], position)?;
            if n == 0 {
                return Err(LedgerError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("file ended at {} while reading durable bytes", position),
                )));
            }
            filled += n;
            position += n as u64;
        }
        Ok(())
    }
}
