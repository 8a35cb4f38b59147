//! Clear / close / drop tests

use std::sync::Arc;

use ledgerstore::{BufferAllocator, BufferedChannel, Config, FileHandle, HeapAllocator, PooledAllocator};
use tempfile::TempDir;

use crate::doubles::{pattern, MemFile};

fn heap() -> Arc<dyn BufferAllocator> {
    Arc::new(HeapAllocator)
}

// =============================================================================
// Clear Tests
// =============================================================================

#[test]
fn test_clear_discards_buffered_bytes() {
    let file = MemFile::new();
    let channel = BufferedChannel::new(heap(), file.clone(), 512).unwrap();
    channel.write(Some(&pattern(0, 5))).unwrap();

    channel.clear().unwrap();

    assert_eq!(channel.position(), 0);
    assert_eq!(channel.buffered_bytes(), 0);
    assert!(file.contents().is_empty());

    channel.write(Some(&pattern(0, 3))).unwrap();
    assert_eq!(channel.position(), 3);
}

#[test]
fn test_clear_keeps_flushed_bytes() {
    let file = MemFile::new();
    let channel = BufferedChannel::new(heap(), file.clone(), 512).unwrap();
    channel.write(Some(&pattern(0, 515))).unwrap();

    channel.clear().unwrap();

    assert_eq!(channel.position(), 512);
    assert_eq!(file.contents(), pattern(0, 512));

    let mut dest = vec![0u8; 512];
    channel.read(&mut dest, 0, 512).unwrap();
    assert_eq!(dest, pattern(0, 512));
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_close_flushes_and_releases_file() {
    let file = MemFile::new();
    let channel = BufferedChannel::new(heap(), file.clone(), 512).unwrap();
    channel.write(Some(&pattern(0, 5))).unwrap();

    channel.close().unwrap();

    assert_eq!(file.contents(), pattern(0, 5));
    assert!(file.is_closed());
    assert!(!channel.is_open());
    assert_eq!(channel.position(), 5);
}

#[test]
fn test_operations_after_close_fail() {
    let channel = BufferedChannel::new(heap(), MemFile::new(), 512).unwrap();
    channel.write(Some(&pattern(0, 5))).unwrap();
    channel.close().unwrap();
    let mut dest = vec![0u8; 5];

    assert!(channel.write(Some(&pattern(0, 1))).unwrap_err().is_illegal_state());
    assert!(channel.read(&mut dest, 0, 5).unwrap_err().is_illegal_state());
    assert!(channel.flush().unwrap_err().is_illegal_state());
    assert!(channel.sync().unwrap_err().is_illegal_state());
    assert!(channel.clear().unwrap_err().is_illegal_state());
    assert!(channel.close().unwrap_err().is_illegal_state());

    // Accessors still report the final state
    assert_eq!(channel.position(), 5);
    assert_eq!(channel.file_position(), 5);
    assert!(!channel.is_open());
}

#[test]
fn test_close_returns_buffers_to_allocator() {
    let pool = Arc::new(PooledAllocator::new(4));
    let channel = BufferedChannel::new(pool.clone(), MemFile::new(), 64).unwrap();
    assert_eq!(pool.pooled(), 0);

    channel.close().unwrap();

    // write buffer + read-ahead window
    assert_eq!(pool.pooled(), 2);
}

#[test]
fn test_drop_flushes_open_channel() {
    let file = MemFile::new();
    {
        let channel = BufferedChannel::new(heap(), file.clone(), 512).unwrap();
        channel.write(Some(&pattern(0, 3))).unwrap();
    }

    assert_eq!(file.contents(), pattern(0, 3));
    assert!(file.is_closed());
}

// =============================================================================
// File Handle Tests
// =============================================================================

#[test]
fn test_reopen_continues_at_file_length() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("reopen.log");
    let config = Config::builder().write_buffer_capacity(16).build();

    let channel = BufferedChannel::from_config(heap(), FileHandle::open(&path).unwrap(), &config).unwrap();
    channel.write(Some(&pattern(0, 20))).unwrap();
    channel.close().unwrap();

    let channel = BufferedChannel::from_config(heap(), FileHandle::open(&path).unwrap(), &config).unwrap();
    assert_eq!(channel.position(), 20);

    channel.write(Some(&pattern(20, 10))).unwrap();
    let mut dest = vec![0u8; 30];
    channel.read(&mut dest, 0, 30).unwrap();
    assert_eq!(dest, pattern(0, 30));
}

#[test]
fn test_config_read_capacity_defaults_to_write_capacity() {
    let temp_dir = TempDir::new().unwrap();
    let file = FileHandle::open(&temp_dir.path().join("cfg.log")).unwrap();
    let config = Config::builder().write_buffer_capacity(128).build();

    let channel = BufferedChannel::from_config(heap(), file, &config).unwrap();

    assert_eq!(channel.write_capacity(), 128);
    assert_eq!(channel.read_capacity(), 128);
}
