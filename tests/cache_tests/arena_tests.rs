//! Byte arena and index tests

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use bytes::BytesMut;
use ledgerstore::cache::{ByteArena, EntryIndex, EntryKey, EntryLocation};

// =============================================================================
// ByteArena Tests
// =============================================================================

#[test]
fn test_claims_are_sequential() {
    let arena = ByteArena::new(BytesMut::new(), 64);

    assert_eq!(arena.try_claim(10), Some(0));
    assert_eq!(arena.try_claim(20), Some(10));
    assert_eq!(arena.used(), 30);
    assert_eq!(arena.remaining(), 34);
}

#[test]
fn test_claim_past_capacity_fails() {
    let arena = ByteArena::new(BytesMut::new(), 16);

    assert_eq!(arena.try_claim(10), Some(0));
    assert_eq!(arena.try_claim(7), None);
    assert_eq!(arena.try_claim(6), Some(10));
    assert_eq!(arena.try_claim(1), None);
    assert_eq!(arena.try_claim(0), Some(16));
}

#[test]
fn test_append_and_read() {
    let arena = ByteArena::new(BytesMut::with_capacity(32), 32);

    let a = arena.append(b"hello").unwrap();
    let b = arena.append(b"world").unwrap();

    assert_eq!(arena.read(a, 5).as_ref(), b"hello");
    assert_eq!(arena.read(b, 5).as_ref(), b"world");
}

#[test]
fn test_reset_rewinds_cursor() {
    let arena = ByteArena::new(BytesMut::new(), 8);
    arena.append(b"12345678").unwrap();
    assert_eq!(arena.append(b"9"), None);

    arena.reset();

    assert_eq!(arena.used(), 0);
    assert_eq!(arena.append(b"9"), Some(0));
    assert_eq!(arena.into_inner().len(), 8);
}

#[test]
fn test_concurrent_claims_do_not_overlap() {
    let arena = Arc::new(ByteArena::new(BytesMut::new(), 8 * 1000));

    let mut handles = vec![];
    for _ in 0..8 {
        let arena = Arc::clone(&arena);
        handles.push(thread::spawn(move || {
            let mut offsets = vec![];
            while let Some(offset) = arena.try_claim(8) {
                offsets.push(offset);
            }
            offsets
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for offset in handle.join().unwrap() {
            assert_eq!(offset % 8, 0);
            assert!(seen.insert(offset), "offset {} claimed twice", offset);
        }
    }
    assert_eq!(seen.len(), 1000);
}

// =============================================================================
// EntryIndex Tests
// =============================================================================

fn loc(offset: usize) -> EntryLocation {
    EntryLocation { segment: 0, offset, len: 1 }
}

#[test]
fn test_entry_key_validation() {
    assert!(EntryKey::new(0, 0).is_ok());
    assert!(EntryKey::new(-1, 0).unwrap_err().is_invalid_argument());
    assert!(EntryKey::new(0, -1).unwrap_err().is_invalid_argument());
}

#[test]
fn test_entry_keys_order_by_log_then_record() {
    let a = EntryKey::new(1, 100).unwrap();
    let b = EntryKey::new(2, 0).unwrap();
    let c = EntryKey::new(2, 1).unwrap();

    assert!(a < b);
    assert!(b < c);
}

#[test]
fn test_index_insert_replaces() {
    let index = EntryIndex::new(4);
    let key = EntryKey::new(1, 1).unwrap();

    assert_eq!(index.insert(key, loc(0)), None);
    assert_eq!(index.insert(key, loc(5)), Some(loc(0)));
    assert_eq!(index.get(&key), Some(loc(5)));
    assert_eq!(index.len(), 1);
}

#[test]
fn test_index_last_and_remove_log() {
    let index = EntryIndex::new(4);
    for record_id in [4i64, 1, 7] {
        index.insert(EntryKey::new(2, record_id).unwrap(), loc(record_id as usize));
    }
    index.insert(EntryKey::new(6, 50).unwrap(), loc(50));

    let (key, location) = index.last(2).unwrap();
    assert_eq!(key, EntryKey::new(2, 7).unwrap());
    assert_eq!(location, loc(7));

    assert_eq!(index.remove_log(2), 3);
    assert_eq!(index.last(2), None);
    assert!(index.contains(&EntryKey::new(6, 50).unwrap()));
}

#[test]
fn test_index_snapshot_sorted_across_shards() {
    let index = EntryIndex::new(3);
    for log_id in (0..10i64).rev() {
        index.insert(EntryKey::new(log_id, 10 - log_id).unwrap(), loc(0));
    }

    let keys: Vec<EntryKey> = index.snapshot().into_iter().map(|(k, _)| k).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(keys.len(), 10);

    index.clear();
    assert!(index.is_empty());
}
