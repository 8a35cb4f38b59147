//! Entry index
//!
//! Ordered map from (log id, record id) to the entry's place in the arenas,
//! sharded by log id.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::{LedgerError, Result};

/// Cache key, ordered by log id then record id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey {
    pub log_id: i64,
    pub record_id: i64,
}

impl EntryKey {
    /// Validated key; both ids must be non-negative
    pub fn new(log_id: i64, record_id: i64) -> Result<Self> {
        check_log_id(log_id)?;
        if record_id < 0 {
            return Err(LedgerError::invalid(format!("negative record id {}", record_id)));
        }
        Ok(Self { log_id, record_id })
    }
}

pub(crate) fn check_log_id(log_id: i64) -> Result<()> {
    if log_id < 0 {
        return Err(LedgerError::invalid(format!("negative log id {}", log_id)));
    }
    Ok(())
}

/// Where an entry's bytes live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryLocation {
    pub segment: usize,
    pub offset: usize,
    pub len: usize,
}

/// Sharded ordered index
///
/// All records of one log land in the same shard, so "last record of a log"
/// is a range query on a single BTreeMap. `len` is only changed while the
/// shard that gained or lost entries is write-locked.
pub struct EntryIndex {
    shards: Vec<RwLock<BTreeMap<EntryKey, EntryLocation>>>,
    len: AtomicUsize,
}

impl EntryIndex {
    pub fn new(shards: usize) -> Self {
        Self {
            shards: (0..shards.max(1)).map(|_| RwLock::new(BTreeMap::new())).collect(),
            len: AtomicUsize::new(0),
        }
    }

    fn shard(&self, log_id: i64) -> &RwLock<BTreeMap<EntryKey, EntryLocation>> {
        &self.shards[(log_id as u64 % self.shards.len() as u64) as usize]
    }

    /// Insert or replace; returns the previous location
    pub fn insert(&self, key: EntryKey, location: EntryLocation) -> Option<EntryLocation> {
        let mut shard = self.shard(key.log_id).write();
        let previous = shard.insert(key, location);
        if previous.is_none() {
            self.len.fetch_add(1, Ordering::AcqRel);
        }
        previous
    }

    pub fn get(&self, key: &EntryKey) -> Option<EntryLocation> {
        self.shard(key.log_id).read().get(key).copied()
    }

    pub fn contains(&self, key: &EntryKey) -> bool {
        self.shard(key.log_id).read().contains_key(key)
    }

    /// Entry with the highest record id for `log_id`
    pub fn last(&self, log_id: i64) -> Option<(EntryKey, EntryLocation)> {
        let shard = self.shard(log_id).read();
        shard
            .range(Self::log_range(log_id))
            .next_back()
            .map(|(k, v)| (*k, *v))
    }

    /// Remove every entry of `log_id`; returns how many were removed
    pub fn remove_log(&self, log_id: i64) -> usize {
        let mut shard = self.shard(log_id).write();
        let keys: Vec<EntryKey> = shard
            .range(Self::log_range(log_id))
            .map(|(k, _)| *k)
            .collect();
        for key in &keys {
            shard.remove(key);
        }
        self.len.fetch_sub(keys.len(), Ordering::AcqRel);
        keys.len()
    }

    /// All entries in key order
    pub fn snapshot(&self) -> Vec<(EntryKey, EntryLocation)> {
        let mut entries: Vec<(EntryKey, EntryLocation)> = self
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .iter()
                    .map(|(k, v)| (*k, *v))
                    .collect::<Vec<_>>()
            })
            .collect();
        entries.sort_unstable_by_key(|(k, _)| *k);
        entries
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            let mut shard = shard.write();
            self.len.fetch_sub(shard.len(), Ordering::AcqRel);
            shard.clear();
        }
    }

    /// Live entries across all shards
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn log_range(log_id: i64) -> std::ops::RangeInclusive<EntryKey> {
        EntryKey { log_id, record_id: 0 }..=EntryKey { log_id, record_id: i64::MAX }
    }
}
