//! Configuration for ledgerstore
//!
//! Centralized configuration with sensible defaults.

use crate::error::{LedgerError, Result};

/// Main configuration for the write path
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Buffered Channel Configuration
    // -------------------------------------------------------------------------
    /// Capacity of the channel write buffer (in bytes)
    /// 0 disables buffering: every write goes straight to the file
    pub write_buffer_capacity: usize,

    /// Capacity of the read-ahead window (in bytes)
    /// None means "same as write_buffer_capacity"
    pub read_buffer_capacity: Option<usize>,

    /// Sync the file once this many bytes are appended but not synced
    /// None disables automatic syncing
    pub unpersisted_bytes_bound: Option<u64>,

    // -------------------------------------------------------------------------
    // Write Cache Configuration
    // -------------------------------------------------------------------------
    /// Max bytes the write cache may hold
    pub cache_capacity: usize,

    /// Size of one cache segment (in bytes)
    /// None means "same as cache_capacity" (single segment)
    pub cache_segment_size: Option<usize>,

    /// Number of index shards (entries are sharded by log id)
    pub index_shards: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            write_buffer_capacity: 64 * 1024, // 64 KB
            read_buffer_capacity: None,
            unpersisted_bytes_bound: None,
            cache_capacity: 64 * 1024 * 1024, // 64 MB
            cache_segment_size: None,
            index_shards: 16,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Effective read-ahead capacity
    pub fn read_capacity(&self) -> usize {
        self.read_buffer_capacity
            .unwrap_or(self.write_buffer_capacity)
    }

    /// Effective segment size
    pub fn segment_size(&self) -> usize {
        self.cache_segment_size.unwrap_or(self.cache_capacity)
    }

    /// Check the cache parameters
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(LedgerError::Config(
                "cache capacity must be positive".to_string(),
            ));
        }
        let segment_size = self.segment_size();
        if segment_size == 0 || segment_size > self.cache_capacity {
            return Err(LedgerError::Config(format!(
                "segment size {} must be in 1..={}",
                segment_size, self.cache_capacity
            )));
        }
        if self.index_shards == 0 {
            return Err(LedgerError::Config(
                "index shard count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the channel write buffer capacity (in bytes)
    pub fn write_buffer_capacity(mut self, size: usize) -> Self {
        self.config.write_buffer_capacity = size;
        self
    }

    /// Set the channel read-ahead capacity (in bytes)
    pub fn read_buffer_capacity(mut self, size: usize) -> Self {
        self.config.read_buffer_capacity = Some(size);
        self
    }

    /// Sync automatically after this many unsynced bytes
    pub fn unpersisted_bytes_bound(mut self, bytes: u64) -> Self {
        self.config.unpersisted_bytes_bound = Some(bytes);
        self
    }

    /// Set the write cache capacity (in bytes)
    pub fn cache_capacity(mut self, size: usize) -> Self {
        self.config.cache_capacity = size;
        self
    }

    /// Set the write cache segment size (in bytes)
    pub fn cache_segment_size(mut self, size: usize) -> Self {
        self.config.cache_segment_size = Some(size);
        self
    }

    /// Set the number of index shards
    pub fn index_shards(mut self, count: usize) -> Self {
        self.config.index_shards = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
