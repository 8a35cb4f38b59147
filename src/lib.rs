//! # ledgerstore
//!
//! Write/read hot path of a log-structured storage engine:
//! - Buffered append channel that batches small writes before the file
//! - Capacity-bounded write cache keyed by (log id, record id)
//! - Segment (arena) allocation with bulk reclaim
//! - Concurrent readers alongside writers
//!
//! ## Architecture Overview
//!
//! ```text
//!        producers                          flushers / readers
//!     ┌──────┴──────┐                     ┌─────────┴─────────┐
//!     │             │                     │                   │
//!     ▼             ▼                     ▼                   ▼
//! ┌────────────────────┐            ┌──────────────────────────────┐
//! │  BufferedChannel   │            │          WriteCache          │
//! │  (write buffer +   │            │  (sharded index + segments)  │
//! │   read-ahead)      │            └──────────────┬───────────────┘
//! └─────────┬──────────┘                           │
//!           ▼                                      ▼
//!   ┌───────────────┐                     ┌─────────────────┐
//!   │    LogFile    │                     │ BufferAllocator │
//!   │ (append-only) │                     │  (heap / pool)  │
//!   └───────────────┘                     └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod alloc;
pub mod channel;
pub mod cache;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LedgerError, Result};
pub use config::Config;
pub use alloc::{BufferAllocator, HeapAllocator, PooledAllocator};
pub use channel::{BufferedChannel, FileHandle, LogFile, WriteSource};
pub use cache::WriteCache;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ledgerstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
