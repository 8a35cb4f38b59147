//! Write Cache Module
//!
//! In-memory cache for records that are not yet flushed and indexed.
//!
//! ## Responsibilities
//! - Copy records into pre-allocated segments (never split across two)
//! - Never hold more bytes than the configured capacity
//! - Point lookups and "last record of a log" while puts are in flight
//! - Bulk reclaim on clear; segments are reused, not freed
//!
//! ## Layout
//! ```text
//!  index (sharded by log id)           segments
//!  ┌──────────────────────┐    ┌────────────┬────────────┬─────┐
//!  │ (log, record) → loc ─┼──▶ │ arena 0    │ arena 1    │ ... │
//!  └──────────────────────┘    │ [e1][e2].. │ [e7]..     │     │
//!                              └────────────┴────────────┴─────┘
//!                                                 ▲ active
//! ```

mod arena;
mod index;
mod write_cache;

pub use arena::ByteArena;
pub use index::{EntryIndex, EntryKey, EntryLocation};
pub use write_cache::WriteCache;
