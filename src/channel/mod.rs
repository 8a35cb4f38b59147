//! Buffered Channel Module
//!
//! Batches small appends in memory before they reach an append-only file.
//!
//! ## Responsibilities
//! - Accumulate writes in a bounded write buffer
//! - Flush the buffer to the file when it fills up
//! - Serve reads from the file, the buffer, or both
//! - Track the logical position (durable + buffered bytes)
//!
//! ## Layout
//! ```text
//!  0                    file_position            position
//!  ├──────── file ──────────┼──── write buffer ──────┤
//!  │  (durable, read via    │  (in memory, flushed   │
//!  │   read-ahead window)   │   when it fills up)    │
//! ```

mod buffered;
mod file;
mod source;

pub use buffered::BufferedChannel;
pub use file::{FileHandle, LogFile};
pub use source::WriteSource;
