//! Buffered Channel Tests
//!
//! These tests verify:
//! - Buffering and flush-on-full behavior
//! - Position accounting
//! - Reads across the file / buffer boundary
//! - Clear, close and drop
//! - Readers running alongside a writer

mod lifecycle_tests;
