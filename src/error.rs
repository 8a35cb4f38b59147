//! Error types for ledgerstore
//!
//! Provides a unified error type for the channel and cache operations.

use thiserror::Error;

/// Result type alias using LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Unified error type for ledgerstore operations
///
/// A full cache is not an error: `WriteCache::put` reports it as `Ok(false)`.
#[derive(Debug, Error)]
pub enum LedgerError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        LedgerError::InvalidArgument(msg.into())
    }

    pub(crate) fn closed(component: &str) -> Self {
        LedgerError::IllegalState(format!("{} is closed", component))
    }

    /// True for errors raised by argument validation
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, LedgerError::InvalidArgument(_))
    }

    /// True for errors raised by use after close
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, LedgerError::IllegalState(_))
    }
}
