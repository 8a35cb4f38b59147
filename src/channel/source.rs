//! Write sources
//!
//! Anything that can hand the channel a run of readable bytes.

use bytes::{Bytes, BytesMut};

/// Readable bytes offered to `BufferedChannel::write`
pub trait WriteSource {
    /// Number of readable bytes
    ///
    /// A negative count marks an inconsistent source (e.g. a reader cursor
    /// past its writer cursor). The channel consumes such a source as empty.
    fn readable_bytes(&self) -> i64;

    /// The readable bytes; at least `readable_bytes()` long when that is positive
    fn chunk(&self) -> &[u8];
}

impl WriteSource for [u8] {
    fn readable_bytes(&self) -> i64 {
        self.len() as i64
    }

    fn chunk(&self) -> &[u8] {
        self
    }
}

impl WriteSource for str {
    fn readable_bytes(&self) -> i64 {
        self.len() as i64
    }

    fn chunk(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl WriteSource for Vec<u8> {
    fn readable_bytes(&self) -> i64 {
        self.len() as i64
    }

    fn chunk(&self) -> &[u8] {
        self
    }
}

impl WriteSource for Bytes {
    fn readable_bytes(&self) -> i64 {
        self.len() as i64
    }

    fn chunk(&self) -> &[u8] {
        self
    }
}

impl WriteSource for BytesMut {
    fn readable_bytes(&self) -> i64 {
        self.len() as i64
    }

    fn chunk(&self) -> &[u8] {
        self
    }
}
