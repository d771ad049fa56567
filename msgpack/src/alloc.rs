//! Allocation of owned payload buffers.
//!
//! Owned reads (for example [crate::Reader::expect_string]) ask the reader's [Allocator] for a
//! buffer of exactly the declared payload length. The buffer is handed to the caller; the reader
//! keeps no reference to it.

use crate::Error;
use tracing::debug;

/// Source of owned byte buffers.
pub trait Allocator {
    /// Returns a zero-filled buffer of exactly `len` bytes.
    fn allocate(&mut self, len: usize) -> Result<Vec<u8>, Error>;
}

/// Allocates from the global heap, reporting reservation failure instead of aborting.
#[derive(Clone, Copy, Debug, Default)]
pub struct Global;

impl Allocator for Global {
    fn allocate(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).map_err(|_| Error::OutOfMemory)?;
        buf.resize(len, 0);
        Ok(buf)
    }
}

/// Allocates from the global heap until a fixed number of bytes has been handed out.
///
/// Useful when decoding untrusted input: a single reader can never materialize more than
/// `limit` bytes of strings, blobs, and extension payloads, regardless of the lengths it is
/// asked to honor.
#[derive(Clone, Copy, Debug)]
pub struct Budget {
    remaining: usize,
}

impl Budget {
    /// Creates a budget that permits `limit` bytes in total.
    pub fn new(limit: usize) -> Self {
        Self { remaining: limit }
    }

    /// Bytes that may still be allocated.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Allocator for Budget {
    fn allocate(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        if len > self.remaining {
            debug!(len, remaining = self.remaining, "allocation exceeds budget");
            return Err(Error::OutOfMemory);
        }
        let buf = Global.allocate(len)?;
        self.remaining -= len;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global() {
        let buf = Global.allocate(16).unwrap();
        assert_eq!(buf, vec![0u8; 16]);
        assert!(Global.allocate(0).unwrap().is_empty());
    }

    #[test]
    fn test_global_oversized() {
        assert!(matches!(Global.allocate(usize::MAX), Err(Error::OutOfMemory)));
    }

    #[test]
    fn test_budget() {
        let mut budget = Budget::new(10);
        assert_eq!(budget.allocate(4).unwrap().len(), 4);
        assert_eq!(budget.remaining(), 6);
        assert!(matches!(budget.allocate(7), Err(Error::OutOfMemory)));
        assert_eq!(budget.remaining(), 6);
        assert_eq!(budget.allocate(6).unwrap().len(), 6);
        assert!(matches!(budget.allocate(1), Err(Error::OutOfMemory)));
        assert!(budget.allocate(0).unwrap().is_empty());
    }
}
