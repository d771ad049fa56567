//! Fill-or-fail access to an underlying byte source.
//!
//! [ByteCursor] wraps any [Buf] (a `&[u8]`, a [bytes::Bytes], a chain of buffers, or an adapter
//! over a socket that exposes the bytes it has already received). Every read either delivers the
//! full run of bytes requested or fails with [Error::Io] without consuming anything.

use crate::Error;
use bytes::Buf;

/// A read position over a byte source.
///
/// The cursor never re-delivers bytes: once a run has been handed out, it is consumed.
pub struct ByteCursor<B: Buf> {
    buf: B,
    offset: usize,
}

impl<B: Buf> ByteCursor<B> {
    /// Creates a cursor positioned at the start of `buf`.
    pub fn new(buf: B) -> Self {
        Self { buf, offset: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Number of bytes still available.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Returns an error if fewer than `len` bytes remain.
    #[inline]
    pub fn at_least(&self, len: usize) -> Result<(), Error> {
        if self.buf.remaining() < len {
            return Err(Error::Io);
        }
        Ok(())
    }

    /// Consumes the next `N` bytes.
    #[inline]
    pub fn next<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut run = [0u8; N];
        self.copy_into(&mut run)?;
        Ok(run)
    }

    /// Consumes the next byte.
    #[inline]
    pub fn next_u8(&mut self) -> Result<u8, Error> {
        self.at_least(1)?;
        self.offset += 1;
        Ok(self.buf.get_u8())
    }

    /// Fills `dst` entirely from the source.
    #[inline]
    pub fn copy_into(&mut self, dst: &mut [u8]) -> Result<(), Error> {
        self.at_least(dst.len())?;
        self.buf.copy_to_slice(dst);
        self.offset += dst.len();
        Ok(())
    }

    /// Consumes `len` bytes without copying them anywhere.
    pub fn skip(&mut self, len: usize) -> Result<(), Error> {
        self.at_least(len)?;
        self.buf.advance(len);
        self.offset += len;
        Ok(())
    }

    /// Returns the underlying source, positioned after the last consumed byte.
    pub fn into_inner(self) -> B {
        self.buf
    }
}
