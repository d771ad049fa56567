//! Tag-by-tag pull reader.
//!
//! [Reader] decodes one [Tag] at a time and keeps an explicit stack of open compound objects
//! (arrays, maps, strings, binaries, and extensions). Each frame records how many elements (or
//! payload bytes) are still owed. Reading a tag inside an array or map consumes one element of the
//! enclosing frame; payload bytes are consumed with [Reader::read_bytes_into]. A frame is only
//! popped by its matching `done_*` call, and only once nothing more is owed.
//!
//! # Sticky Errors
//!
//! The first error returned by any operation is recorded. From then on every operation returns that
//! same error immediately, without touching the byte source or the frame stack. [Reader::destroy]
//! reports the recorded error (or any frame left open) so callers can distinguish a clean decode
//! from one that failed part way through.

use crate::{alloc::Allocator, cursor::ByteCursor, Error, Global, Tag};
use bytes::Buf;
use tracing::{debug, trace, warn};

/// Kind of an open compound object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Array,
    Map,
    Str,
    Bin,
    Ext,
}

impl FrameKind {
    /// Containers hold tagged elements; the other kinds hold raw payload bytes.
    fn is_container(self) -> bool {
        matches!(self, FrameKind::Array | FrameKind::Map)
    }
}

/// An open compound object and what it still owes.
#[derive(Clone, Copy, Debug)]
struct Frame {
    kind: FrameKind,
    /// Elements (arrays, maps counting keys and values separately) or payload bytes.
    remaining: u64,
}

/// A pull-based MessagePack reader.
///
/// The caller drives decoding in the order values were written, either tag-by-tag with
/// [Reader::read_tag] or through the typed `expect_*` operations and [Reader::expect_reflect].
pub struct Reader<B: Buf, A: Allocator = Global> {
    cursor: ByteCursor<B>,
    alloc: A,
    frames: Vec<Frame>,
    peeked: Option<Tag>,
    error: Option<Error>,
}

impl<B: Buf> Reader<B> {
    /// Creates a reader over `buf` that allocates owned reads from the global heap.
    pub fn new(buf: B) -> Self {
        Self::with_allocator(buf, Global)
    }
}

impl<B: Buf, A: Allocator> Reader<B, A> {
    /// Creates a reader over `buf` that allocates owned reads from `alloc`.
    pub fn with_allocator(buf: B, alloc: A) -> Self {
        Self {
            cursor: ByteCursor::new(buf),
            alloc,
            frames: Vec::new(),
            peeked: None,
            error: None,
        }
    }

    /// Number of bytes consumed from the source (including a peeked header).
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Number of bytes left in the source.
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Number of compound objects currently open.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The recorded error, if any.
    pub fn error(&self) -> Option<Error> {
        self.error
    }

    /// Records `err` as the sticky error unless one is already set, returning the error now in
    /// effect.
    ///
    /// Reads that validate decoded values themselves (for example, a struct missing a required
    /// field) use this so the reader refuses further work just as it would for its own failures.
    pub fn poison(&mut self, err: Error) -> Error {
        if let Some(existing) = self.error {
            return existing;
        }
        debug!(error = %err, offset = self.cursor.position(), depth = self.frames.len(), "reader poisoned");
        self.error = Some(err);
        err
    }

    /// Runs `op` unless an error is recorded, recording any error it returns.
    #[inline]
    pub(crate) fn guard<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        op(self).map_err(|err| self.poison(err))
    }

    /// Fails if the next tag cannot be read in the current context.
    fn check_can_read_tag(&self) -> Result<(), Error> {
        match self.frames.last() {
            None => Ok(()),
            Some(frame) if !frame.kind.is_container() => {
                debug!(kind = ?frame.kind, remaining = frame.remaining, "tag read inside payload");
                Err(Error::TypeMismatch)
            }
            Some(frame) if frame.remaining == 0 => {
                debug!(kind = ?frame.kind, "tag read past end of container");
                Err(Error::TypeMismatch)
            }
            Some(_) => Ok(()),
        }
    }

    /// Decodes the next tag without consuming it.
    ///
    /// The header bytes are read from the source and the tag is cached: the next
    /// [Reader::read_tag] returns it without touching the source again. No frame is opened.
    pub fn peek_tag(&mut self) -> Result<Tag, Error> {
        self.guard(|r| {
            if let Some(tag) = r.peeked {
                return Ok(tag);
            }
            r.check_can_read_tag()?;
            let tag = Tag::decode(&mut r.cursor)?;
            r.peeked = Some(tag);
            Ok(tag)
        })
    }

    /// Decodes and consumes the next tag.
    ///
    /// Compound tags (array, map, str, bin, ext) open a frame that must be closed with the matching
    /// `done_*` call once all of its elements (or payload bytes) have been consumed.
    pub fn read_tag(&mut self) -> Result<Tag, Error> {
        self.guard(|r| {
            let tag = match r.peeked.take() {
                Some(tag) => tag,
                None => {
                    r.check_can_read_tag()?;
                    Tag::decode(&mut r.cursor)?
                }
            };
            trace!(?tag, offset = r.cursor.position(), depth = r.frames.len(), "read tag");

            // Account for the element in the enclosing container
            if let Some(parent) = r.frames.last_mut() {
                parent.remaining -= 1;
            }

            // Open a frame for compound objects
            let frame = match tag {
                Tag::Array(count) => Some((FrameKind::Array, count as u64)),
                Tag::Map(count) => Some((FrameKind::Map, 2 * count as u64)),
                Tag::Str(len) => Some((FrameKind::Str, len as u64)),
                Tag::Bin(len) => Some((FrameKind::Bin, len as u64)),
                Tag::Ext(_, len) => Some((FrameKind::Ext, len as u64)),
                _ => None,
            };
            if let Some((kind, remaining)) = frame {
                r.frames.push(Frame { kind, remaining });
            }
            Ok(tag)
        })
    }

    /// Payload bytes still owed by the innermost frame, which must be a str, bin, or ext.
    pub(crate) fn payload_remaining(&self) -> Result<u64, Error> {
        match self.frames.last() {
            Some(frame) if !frame.kind.is_container() => Ok(frame.remaining),
            _ => Err(Error::TypeMismatch),
        }
    }

    /// Copies up to `dest.len()` payload bytes of the innermost str, bin, or ext into `dest`,
    /// returning how many were copied (zero once the payload is exhausted).
    ///
    /// May be called repeatedly to stream a large payload in fixed-size chunks.
    pub fn read_bytes_into(&mut self, dest: &mut [u8]) -> Result<usize, Error> {
        self.guard(|r| {
            let remaining = r.payload_remaining()?;
            let len = dest.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
            r.cursor.copy_into(&mut dest[..len])?;
            if let Some(frame) = r.frames.last_mut() {
                frame.remaining -= len as u64;
            }
            Ok(len)
        })
    }

    /// Consumes the remaining payload bytes of the innermost str, bin, or ext without copying.
    pub fn skip_bytes(&mut self) -> Result<(), Error> {
        self.guard(|r| {
            let remaining = r.payload_remaining()?;
            let len = usize::try_from(remaining).map_err(|_| Error::Io)?;
            r.cursor.skip(len)?;
            if let Some(frame) = r.frames.last_mut() {
                frame.remaining = 0;
            }
            Ok(())
        })
    }

    /// Pops the innermost frame if it is of `kind` and owes nothing.
    fn done(&mut self, kind: FrameKind) -> Result<(), Error> {
        self.guard(|r| {
            let Some(frame) = r.frames.last() else {
                debug!(?kind, "no open frame to close");
                return Err(Error::TypeMismatch);
            };
            if frame.kind != kind {
                debug!(expected = ?kind, found = ?frame.kind, "closing frame of wrong kind");
                return Err(Error::TypeMismatch);
            }
            if frame.remaining != 0 {
                debug!(?kind, remaining = frame.remaining, "closing frame early");
                return Err(Error::InvalidEncoding);
            }
            r.frames.pop();
            Ok(())
        })
    }

    /// Closes the innermost array once all of its elements were read.
    pub fn done_array(&mut self) -> Result<(), Error> {
        self.done(FrameKind::Array)
    }

    /// Closes the innermost map once all of its keys and values were read.
    pub fn done_map(&mut self) -> Result<(), Error> {
        self.done(FrameKind::Map)
    }

    /// Closes the innermost string once its payload was consumed.
    pub fn done_str(&mut self) -> Result<(), Error> {
        self.done(FrameKind::Str)
    }

    /// Closes the innermost binary once its payload was consumed.
    pub fn done_bin(&mut self) -> Result<(), Error> {
        self.done(FrameKind::Bin)
    }

    /// Closes the innermost extension once its payload was consumed.
    pub fn done_ext(&mut self) -> Result<(), Error> {
        self.done(FrameKind::Ext)
    }

    /// Reads and throws away the next complete object, including everything nested inside it.
    pub fn discard(&mut self) -> Result<(), Error> {
        self.guard(|r| {
            let base = r.frames.len();
            r.discard_one()?;

            // Drain nested containers without recursing
            while r.frames.len() > base {
                let owed = r.frames.last().map_or(0, |frame| frame.remaining);
                if owed == 0 {
                    r.frames.pop();
                } else {
                    r.discard_one()?;
                }
            }
            Ok(())
        })
    }

    /// Reads one tag, skipping (and closing) any payload it carries.
    fn discard_one(&mut self) -> Result<(), Error> {
        match self.read_tag()? {
            Tag::Str(_) | Tag::Bin(_) | Tag::Ext(..) => {
                self.skip_bytes()?;
                self.frames.pop();
            }
            _ => {}
        }
        Ok(())
    }

    /// Allocates a buffer for, and consumes, the remaining payload of the innermost str, bin, or
    /// ext (leaving the frame open).
    pub(crate) fn read_payload(&mut self) -> Result<Vec<u8>, Error> {
        self.guard(|r| {
            let remaining = r.payload_remaining()?;
            let len = usize::try_from(remaining).map_err(|_| Error::OutOfMemory)?;

            // Refuse to allocate for bytes the source cannot supply
            r.cursor.at_least(len)?;
            let mut buf = r.alloc.allocate(len)?;
            let read = r.read_bytes_into(&mut buf)?;
            debug_assert_eq!(read, len);
            Ok(buf)
        })
    }

    /// Consumes the reader, returning the recorded error (if any).
    ///
    /// A reader destroyed with frames still open, or with a peeked tag that was never read,
    /// reports [Error::Other].
    pub fn destroy(self) -> Result<(), Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if let Some(tag) = self.peeked {
            warn!(?tag, "reader destroyed with unread peeked tag");
            return Err(Error::Other);
        }
        if !self.frames.is_empty() {
            warn!(open = self.frames.len(), "reader destroyed with open frames");
            return Err(Error::Other);
        }
        Ok(())
    }

    /// Returns the byte source, positioned after the last consumed byte.
    pub fn into_inner(self) -> B {
        self.cursor.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::Budget;
    use commonware_macros::test_traced;

    #[test]
    fn test_peek_then_read() {
        let mut reader = Reader::new(&[0xccu8, 0xf0, 0x01][..]);
        assert_eq!(reader.peek_tag().unwrap(), Tag::UInt(240));
        assert_eq!(reader.peek_tag().unwrap(), Tag::UInt(240));
        assert_eq!(reader.depth(), 0);
        assert_eq!(reader.read_tag().unwrap(), Tag::UInt(240));
        assert_eq!(reader.read_tag().unwrap(), Tag::UInt(1));
        assert!(reader.destroy().is_ok());
    }

    #[test]
    fn test_peek_opens_no_frame() {
        let mut reader = Reader::new(&[0x92u8, 0x01, 0x02][..]);
        assert_eq!(reader.peek_tag().unwrap(), Tag::Array(2));
        assert_eq!(reader.depth(), 0);
        assert_eq!(reader.read_tag().unwrap(), Tag::Array(2));
        assert_eq!(reader.depth(), 1);
        reader.read_tag().unwrap();
        reader.read_tag().unwrap();
        reader.done_array().unwrap();
        assert!(reader.destroy().is_ok());
    }

    #[test]
    fn test_nested_frames() {
        // [[1], {"a": nil}]
        let data = [0x92, 0x91, 0x01, 0x81, 0xa1, b'a', 0xc0];
        let mut reader = Reader::new(&data[..]);
        assert_eq!(reader.read_tag().unwrap(), Tag::Array(2));
        assert_eq!(reader.read_tag().unwrap(), Tag::Array(1));
        assert_eq!(reader.read_tag().unwrap(), Tag::UInt(1));
        reader.done_array().unwrap();
        assert_eq!(reader.read_tag().unwrap(), Tag::Map(1));
        assert_eq!(reader.read_tag().unwrap(), Tag::Str(1));
        let mut key = [0u8; 1];
        assert_eq!(reader.read_bytes_into(&mut key).unwrap(), 1);
        assert_eq!(&key, b"a");
        reader.done_str().unwrap();
        assert_eq!(reader.read_tag().unwrap(), Tag::Nil);
        reader.done_map().unwrap();
        reader.done_array().unwrap();
        assert_eq!(reader.depth(), 0);
        assert!(reader.destroy().is_ok());
    }

    #[test]
    fn test_map_closes_only_after_all_entries() {
        // {1: 2, 3: 4}
        let data = [0x82u8, 0x01, 0x02, 0x03, 0x04];
        let mut reader = Reader::new(&data[..]);
        assert_eq!(reader.read_tag().unwrap(), Tag::Map(2));
        for _ in 0..3 {
            reader.read_tag().unwrap();
        }
        assert!(matches!(reader.done_map(), Err(Error::InvalidEncoding)));

        let mut reader = Reader::new(&data[..]);
        reader.read_tag().unwrap();
        for _ in 0..4 {
            reader.read_tag().unwrap();
        }
        reader.done_map().unwrap();
        assert!(reader.destroy().is_ok());
    }

    #[test]
    fn test_read_past_container_end() {
        let data = [0x91u8, 0x01, 0x02];
        let mut reader = Reader::new(&data[..]);
        reader.read_tag().unwrap();
        reader.read_tag().unwrap();
        assert!(matches!(reader.read_tag(), Err(Error::TypeMismatch)));
    }

    #[test]
    fn test_done_wrong_kind() {
        let mut reader = Reader::new(&[0x90u8][..]);
        reader.read_tag().unwrap();
        assert!(matches!(reader.done_map(), Err(Error::TypeMismatch)));
        assert!(matches!(reader.done_array(), Err(Error::TypeMismatch)));
    }

    #[test]
    fn test_done_without_frame() {
        let mut reader = Reader::new(&[0u8; 0][..]);
        assert!(matches!(reader.done_str(), Err(Error::TypeMismatch)));
    }

    #[test]
    fn test_chunked_payload() {
        let mut data = vec![0xc4, 10];
        data.extend(0u8..10);
        let mut reader = Reader::new(&data[..]);
        assert_eq!(reader.read_tag().unwrap(), Tag::Bin(10));
        let mut out = Vec::new();
        let mut chunk = [0u8; 4];
        loop {
            let n = reader.read_bytes_into(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(out, (0u8..10).collect::<Vec<_>>());
        reader.done_bin().unwrap();
        assert!(reader.destroy().is_ok());
    }

    #[test]
    fn test_payload_must_be_consumed() {
        let mut reader = Reader::new(&[0xa3u8, b'f', b'o', b'o'][..]);
        reader.read_tag().unwrap();
        let mut two = [0u8; 2];
        reader.read_bytes_into(&mut two).unwrap();
        assert!(matches!(reader.done_str(), Err(Error::InvalidEncoding)));
    }

    #[test]
    fn test_tag_inside_payload() {
        let mut reader = Reader::new(&[0xa1u8, 0x01][..]);
        reader.read_tag().unwrap();
        assert!(matches!(reader.read_tag(), Err(Error::TypeMismatch)));
    }

    #[test]
    fn test_read_bytes_without_frame() {
        let mut reader = Reader::new(&[0x01u8][..]);
        let mut dest = [0u8; 1];
        assert!(matches!(
            reader.read_bytes_into(&mut dest),
            Err(Error::TypeMismatch)
        ));
    }

    #[test_traced]
    fn test_sticky_error() {
        let mut reader = Reader::new(&[0xc1u8, 0x01, 0x02][..]);
        assert!(matches!(reader.read_tag(), Err(Error::InvalidEncoding)));
        let position = reader.position();

        // Later operations fail the same way without touching the source
        assert!(matches!(reader.read_tag(), Err(Error::InvalidEncoding)));
        assert!(matches!(reader.peek_tag(), Err(Error::InvalidEncoding)));
        assert!(matches!(reader.discard(), Err(Error::InvalidEncoding)));
        assert!(matches!(reader.done_array(), Err(Error::InvalidEncoding)));
        assert_eq!(reader.position(), position);
        assert_eq!(reader.error(), Some(Error::InvalidEncoding));
        assert!(matches!(reader.destroy(), Err(Error::InvalidEncoding)));
    }

    #[test]
    fn test_poison_keeps_first_error() {
        let mut reader = Reader::new(&[0x01u8][..]);
        assert_eq!(reader.poison(Error::TypeMismatch), Error::TypeMismatch);
        assert_eq!(reader.poison(Error::Io), Error::TypeMismatch);
        assert!(matches!(reader.read_tag(), Err(Error::TypeMismatch)));
    }

    #[test]
    fn test_underflow_is_io() {
        let mut reader = Reader::new(&[0xcdu8, 0x01][..]);
        assert!(matches!(reader.read_tag(), Err(Error::Io)));
    }

    #[test]
    fn test_discard_scalar_and_nested() {
        // ["ab", {1: [true, nil]}, 0xc4 bin], then 7
        let data = [
            0x93, 0xa2, b'a', b'b', 0x81, 0x01, 0x92, 0xc3, 0xc0, 0xc4, 0x02, 0xff, 0xff, 0x07,
        ];
        let mut reader = Reader::new(&data[..]);
        reader.discard().unwrap();
        assert_eq!(reader.depth(), 0);
        assert_eq!(reader.read_tag().unwrap(), Tag::UInt(7));
        assert!(reader.destroy().is_ok());
    }

    #[test]
    fn test_discard_within_container() {
        // [1, "x", 3]
        let data = [0x93, 0x01, 0xa1, b'x', 0x03];
        let mut reader = Reader::new(&data[..]);
        reader.read_tag().unwrap();
        reader.discard().unwrap();
        reader.discard().unwrap();
        assert_eq!(reader.read_tag().unwrap(), Tag::UInt(3));
        reader.done_array().unwrap();
        assert!(reader.destroy().is_ok());
    }

    #[test]
    fn test_discard_after_peek() {
        let data = [0x91u8, 0x05, 0x06];
        let mut reader = Reader::new(&data[..]);
        assert_eq!(reader.peek_tag().unwrap(), Tag::Array(1));
        reader.discard().unwrap();
        assert_eq!(reader.read_tag().unwrap(), Tag::UInt(6));
    }

    #[test]
    fn test_discard_empty_containers() {
        let data = [0x90u8, 0x80, 0xa0, 0x01];
        let mut reader = Reader::new(&data[..]);
        reader.discard().unwrap();
        reader.discard().unwrap();
        reader.discard().unwrap();
        assert_eq!(reader.read_tag().unwrap(), Tag::UInt(1));
        assert!(reader.destroy().is_ok());
    }

    #[test]
    fn test_discard_truncated() {
        let data = [0x92u8, 0x01];
        let mut reader = Reader::new(&data[..]);
        assert!(matches!(reader.discard(), Err(Error::Io)));
    }

    #[test]
    fn test_destroy_with_open_frame() {
        let mut reader = Reader::new(&[0x91u8, 0x01][..]);
        reader.read_tag().unwrap();
        assert!(matches!(reader.destroy(), Err(Error::Other)));
    }

    #[test]
    fn test_destroy_with_peeked_tag() {
        let mut reader = Reader::new(&[0x07u8][..]);
        assert_eq!(reader.peek_tag().unwrap(), Tag::UInt(7));
        assert!(matches!(reader.destroy(), Err(Error::Other)));

        let mut reader = Reader::new(&[0x07u8][..]);
        reader.peek_tag().unwrap();
        reader.read_tag().unwrap();
        assert!(reader.destroy().is_ok());
    }

    #[test]
    fn test_read_payload_refuses_missing_bytes() {
        // str32 claiming 4 GiB with nothing behind it
        let data = [0xdbu8, 0xff, 0xff, 0xff, 0xff];
        let mut reader = Reader::with_allocator(&data[..], Budget::new(usize::MAX));
        reader.read_tag().unwrap();
        assert!(matches!(reader.read_payload(), Err(Error::Io)));
    }

    #[test]
    fn test_into_inner_returns_unread_bytes() {
        let data = [0x01u8, 0xa1, b'z', 0xc0];
        let mut reader = Reader::new(&data[..]);
        reader.read_tag().unwrap();
        assert_eq!(reader.position(), 1);
        assert_eq!(reader.into_inner(), &data[1..]);
    }
}
