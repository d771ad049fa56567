//! Typed reads.
//!
//! Each `expect_*` operation reads one tag and checks both its kind and (for numbers) its value.
//! A value outside the requested range is a [Error::TypeMismatch] regardless of the wire width it
//! was written with: nothing is ever truncated or sign-wrapped.

use crate::{alloc::Allocator, Error, RangeCfg, Reader, Tag};
use bytes::Buf;
use tracing::debug;

impl<B: Buf, A: Allocator> Reader<B, A> {
    /// Reads a nil.
    pub fn expect_nil(&mut self) -> Result<(), Error> {
        self.guard(|r| match r.read_tag()? {
            Tag::Nil => Ok(()),
            tag => mismatch("nil", tag),
        })
    }

    /// Reads a boolean. Integers are never coerced.
    pub fn expect_bool(&mut self) -> Result<bool, Error> {
        self.guard(|r| match r.read_tag()? {
            Tag::Bool(value) => Ok(value),
            tag => mismatch("bool", tag),
        })
    }

    /// Reads an integer that must lie within `range`.
    ///
    /// Accepts both the `uint` and `int` families (a non-negative `int` is a valid unsigned value).
    pub fn expect_uint(&mut self, range: impl Into<RangeCfg<u64>>) -> Result<u64, Error> {
        let range = range.into();
        self.guard(|r| {
            let value = match r.read_tag()? {
                Tag::UInt(value) => value,
                Tag::Int(value) => u64::try_from(value).map_err(|_| {
                    debug!(value, "negative value for unsigned read");
                    Error::TypeMismatch
                })?,
                tag => return mismatch("uint", tag),
            };
            if !range.contains(&value) {
                debug!(value, ?range, "unsigned value out of range");
                return Err(Error::TypeMismatch);
            }
            Ok(value)
        })
    }

    /// Reads an integer that must lie within `range`.
    ///
    /// Accepts both the `uint` and `int` families (a `uint` above [i64::MAX] never fits).
    pub fn expect_int(&mut self, range: impl Into<RangeCfg<i64>>) -> Result<i64, Error> {
        let range = range.into();
        self.guard(|r| {
            let value = match r.read_tag()? {
                Tag::Int(value) => value,
                Tag::UInt(value) => i64::try_from(value).map_err(|_| {
                    debug!(value, "unsigned value too large for signed read");
                    Error::TypeMismatch
                })?,
                tag => return mismatch("int", tag),
            };
            if !range.contains(&value) {
                debug!(value, ?range, "signed value out of range");
                return Err(Error::TypeMismatch);
            }
            Ok(value)
        })
    }

    /// Reads a number as a 64-bit float.
    ///
    /// Integers are converted, losing precision beyond 53 bits. Use
    /// [Reader::expect_double_strict] to reject them instead.
    pub fn expect_double(&mut self) -> Result<f64, Error> {
        self.guard(|r| match r.read_tag()? {
            Tag::Double(value) => Ok(value),
            Tag::Float(value) => Ok(value as f64),
            Tag::Int(value) => Ok(value as f64),
            Tag::UInt(value) => Ok(value as f64),
            tag => mismatch("double", tag),
        })
    }

    /// Reads a float or double as a 64-bit float, rejecting integers.
    pub fn expect_double_strict(&mut self) -> Result<f64, Error> {
        self.guard(|r| match r.read_tag()? {
            Tag::Double(value) => Ok(value),
            Tag::Float(value) => Ok(value as f64),
            tag => mismatch("float or double", tag),
        })
    }

    /// Reads a number as a 32-bit float, with the same conversions as [Reader::expect_double].
    pub fn expect_float(&mut self) -> Result<f32, Error> {
        self.guard(|r| match r.read_tag()? {
            Tag::Float(value) => Ok(value),
            Tag::Double(value) => Ok(value as f32),
            Tag::Int(value) => Ok(value as f32),
            Tag::UInt(value) => Ok(value as f32),
            tag => mismatch("float", tag),
        })
    }

    /// Reads a map header, returning its entry count. The map must be closed with
    /// [Reader::done_map] after reading every key and value.
    pub fn expect_map(&mut self) -> Result<u32, Error> {
        self.guard(|r| match r.read_tag()? {
            Tag::Map(count) => Ok(count),
            tag => mismatch("map", tag),
        })
    }

    /// Reads a map header whose entry count must lie within `range`.
    pub fn expect_map_range(&mut self, range: impl Into<RangeCfg<u32>>) -> Result<u32, Error> {
        let range = range.into();
        self.guard(|r| {
            let count = r.expect_map()?;
            if !range.contains(&count) {
                debug!(count, ?range, "map size out of range");
                return Err(Error::TypeMismatch);
            }
            Ok(count)
        })
    }

    /// Reads an array header, returning its element count. The array must be closed with
    /// [Reader::done_array] after reading every element.
    pub fn expect_array(&mut self) -> Result<u32, Error> {
        self.guard(|r| match r.read_tag()? {
            Tag::Array(count) => Ok(count),
            tag => mismatch("array", tag),
        })
    }

    /// Reads an array header whose element count must lie within `range`.
    pub fn expect_array_range(&mut self, range: impl Into<RangeCfg<u32>>) -> Result<u32, Error> {
        let range = range.into();
        self.guard(|r| {
            let count = r.expect_array()?;
            if !range.contains(&count) {
                debug!(count, ?range, "array size out of range");
                return Err(Error::TypeMismatch);
            }
            Ok(count)
        })
    }

    /// Reads an array header that must declare exactly `count` elements.
    pub fn expect_array_match(&mut self, count: u32) -> Result<(), Error> {
        self.expect_array_range(RangeCfg::exact(count)).map(|_| ())
    }

    /// Reads a string header, returning its payload length.
    ///
    /// The payload is then consumed with [Reader::read_bytes_into] and the string closed with
    /// [Reader::done_str].
    pub fn expect_str_start(&mut self) -> Result<u32, Error> {
        self.guard(|r| match r.read_tag()? {
            Tag::Str(len) => Ok(len),
            tag => mismatch("str", tag),
        })
    }

    /// Reads a binary header, returning its payload length (closed with [Reader::done_bin]).
    pub fn expect_bin_start(&mut self) -> Result<u32, Error> {
        self.guard(|r| match r.read_tag()? {
            Tag::Bin(len) => Ok(len),
            tag => mismatch("bin", tag),
        })
    }

    /// Reads an extension header, returning its type and payload length (closed with
    /// [Reader::done_ext]).
    pub fn expect_ext_start(&mut self) -> Result<(i8, u32), Error> {
        self.guard(|r| match r.read_tag()? {
            Tag::Ext(kind, len) => Ok((kind, len)),
            tag => mismatch("ext", tag),
        })
    }

    /// Reads a complete string into a freshly allocated buffer, without validating its contents.
    pub fn expect_str_owned(&mut self) -> Result<Vec<u8>, Error> {
        self.guard(|r| {
            r.expect_str_start()?;
            let payload = r.read_payload()?;
            r.done_str()?;
            Ok(payload)
        })
    }

    /// Reads a complete string, which must be valid UTF-8.
    ///
    /// The payload is copied before it is validated: on [Error::InvalidEncoding] the string has
    /// been consumed from the stream and its buffer released. Callers that need the raw bytes of
    /// an invalid string should read it with [Reader::expect_str_owned] and validate themselves.
    pub fn expect_string(&mut self) -> Result<String, Error> {
        self.guard(|r| {
            let payload = r.expect_str_owned()?;
            String::from_utf8(payload).map_err(|err| {
                debug!(valid_up_to = err.utf8_error().valid_up_to(), "invalid utf-8 in str");
                Error::InvalidEncoding
            })
        })
    }

    /// Reads a complete binary into a freshly allocated buffer.
    pub fn expect_bin_owned(&mut self) -> Result<Vec<u8>, Error> {
        self.guard(|r| {
            r.expect_bin_start()?;
            let payload = r.read_payload()?;
            r.done_bin()?;
            Ok(payload)
        })
    }

    /// Reads a complete extension, returning its type and a freshly allocated payload.
    pub fn expect_ext_owned(&mut self) -> Result<(i8, Vec<u8>), Error> {
        self.guard(|r| {
            let (kind, _) = r.expect_ext_start()?;
            let payload = r.read_payload()?;
            r.done_ext()?;
            Ok((kind, payload))
        })
    }
}

/// Reports a tag of the wrong kind.
fn mismatch<T>(expected: &'static str, found: Tag) -> Result<T, Error> {
    debug!(expected, ?found, "unexpected tag");
    Err(Error::TypeMismatch)
}
