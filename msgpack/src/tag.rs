//! MessagePack object headers.
//!
//! Every MessagePack object starts with a format-selector byte. Depending on the selector, the
//! header continues with a big-endian value or length field (and, for extensions, a type byte).
//! A [Tag] is the decoded header: it fully determines how many sub-elements or payload bytes must
//! be consumed before the stream can advance past the object.
//!
//! Ref: <https://github.com/msgpack/msgpack/blob/master/spec.md#formats>

use crate::{cursor::ByteCursor, Error};
use bytes::Buf;
use tracing::debug;

// Format-selector bytes.
pub(crate) const POSFIXINT_MAX: u8 = 0x7f;
pub(crate) const FIXMAP_MIN: u8 = 0x80;
pub(crate) const FIXMAP_MAX: u8 = 0x8f;
pub(crate) const FIXARRAY_MIN: u8 = 0x90;
pub(crate) const FIXARRAY_MAX: u8 = 0x9f;
pub(crate) const FIXSTR_MIN: u8 = 0xa0;
pub(crate) const FIXSTR_MAX: u8 = 0xbf;
pub(crate) const NIL: u8 = 0xc0;
pub(crate) const FALSE: u8 = 0xc2;
pub(crate) const TRUE: u8 = 0xc3;
pub(crate) const BIN8: u8 = 0xc4;
pub(crate) const BIN16: u8 = 0xc5;
pub(crate) const BIN32: u8 = 0xc6;
pub(crate) const EXT8: u8 = 0xc7;
pub(crate) const EXT16: u8 = 0xc8;
pub(crate) const EXT32: u8 = 0xc9;
pub(crate) const FLOAT32: u8 = 0xca;
pub(crate) const FLOAT64: u8 = 0xcb;
pub(crate) const UINT8: u8 = 0xcc;
pub(crate) const UINT16: u8 = 0xcd;
pub(crate) const UINT32: u8 = 0xce;
pub(crate) const UINT64: u8 = 0xcf;
pub(crate) const INT8: u8 = 0xd0;
pub(crate) const INT16: u8 = 0xd1;
pub(crate) const INT32: u8 = 0xd2;
pub(crate) const INT64: u8 = 0xd3;
pub(crate) const FIXEXT1: u8 = 0xd4;
pub(crate) const FIXEXT2: u8 = 0xd5;
pub(crate) const FIXEXT4: u8 = 0xd6;
pub(crate) const FIXEXT8: u8 = 0xd7;
pub(crate) const FIXEXT16: u8 = 0xd8;
pub(crate) const STR8: u8 = 0xd9;
pub(crate) const STR16: u8 = 0xda;
pub(crate) const STR32: u8 = 0xdb;
pub(crate) const ARRAY16: u8 = 0xdc;
pub(crate) const ARRAY32: u8 = 0xdd;
pub(crate) const MAP16: u8 = 0xde;
pub(crate) const MAP32: u8 = 0xdf;
pub(crate) const NEGFIXINT_MIN: u8 = 0xe0;

/// A decoded MessagePack object header.
///
/// Positive fixints and the `uint` family decode to [Tag::UInt]; negative fixints and the `int`
/// family decode to [Tag::Int] (so a non-negative value written with an `int` selector is still
/// an [Tag::Int]).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tag {
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    /// A string of `len` payload bytes.
    Str(u32),
    /// A binary blob of `len` payload bytes.
    Bin(u32),
    /// An array of `count` elements.
    Array(u32),
    /// A map of `count` key/value pairs.
    Map(u32),
    /// An extension of type `kind` with `len` payload bytes.
    Ext(i8, u32),
}

impl Tag {
    /// Returns true if the tag must be closed with a matching `done_*` call after reading it.
    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            Tag::Str(_) | Tag::Bin(_) | Tag::Array(_) | Tag::Map(_) | Tag::Ext(..)
        )
    }

    /// Decodes the next header from `cursor`.
    pub(crate) fn decode<B: Buf>(cursor: &mut ByteCursor<B>) -> Result<Self, Error> {
        let selector = cursor.next_u8()?;
        let tag = match selector {
            0x00..=POSFIXINT_MAX => Tag::UInt(selector as u64),
            FIXMAP_MIN..=FIXMAP_MAX => Tag::Map((selector & 0x0f) as u32),
            FIXARRAY_MIN..=FIXARRAY_MAX => Tag::Array((selector & 0x0f) as u32),
            FIXSTR_MIN..=FIXSTR_MAX => Tag::Str((selector & 0x1f) as u32),
            NIL => Tag::Nil,
            FALSE => Tag::Bool(false),
            TRUE => Tag::Bool(true),
            BIN8 => Tag::Bin(cursor.next_u8()? as u32),
            BIN16 => Tag::Bin(u16::from_be_bytes(cursor.next()?) as u32),
            BIN32 => Tag::Bin(u32::from_be_bytes(cursor.next()?)),
            EXT8 => {
                let len = cursor.next_u8()? as u32;
                Tag::Ext(cursor.next_u8()? as i8, len)
            }
            EXT16 => {
                let len = u16::from_be_bytes(cursor.next()?) as u32;
                Tag::Ext(cursor.next_u8()? as i8, len)
            }
            EXT32 => {
                let len = u32::from_be_bytes(cursor.next()?);
                Tag::Ext(cursor.next_u8()? as i8, len)
            }
            FLOAT32 => Tag::Float(f32::from_be_bytes(cursor.next()?)),
            FLOAT64 => Tag::Double(f64::from_be_bytes(cursor.next()?)),
            UINT8 => Tag::UInt(cursor.next_u8()? as u64),
            UINT16 => Tag::UInt(u16::from_be_bytes(cursor.next()?) as u64),
            UINT32 => Tag::UInt(u32::from_be_bytes(cursor.next()?) as u64),
            UINT64 => Tag::UInt(u64::from_be_bytes(cursor.next()?)),
            INT8 => Tag::Int(cursor.next_u8()? as i8 as i64),
            INT16 => Tag::Int(i16::from_be_bytes(cursor.next()?) as i64),
            INT32 => Tag::Int(i32::from_be_bytes(cursor.next()?) as i64),
            INT64 => Tag::Int(i64::from_be_bytes(cursor.next()?)),
            FIXEXT1 => Tag::Ext(cursor.next_u8()? as i8, 1),
            FIXEXT2 => Tag::Ext(cursor.next_u8()? as i8, 2),
            FIXEXT4 => Tag::Ext(cursor.next_u8()? as i8, 4),
            FIXEXT8 => Tag::Ext(cursor.next_u8()? as i8, 8),
            FIXEXT16 => Tag::Ext(cursor.next_u8()? as i8, 16),
            STR8 => Tag::Str(cursor.next_u8()? as u32),
            STR16 => Tag::Str(u16::from_be_bytes(cursor.next()?) as u32),
            STR32 => Tag::Str(u32::from_be_bytes(cursor.next()?)),
            ARRAY16 => Tag::Array(u16::from_be_bytes(cursor.next()?) as u32),
            ARRAY32 => Tag::Array(u32::from_be_bytes(cursor.next()?)),
            MAP16 => Tag::Map(u16::from_be_bytes(cursor.next()?) as u32),
            MAP32 => Tag::Map(u32::from_be_bytes(cursor.next()?)),
            NEGFIXINT_MIN..=0xff => Tag::Int(selector as i8 as i64),
            _ => {
                // 0xc1 is the only selector MessagePack never assigns.
                debug!(
                    selector,
                    offset = cursor.position() - 1,
                    "unknown format selector"
                );
                return Err(Error::InvalidEncoding);
            }
        };
        Ok(tag)
    }
}
