//! Type-directed decoding.
//!
//! A type implementing [Reflect] describes its wire [Shape] and knows how to read itself from a
//! [Reader] through the `expect_*` operations. Decoding is recursive: a struct reads its fields,
//! an `Option` reads its inner value, and so on. The first failure anywhere aborts the whole
//! decode; partial values are never returned.
//!
//! Ambiguous choices (struct and enum wire shapes, how to read byte sequences, UTF-8 strictness)
//! are settled by a [ReflectCfg] passed through every nested read.
//!
//! Structs and enums are registered with [crate::reflect_struct] and [crate::reflect_enum].

mod collections;
mod composite;
mod payload;
mod primitives;

pub use composite::{read_enum, read_struct};

use crate::{alloc::Allocator, Error, ReflectCfg, Reader};
use bytes::Buf;

/// A struct field as seen by the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    /// Name matched against map keys.
    pub name: &'static str,
    /// Whether the field may be missing from a map-encoded struct.
    pub optional: bool,
}

/// An enum variant as seen by the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Variant {
    /// Name matched (case-sensitively) against string-encoded enums.
    pub name: &'static str,
    /// Discriminant matched against integer-encoded enums.
    pub ordinal: i64,
}

/// Wire shape of a [Reflect] type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Nil,
    Bool,
    Int { bits: u32, signed: bool },
    Float { bits: u32 },
    /// Nil for absence, otherwise the inner shape.
    Optional,
    Str,
    /// A byte sequence read according to [ReflectCfg::bytes_style].
    Bytes,
    /// An array with an exact length, or any length when `None`.
    Array { len: Option<usize> },
    Map,
    Struct {
        name: &'static str,
        fields: &'static [Field],
    },
    Enum {
        name: &'static str,
        variants: &'static [Variant],
    },
    Ext,
}

/// Trait for types that can be decoded from a [Reader] by their shape.
pub trait Reflect: Sized {
    /// The wire shape of this type.
    const SHAPE: Shape;

    /// The value to use when a map-encoded struct omits a field of this type.
    ///
    /// `None` (the default) makes the field required.
    fn absent() -> Option<Self> {
        None
    }

    /// Reads a value from `reader`, consulting `cfg` where the wire shape is ambiguous.
    fn read_reflect(
        reader: &mut Reader<impl Buf, impl Allocator>,
        cfg: &ReflectCfg,
    ) -> Result<Self, Error>;
}

impl<B: Buf, A: Allocator> Reader<B, A> {
    /// Reads a value of type `T`.
    pub fn expect_reflect<T: Reflect>(&mut self, cfg: &ReflectCfg) -> Result<T, Error> {
        self.guard(|r| T::read_reflect(r, cfg))
    }
}

/// Decodes exactly one value of type `T` from `buf`.
///
/// Fails with [Error::Other] if bytes remain after the value.
///
/// # Example
///
/// ```
/// use commonware_msgpack::{decode, ReflectCfg};
///
/// let value: Vec<i32> = decode(&[0x93u8, 0x01, 0xff, 0xd1, 0xf2, 0x06][..], &ReflectCfg::default()).unwrap();
/// assert_eq!(value, vec![1, -1, -3578]);
/// ```
pub fn decode<T: Reflect>(buf: impl Buf, cfg: &ReflectCfg) -> Result<T, Error> {
    let mut reader = Reader::new(buf);
    let value = reader.expect_reflect(cfg)?;
    if reader.remaining() > 0 {
        let extra = reader.remaining();
        tracing::debug!(extra, "extra data after value");
        return Err(reader.poison(Error::Other));
    }
    reader.destroy()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_trailing() {
        let cfg = ReflectCfg::default();
        assert_eq!(decode::<u8>(&[0x07u8][..], &cfg).unwrap(), 7);
        assert!(matches!(decode::<u8>(&[0x07u8, 0x08][..], &cfg), Err(Error::Other)));
        assert!(matches!(decode::<u8>(&[0u8; 0][..], &cfg), Err(Error::Io)));
    }

    #[test]
    fn test_shapes() {
        assert_eq!(<u8 as Reflect>::SHAPE, Shape::Int { bits: 8, signed: false });
        assert_eq!(<i64 as Reflect>::SHAPE, Shape::Int { bits: 64, signed: true });
        assert_eq!(<Option<bool> as Reflect>::SHAPE, Shape::Optional);
        assert_eq!(<[u16; 3] as Reflect>::SHAPE, Shape::Array { len: Some(3) });
        assert_eq!(<Vec<u16> as Reflect>::SHAPE, Shape::Array { len: None });
        assert_eq!(<String as Reflect>::SHAPE, Shape::Str);
    }
}
