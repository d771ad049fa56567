//! [Reflect] implementations for Rust primitive types.
//!
//! Integers are read through the ranged `expect_*` operations with the full range of the target
//! width, so a value that does not fit is a [Error::TypeMismatch] no matter how wide the wire
//! encoding was. The narrowing cast afterwards cannot lose information.

use super::{Reflect, Shape};
use crate::{alloc::Allocator, Error, Reader, ReflectCfg, Tag};
use bytes::Buf;

impl Reflect for () {
    const SHAPE: Shape = Shape::Nil;

    fn read_reflect(
        reader: &mut Reader<impl Buf, impl Allocator>,
        _: &ReflectCfg,
    ) -> Result<Self, Error> {
        reader.expect_nil()
    }
}

impl Reflect for bool {
    const SHAPE: Shape = Shape::Bool;

    fn read_reflect(
        reader: &mut Reader<impl Buf, impl Allocator>,
        _: &ReflectCfg,
    ) -> Result<Self, Error> {
        reader.expect_bool()
    }
}

macro_rules! impl_int {
    ($type:ty, $domain:ty, $expect:ident, $signed:expr) => {
        impl Reflect for $type {
            const SHAPE: Shape = Shape::Int {
                bits: <$type>::BITS,
                signed: $signed,
            };

            #[inline]
            fn read_reflect(
                reader: &mut Reader<impl Buf, impl Allocator>,
                _: &ReflectCfg,
            ) -> Result<Self, Error> {
                const MIN: $domain = <$type>::MIN as $domain;
                const MAX: $domain = <$type>::MAX as $domain;
                Ok(reader.$expect(MIN..=MAX)? as $type)
            }
        }
    };
}

impl_int!(u8, u64, expect_uint, false);
impl_int!(u16, u64, expect_uint, false);
impl_int!(u32, u64, expect_uint, false);
impl_int!(u64, u64, expect_uint, false);
impl_int!(i8, i64, expect_int, true);
impl_int!(i16, i64, expect_int, true);
impl_int!(i32, i64, expect_int, true);
impl_int!(i64, i64, expect_int, true);

impl Reflect for f32 {
    const SHAPE: Shape = Shape::Float { bits: 32 };

    fn read_reflect(
        reader: &mut Reader<impl Buf, impl Allocator>,
        _: &ReflectCfg,
    ) -> Result<Self, Error> {
        reader.expect_float()
    }
}

impl Reflect for f64 {
    const SHAPE: Shape = Shape::Float { bits: 64 };

    fn read_reflect(
        reader: &mut Reader<impl Buf, impl Allocator>,
        _: &ReflectCfg,
    ) -> Result<Self, Error> {
        reader.expect_double()
    }
}

impl<T: Reflect> Reflect for Option<T> {
    const SHAPE: Shape = Shape::Optional;

    fn absent() -> Option<Self> {
        Some(None)
    }

    fn read_reflect(
        reader: &mut Reader<impl Buf, impl Allocator>,
        cfg: &ReflectCfg,
    ) -> Result<Self, Error> {
        if reader.peek_tag()? == Tag::Nil {
            reader.expect_nil()?;
            return Ok(None);
        }
        Ok(Some(T::read_reflect(reader, cfg)?))
    }
}
