//! [Reflect] implementations for text and byte sequences.
//!
//! [String] always means a `str` object with valid UTF-8. [Bytes] is the ambiguous target: the
//! wire form it accepts is chosen by [ReflectCfg::bytes_style].

use super::{Reflect, Shape};
use crate::{alloc::Allocator, BytesStyle, Error, Reader, ReflectCfg, Tag};
use bytes::{Buf, Bytes};
use tracing::debug;

impl Reflect for String {
    const SHAPE: Shape = Shape::Str;

    fn read_reflect(
        reader: &mut Reader<impl Buf, impl Allocator>,
        _: &ReflectCfg,
    ) -> Result<Self, Error> {
        reader.expect_string()
    }
}

impl Reflect for Bytes {
    const SHAPE: Shape = Shape::Bytes;

    fn read_reflect(
        reader: &mut Reader<impl Buf, impl Allocator>,
        cfg: &ReflectCfg,
    ) -> Result<Self, Error> {
        let Some(style) = cfg.bytes_style else {
            debug!("no bytes style configured for byte sequence");
            return Err(reader.poison(Error::Other));
        };
        let as_str = match style {
            BytesStyle::Str => true,
            BytesStyle::Bin => false,
            BytesStyle::Any => matches!(reader.peek_tag()?, Tag::Str(_)),
        };
        if !as_str {
            return Ok(Bytes::from(reader.expect_bin_owned()?));
        }
        let payload = reader.expect_str_owned()?;
        if cfg.validate_utf8 {
            if let Err(err) = std::str::from_utf8(&payload) {
                debug!(valid_up_to = err.valid_up_to(), "invalid utf-8 in str");
                return Err(reader.poison(Error::InvalidEncoding));
            }
        }
        Ok(Bytes::from(payload))
    }
}
