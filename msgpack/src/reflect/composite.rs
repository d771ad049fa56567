//! Struct and enum decoding.
//!
//! [read_struct] and [read_enum] hold the wire logic; [crate::reflect_struct] and
//! [crate::reflect_enum] declare a type together with a [super::Reflect] implementation that
//! calls them.
//!
//! # Wire Shapes
//!
//! A struct is either a map from field name to value (any order, unknown keys subject to
//! [ReflectCfg::ignore_extra_fields]) or an array of values in declaration order. An enum is either
//! a variant name or a discriminant. When the configuration fixes a shape, any other tag is a
//! [Error::TypeMismatch]; when it does not, the next tag decides.

use super::{Field, Variant};
use crate::{alloc::Allocator, EnumStyle, Error, Reader, ReflectCfg, StructStyle, Tag};
use bytes::Buf;
use tracing::{debug, trace};

/// Reads a struct named `name` with `fields`, calling `read_field` with a field's name when its
/// value is next in the stream.
///
/// Fails if the struct does not match the configured [StructStyle], if a map repeats a key
/// ([Error::InvalidEncoding]), if a map carries an unknown key and extra fields are not ignored, or
/// if a required field is missing.
pub fn read_struct<B: Buf, A: Allocator>(
    reader: &mut Reader<B, A>,
    cfg: &ReflectCfg,
    name: &'static str,
    fields: &'static [Field],
    read_field: impl FnMut(&mut Reader<B, A>, &'static str) -> Result<(), Error>,
) -> Result<(), Error> {
    reader.guard(|r| {
        let style = match cfg.struct_style {
            Some(style) => style,
            None => match r.peek_tag()? {
                Tag::Map(_) => StructStyle::Map,
                Tag::Array(_) => StructStyle::Array,
                tag => {
                    debug!(ty = name, ?tag, "struct is neither a map nor an array");
                    return Err(Error::TypeMismatch);
                }
            },
        };
        trace!(ty = name, ?style, "reading struct");
        match style {
            StructStyle::Map => read_struct_map(r, cfg, name, fields, read_field),
            StructStyle::Array => read_struct_array(r, name, fields, read_field),
        }
    })
}

fn read_struct_map<B: Buf, A: Allocator>(
    reader: &mut Reader<B, A>,
    cfg: &ReflectCfg,
    name: &'static str,
    fields: &'static [Field],
    mut read_field: impl FnMut(&mut Reader<B, A>, &'static str) -> Result<(), Error>,
) -> Result<(), Error> {
    let count = reader.expect_map()?;
    let longest = fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
    let mut seen = vec![false; fields.len()];
    let mut key = Vec::with_capacity(longest);
    for _ in 0..count {
        // Keys that are not strings, or longer than any field name, cannot match
        let index = match reader.peek_tag()? {
            Tag::Str(len) if len as usize <= longest => {
                reader.expect_str_start()?;
                key.resize(len as usize, 0);
                reader.read_bytes_into(&mut key)?;
                reader.done_str()?;
                fields.iter().position(|f| f.name.as_bytes() == key.as_slice())
            }
            _ => {
                reader.discard()?;
                None
            }
        };

        let Some(index) = index else {
            if !cfg.ignore_extra_fields {
                debug!(ty = name, "unknown field");
                return Err(Error::TypeMismatch);
            }
            debug!(ty = name, "skipping unknown field");
            reader.discard()?;
            continue;
        };
        let field = fields[index];
        if seen[index] {
            debug!(ty = name, field = field.name, "duplicate field");
            return Err(Error::InvalidEncoding);
        }
        read_field(reader, field.name)?;
        seen[index] = true;
    }
    reader.done_map()?;

    for (field, seen) in fields.iter().zip(seen) {
        if !seen && !field.optional {
            debug!(ty = name, field = field.name, "missing field");
            return Err(Error::TypeMismatch);
        }
    }
    Ok(())
}

fn read_struct_array<B: Buf, A: Allocator>(
    reader: &mut Reader<B, A>,
    name: &'static str,
    fields: &'static [Field],
    mut read_field: impl FnMut(&mut Reader<B, A>, &'static str) -> Result<(), Error>,
) -> Result<(), Error> {
    let count = u32::try_from(fields.len()).map_err(|_| Error::TypeMismatch)?;
    if let Err(err) = reader.expect_array_match(count) {
        debug!(ty = name, fields = fields.len(), "struct array has wrong length");
        return Err(err);
    }
    for field in fields {
        read_field(reader, field.name)?;
    }
    reader.done_array()
}

/// Reads an enum named `name` with `variants`, returning the ordinal of the variant found.
pub fn read_enum<B: Buf, A: Allocator>(
    reader: &mut Reader<B, A>,
    cfg: &ReflectCfg,
    name: &'static str,
    variants: &'static [Variant],
) -> Result<i64, Error> {
    reader.guard(|r| {
        let style = match cfg.enum_style {
            Some(style) => style,
            None => match r.peek_tag()? {
                Tag::Str(_) => EnumStyle::Names,
                Tag::Int(_) | Tag::UInt(_) => EnumStyle::Ordinals,
                tag => {
                    debug!(ty = name, ?tag, "enum is neither a name nor an ordinal");
                    return Err(Error::TypeMismatch);
                }
            },
        };
        match style {
            EnumStyle::Names => read_enum_name(r, name, variants),
            EnumStyle::Ordinals => read_enum_ordinal(r, name, variants),
        }
    })
}

fn read_enum_name<B: Buf, A: Allocator>(
    reader: &mut Reader<B, A>,
    name: &'static str,
    variants: &'static [Variant],
) -> Result<i64, Error> {
    let len = reader.expect_str_start()? as usize;
    let longest = variants.iter().map(|v| v.name.len()).max().unwrap_or(0);
    if len > longest {
        debug!(ty = name, len, "variant name too long");
        return Err(Error::TypeMismatch);
    }
    let mut buf = vec![0u8; len];
    reader.read_bytes_into(&mut buf)?;
    reader.done_str()?;
    match variants.iter().find(|v| v.name.as_bytes() == buf.as_slice()) {
        Some(variant) => Ok(variant.ordinal),
        None => {
            debug!(ty = name, variant = %String::from_utf8_lossy(&buf), "unknown variant");
            Err(Error::TypeMismatch)
        }
    }
}

fn read_enum_ordinal<B: Buf, A: Allocator>(
    reader: &mut Reader<B, A>,
    name: &'static str,
    variants: &'static [Variant],
) -> Result<i64, Error> {
    let ordinals = variants.iter().map(|v| v.ordinal);
    let (Some(min), Some(max)) = (ordinals.clone().min(), ordinals.max()) else {
        debug!(ty = name, "enum has no variants");
        return Err(Error::TypeMismatch);
    };
    let ordinal = reader.expect_int(min..=max)?;
    if !variants.iter().any(|v| v.ordinal == ordinal) {
        debug!(ty = name, ordinal, "unknown discriminant");
        return Err(Error::TypeMismatch);
    }
    Ok(ordinal)
}

/// Declares a struct and implements [crate::Reflect] for it.
///
/// Every field type must implement [crate::Reflect]. Fields of type `Option<T>` may be omitted from
/// map-encoded input.
///
/// # Example
///
/// ```
/// use commonware_msgpack::{decode, reflect_struct, ReflectCfg};
///
/// reflect_struct! {
///     #[derive(Debug, PartialEq)]
///     pub struct User {
///         pub id: u64,
///         pub username: String,
///         pub email: Option<String>,
///     }
/// }
///
/// // {"username": "user123", "id": 42}
/// let data = [
///     0x82, 0xa8, b'u', b's', b'e', b'r', b'n', b'a', b'm', b'e', 0xa7, b'u', b's', b'e', b'r',
///     b'1', b'2', b'3', 0xa2, b'i', b'd', 0x2a,
/// ];
/// let user: User = decode(&data[..], &ReflectCfg::default()).unwrap();
/// assert_eq!(user, User { id: 42, username: "user123".to_string(), email: None });
/// ```
#[macro_export]
macro_rules! reflect_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$field_meta:meta])* $field_vis:vis $field:ident : $ty:ty ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$field_meta])* $field_vis $field: $ty, )+
        }

        impl $name {
            #[doc(hidden)]
            const REFLECT_FIELDS: &'static [$crate::Field] = &[
                $(
                    $crate::Field {
                        name: stringify!($field),
                        optional: matches!(
                            <$ty as $crate::Reflect>::SHAPE,
                            $crate::Shape::Optional
                        ),
                    },
                )+
            ];
        }

        impl $crate::Reflect for $name {
            const SHAPE: $crate::Shape = $crate::Shape::Struct {
                name: stringify!($name),
                fields: Self::REFLECT_FIELDS,
            };

            fn read_reflect(
                reader: &mut $crate::Reader<impl $crate::bytes::Buf, impl $crate::Allocator>,
                cfg: &$crate::ReflectCfg,
            ) -> ::core::result::Result<Self, $crate::Error> {
                $( let mut $field: ::core::option::Option<$ty> = None; )+
                $crate::read_struct(
                    reader,
                    cfg,
                    stringify!($name),
                    Self::REFLECT_FIELDS,
                    |reader, field| {
                        $(
                            if field == stringify!($field) {
                                $field = Some(<$ty as $crate::Reflect>::read_reflect(reader, cfg)?);
                                return Ok(());
                            }
                        )+
                        Ok(())
                    },
                )?;
                Ok(Self {
                    $(
                        $field: match $field.or_else(<$ty as $crate::Reflect>::absent) {
                            Some(value) => value,
                            None => return Err(reader.poison($crate::Error::TypeMismatch)),
                        },
                    )+
                })
            }
        }
    };
}

/// Declares a fieldless enum with explicit discriminants and implements [crate::Reflect] for it.
///
/// # Example
///
/// ```
/// use commonware_msgpack::{decode, reflect_enum, ReflectCfg};
///
/// reflect_enum! {
///     #[derive(Debug, PartialEq)]
///     pub enum Color {
///         Red = 0,
///         Green = 1,
///         Blue = 7,
///     }
/// }
///
/// let cfg = ReflectCfg::default();
/// assert_eq!(decode::<Color>(&b"\xa5Green"[..], &cfg).unwrap(), Color::Green);
/// assert_eq!(decode::<Color>(&[0x07u8][..], &cfg).unwrap(), Color::Blue);
/// ```
#[macro_export]
macro_rules! reflect_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$variant_meta:meta])* $variant:ident = $ordinal:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $( $(#[$variant_meta])* $variant = $ordinal, )+
        }

        impl $name {
            #[doc(hidden)]
            const REFLECT_VARIANTS: &'static [$crate::Variant] = &[
                $( $crate::Variant { name: stringify!($variant), ordinal: $ordinal }, )+
            ];
        }

        impl $crate::Reflect for $name {
            const SHAPE: $crate::Shape = $crate::Shape::Enum {
                name: stringify!($name),
                variants: Self::REFLECT_VARIANTS,
            };

            fn read_reflect(
                reader: &mut $crate::Reader<impl $crate::bytes::Buf, impl $crate::Allocator>,
                cfg: &$crate::ReflectCfg,
            ) -> ::core::result::Result<Self, $crate::Error> {
                let ordinal =
                    $crate::read_enum(reader, cfg, stringify!($name), Self::REFLECT_VARIANTS)?;
                $(
                    if ordinal == $ordinal {
                        return Ok(Self::$variant);
                    }
                )+
                Err(reader.poison($crate::Error::TypeMismatch))
            }
        }
    };
}
