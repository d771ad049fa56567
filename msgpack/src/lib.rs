//! Decode MessagePack from untrusted input.
//!
//! # Overview
//!
//! A pull-based decoder built in three layers:
//! - [Reader]: reads one [Tag] at a time, tracking every open array, map, string, binary, and
//!   extension on an explicit frame stack.
//! - Typed expectations (`expect_*` on [Reader]): read one value and check its kind and range.
//! - Reflection ([Reflect]): read a whole Rust value directed by its type.
//!
//! The caller drives decoding in the order values were written. Nothing is buffered beyond the
//! current header, so a reader works equally well over a slice, a [bytes::Bytes], or a chain of
//! buffers filled from a socket.
//!
//! # Safety Properties
//!
//! - Integers are never truncated or sign-wrapped: a value outside the requested range is a
//!   [Error::TypeMismatch].
//! - Declared lengths are checked against the bytes actually available before any allocation, and
//!   all owned buffers come from an [Allocator] (see [Budget] for a capped one).
//! - Errors are sticky: after the first failure every operation returns the same [Error].
//! - [Reader::discard] skips arbitrarily nested input without recursion.
//!
//! # Supported Types
//!
//! [Reflect] is implemented for:
//! - Primitives: `()`, `bool`, `u8`, `u16`, `u32`, `u64`, `i8`, `i16`, `i32`, `i64`, `f32`, `f64`
//! - Text and bytes: `String`, [bytes::Bytes] (see [BytesStyle])
//! - Collections: `Option<T>`, `Vec<T>`, `[T; N]`, tuples, `BTreeMap<K, V>`, `HashMap<K, V>`
//! - Extensions: [Timestamp]
//! - Structs and enums declared with [reflect_struct] and [reflect_enum]
//!
//! # Example
//!
//! ```
//! use commonware_msgpack::{Reader, Tag};
//!
//! // [1, "hi", nil]
//! let data = [0x93u8, 0x01, 0xa2, b'h', b'i', 0xc0];
//! let mut reader = Reader::new(&data[..]);
//! assert_eq!(reader.expect_array_range(..).unwrap(), 3);
//! assert_eq!(reader.expect_uint(..).unwrap(), 1);
//! assert_eq!(reader.expect_string().unwrap(), "hi");
//! assert_eq!(reader.read_tag().unwrap(), Tag::Nil);
//! reader.done_array().unwrap();
//! reader.destroy().unwrap();
//! ```

pub mod alloc;
pub mod config;
pub mod cursor;
pub mod error;
mod expect;
pub mod reader;
pub mod reflect;
pub mod tag;
pub mod timestamp;

// Re-export main types and traits
pub use alloc::{Allocator, Budget, Global};
pub use config::{BytesStyle, EnumStyle, RangeCfg, ReflectCfg, StructStyle};
pub use cursor::ByteCursor;
pub use error::Error;
pub use reader::Reader;
pub use reflect::{decode, read_enum, read_struct, Field, Reflect, Shape, Variant};
pub use tag::Tag;
pub use timestamp::Timestamp;

// Used by the registration macros.
#[doc(hidden)]
pub use bytes;
