#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use commonware_msgpack::{
    decode, reflect_enum, reflect_struct, Budget, BytesStyle, EnumStyle, Error, Reader,
    ReflectCfg, StructStyle, Tag, Timestamp,
};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;

reflect_enum! {
    #[derive(Debug)]
    enum Kind {
        A = 0,
        B = 1,
        C = -5,
    }
}

reflect_struct! {
    #[allow(dead_code)]
    #[derive(Debug)]
    struct Target {
        kind: Kind,
        id: u32,
        small: i8,
        ratio: f32,
        label: Option<String>,
        blob: Bytes,
        items: Vec<(u16, bool)>,
        fixed: [i64; 2],
        extra: BTreeMap<String, Option<f64>>,
        at: Option<Timestamp>,
    }
}

#[derive(Arbitrary, Debug)]
struct Input {
    struct_style: Option<bool>,
    enum_style: Option<bool>,
    bytes_style: u8,
    ignore_extra_fields: bool,
    validate_utf8: bool,
    budget: u16,
    data: Vec<u8>,
}

impl Input {
    fn cfg(&self) -> ReflectCfg {
        ReflectCfg {
            ignore_extra_fields: self.ignore_extra_fields,
            struct_style: self
                .struct_style
                .map(|map| if map { StructStyle::Map } else { StructStyle::Array }),
            enum_style: self
                .enum_style
                .map(|names| if names { EnumStyle::Names } else { EnumStyle::Ordinals }),
            validate_utf8: self.validate_utf8,
            bytes_style: match self.bytes_style % 4 {
                0 => None,
                1 => Some(BytesStyle::Bin),
                2 => Some(BytesStyle::Str),
                _ => Some(BytesStyle::Any),
            },
        }
    }
}

/// Walks every tag, reading payloads in small chunks and closing frames as they empty.
fn walk(data: &[u8]) -> Result<(), Error> {
    let mut reader = Reader::new(data);
    let mut open = Vec::new();
    let mut chunk = [0u8; 7];
    loop {
        // Close every exhausted container
        while let Some((tag, left)) = open.last_mut() {
            if *left > 0 {
                *left -= 1;
                break;
            }
            match tag {
                Tag::Map(_) => reader.done_map()?,
                _ => reader.done_array()?,
            }
            open.pop();
        }
        if open.is_empty() && reader.remaining() == 0 {
            break;
        }
        let tag = reader.read_tag()?;
        match tag {
            Tag::Array(count) => open.push((tag, count as u64)),
            Tag::Map(count) => open.push((tag, 2 * count as u64)),
            Tag::Str(_) | Tag::Bin(_) | Tag::Ext(..) => {
                while reader.read_bytes_into(&mut chunk)? > 0 {}
                match tag {
                    Tag::Str(_) => reader.done_str()?,
                    Tag::Bin(_) => reader.done_bin()?,
                    _ => reader.done_ext()?,
                }
            }
            _ => {}
        }
    }
    reader.destroy()
}

fuzz_target!(|input: Input| {
    let cfg = input.cfg();

    // Reflection never panics, whatever the configuration
    let _ = decode::<Target>(&input.data[..], &cfg);
    let _ = decode::<Vec<Kind>>(&input.data[..], &cfg);

    // A capped allocator is never exceeded
    let mut reader = Reader::with_allocator(&input.data[..], Budget::new(input.budget as usize));
    let _ = reader.expect_reflect::<Vec<String>>(&cfg);

    // Discard agrees with a manual walk on well-formed prefixes
    let mut reader = Reader::new(&input.data[..]);
    if reader.discard().is_ok() {
        assert_eq!(reader.depth(), 0);
        let consumed = reader.position();
        assert!(walk(&input.data[..consumed]).is_ok());
    }
    let _ = walk(&input.data[..]);
});
