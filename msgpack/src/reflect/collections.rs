//! [Reflect] implementations for arrays, tuples, and maps.

use super::{Reflect, Shape};
use crate::{alloc::Allocator, Error, Reader, ReflectCfg};
use bytes::Buf;
use paste::paste;
use std::{
    collections::{BTreeMap, HashMap},
    hash::Hash,
};
use tracing::debug;

impl<T: Reflect> Reflect for Vec<T> {
    const SHAPE: Shape = Shape::Array { len: None };

    fn read_reflect(
        reader: &mut Reader<impl Buf, impl Allocator>,
        cfg: &ReflectCfg,
    ) -> Result<Self, Error> {
        let count = reader.expect_array()? as usize;

        // Never reserve more bytes than the source holds
        let bound = reader.remaining() / std::mem::size_of::<T>().max(1);
        let mut items = Vec::with_capacity(count.min(bound));
        for _ in 0..count {
            items.push(T::read_reflect(reader, cfg)?);
        }
        reader.done_array()?;
        Ok(items)
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    const SHAPE: Shape = Shape::Array { len: Some(N) };

    fn read_reflect(
        reader: &mut Reader<impl Buf, impl Allocator>,
        cfg: &ReflectCfg,
    ) -> Result<Self, Error> {
        let Ok(count) = u32::try_from(N) else {
            return Err(reader.poison(Error::TypeMismatch));
        };
        reader.expect_array_match(count)?;
        let mut items = Vec::with_capacity(N);
        for _ in 0..N {
            items.push(T::read_reflect(reader, cfg)?);
        }
        reader.done_array()?;
        items
            .try_into()
            .map_err(|_| reader.poison(Error::Other))
    }
}

// Tuples are arrays of exactly their arity.
macro_rules! impl_reflect_for_tuple {
    ($($index:literal),*) => {
        paste! {
            impl<$( [<T $index>]: Reflect ),*> Reflect for ( $( [<T $index>], )* ) {
                const SHAPE: Shape = Shape::Array { len: Some([$( $index ),*].len()) };

                fn read_reflect(
                    reader: &mut Reader<impl Buf, impl Allocator>,
                    cfg: &ReflectCfg,
                ) -> Result<Self, Error> {
                    reader.expect_array_match([$( $index ),*].len() as u32)?;
                    let value = ( $( [<T $index>]::read_reflect(reader, cfg)?, )* );
                    reader.done_array()?;
                    Ok(value)
                }
            }
        }
    };
}

impl_reflect_for_tuple!(0);
impl_reflect_for_tuple!(0, 1);
impl_reflect_for_tuple!(0, 1, 2);
impl_reflect_for_tuple!(0, 1, 2, 3);
impl_reflect_for_tuple!(0, 1, 2, 3, 4);
impl_reflect_for_tuple!(0, 1, 2, 3, 4, 5);
impl_reflect_for_tuple!(0, 1, 2, 3, 4, 5, 6);
impl_reflect_for_tuple!(0, 1, 2, 3, 4, 5, 6, 7);

/// Reads every entry of a map, failing on a repeated key.
fn read_entries<K: Reflect, V: Reflect>(
    reader: &mut Reader<impl Buf, impl Allocator>,
    cfg: &ReflectCfg,
    mut insert: impl FnMut(K, V) -> bool,
) -> Result<(), Error> {
    let count = reader.expect_map()?;
    for index in 0..count {
        let key = K::read_reflect(reader, cfg)?;
        let value = V::read_reflect(reader, cfg)?;
        if !insert(key, value) {
            debug!(index, "duplicate map key");
            return Err(reader.poison(Error::InvalidEncoding));
        }
    }
    reader.done_map()
}

impl<K: Reflect + Ord, V: Reflect> Reflect for BTreeMap<K, V> {
    const SHAPE: Shape = Shape::Map;

    fn read_reflect(
        reader: &mut Reader<impl Buf, impl Allocator>,
        cfg: &ReflectCfg,
    ) -> Result<Self, Error> {
        let mut map = BTreeMap::<K, V>::new();
        read_entries::<K, V>(reader, cfg, |k, v| map.insert(k, v).is_none())?;
        Ok(map)
    }
}

impl<K: Reflect + Eq + Hash, V: Reflect> Reflect for HashMap<K, V> {
    const SHAPE: Shape = Shape::Map;

    fn read_reflect(
        reader: &mut Reader<impl Buf, impl Allocator>,
        cfg: &ReflectCfg,
    ) -> Result<Self, Error> {
        let mut map = HashMap::<K, V>::new();
        read_entries::<K, V>(reader, cfg, |k, v| map.insert(k, v).is_none())?;
        Ok(map)
    }
}
