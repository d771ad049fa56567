//! Configuration for typed and reflective reads.

use core::ops::{Bound, RangeBounds};

/// Bounds accepted by a ranged read.
///
/// Built from any range expression, so callers can write `0..=255`, `1..`, `..10`, or `..`.
/// Used to bound integers (see [crate::Reader::expect_uint]) and element counts (see
/// [crate::Reader::expect_array_range]).
///
/// # Examples
///
/// ```
/// use commonware_msgpack::RangeCfg;
///
/// let cfg = RangeCfg::new(-128i64..=127);
/// assert!(cfg.contains(&-128));
/// assert!(!cfg.contains(&128));
///
/// let any: RangeCfg<u64> = (..).into();
/// assert!(any.contains(&u64::MAX));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RangeCfg<T: Copy + PartialOrd> {
    start: Bound<T>,
    end: Bound<T>,
}

impl<T: Copy + PartialOrd> RangeCfg<T> {
    /// Creates a `RangeCfg` from any type implementing `RangeBounds<T>`.
    pub fn new(r: impl RangeBounds<T>) -> Self {
        Self {
            start: r.start_bound().cloned(),
            end: r.end_bound().cloned(),
        }
    }

    /// Creates a `RangeCfg` that only accepts exactly `value`.
    pub fn exact(value: T) -> Self {
        Self {
            start: Bound::Included(value),
            end: Bound::Included(value),
        }
    }

    /// Returns true if `value` lies within the bounds.
    pub fn contains(&self, value: &T) -> bool {
        let above_start = match &self.start {
            Bound::Included(s) => value >= s,
            Bound::Excluded(s) => value > s,
            Bound::Unbounded => true,
        };
        let below_end = match &self.end {
            Bound::Included(e) => value <= e,
            Bound::Excluded(e) => value < e,
            Bound::Unbounded => true,
        };
        above_start && below_end
    }
}

macro_rules! impl_from_range {
    ($($range:ty),*) => {
        $(
            impl<T: Copy + PartialOrd> From<$range> for RangeCfg<T> {
                fn from(r: $range) -> Self {
                    Self::new(r)
                }
            }
        )*
    };
}

impl_from_range!(
    core::ops::Range<T>,
    core::ops::RangeInclusive<T>,
    core::ops::RangeFrom<T>,
    core::ops::RangeTo<T>,
    core::ops::RangeToInclusive<T>
);

impl<T: Copy + PartialOrd> From<core::ops::RangeFull> for RangeCfg<T> {
    fn from(_: core::ops::RangeFull) -> Self {
        Self::new(..)
    }
}

impl<T: Copy + PartialOrd> RangeBounds<T> for RangeCfg<T> {
    fn start_bound(&self) -> Bound<&T> {
        self.start.as_ref()
    }

    fn end_bound(&self) -> Bound<&T> {
        self.end.as_ref()
    }
}

/// Wire shape required of structs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StructStyle {
    /// A map from field name to field value, in any order.
    Map,
    /// An array of field values in declaration order.
    Array,
}

/// Wire shape required of enums.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EnumStyle {
    /// The variant name as a string (matched case-sensitively).
    Names,
    /// The variant discriminant as an integer.
    Ordinals,
}

/// Wire shape accepted for byte-sequence targets that cannot tell text from binary on their own.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BytesStyle {
    /// A `bin` object (never UTF-8 validated).
    Bin,
    /// A `str` object (validated when [ReflectCfg::validate_utf8] is set).
    Str,
    /// Either of the above.
    Any,
}

/// Configuration for [crate::Reflect] decoding.
///
/// The value is passed by reference through every nested read and is never mutated.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ReflectCfg {
    /// Whether map-encoded structs may carry keys that match no field (skipped when `true`,
    /// [crate::Error::TypeMismatch] when `false`).
    pub ignore_extra_fields: bool,

    /// Required struct shape. When `None`, the wire tag decides.
    pub struct_style: Option<StructStyle>,

    /// Required enum shape. When `None`, the wire tag decides.
    pub enum_style: Option<EnumStyle>,

    /// Whether `str` payloads decoded into byte targets must be valid UTF-8.
    ///
    /// [String] targets are always validated.
    pub validate_utf8: bool,

    /// How to interpret byte-sequence targets. When `None`, decoding such a target fails with
    /// [crate::Error::Other].
    pub bytes_style: Option<BytesStyle>,
}

impl Default for ReflectCfg {
    fn default() -> Self {
        Self {
            ignore_extra_fields: true,
            struct_style: None,
            enum_style: None,
            validate_utf8: true,
            bytes_style: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::ops::Bound::{Excluded, Included, Unbounded};

    #[test]
    fn test_range_cfg_from() {
        let full: RangeCfg<u64> = (..).into();
        assert_eq!(full.start_bound(), Unbounded);
        assert_eq!(full.end_bound(), Unbounded);

        let inclusive: RangeCfg<i64> = (-5..=5).into();
        assert_eq!(inclusive.start_bound(), Included(&-5));
        assert_eq!(inclusive.end_bound(), Included(&5));

        let half_open: RangeCfg<u64> = (3..10).into();
        assert_eq!(half_open.end_bound(), Excluded(&10));
    }

    #[test]
    fn test_range_cfg_contains() {
        let cfg = RangeCfg::new(0u64..=255);
        assert!(cfg.contains(&0));
        assert!(cfg.contains(&255));
        assert!(!cfg.contains(&256));

        let cfg = RangeCfg::new(i64::MIN..0);
        assert!(cfg.contains(&i64::MIN));
        assert!(cfg.contains(&-1));
        assert!(!cfg.contains(&0));

        let cfg = RangeCfg::exact(3u64);
        assert!(cfg.contains(&3));
        assert!(!cfg.contains(&2));
        assert!(!cfg.contains(&4));
    }

    #[test]
    fn test_range_cfg_empty() {
        let cfg: RangeCfg<u64> = (5..5).into();
        assert!(!cfg.contains(&5));

        #[allow(clippy::reversed_empty_ranges)]
        let cfg: RangeCfg<u64> = (6..=5).into();
        assert!(!cfg.contains(&5));
        assert!(!cfg.contains(&6));
    }

    #[test]
    fn test_reflect_cfg_default() {
        let cfg = ReflectCfg::default();
        assert!(cfg.ignore_extra_fields);
        assert!(cfg.validate_utf8);
        assert_eq!(cfg.struct_style, None);
        assert_eq!(cfg.enum_style, None);
        assert_eq!(cfg.bytes_style, None);
    }
}
