//! The MessagePack timestamp extension (type -1).
//!
//! Three payload layouts are defined:
//!
//! - 4 bytes: unsigned seconds (`u32`).
//! - 8 bytes: nanoseconds in the upper 30 bits, unsigned seconds in the lower 34 bits.
//! - 12 bytes: nanoseconds (`u32`) followed by signed seconds (`i64`).

use crate::{alloc::Allocator, reflect::Shape, Error, Reader, Reflect, ReflectCfg};
use bytes::Buf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Extension type of a timestamp.
pub const TIMESTAMP_EXT: i8 = -1;

const NANOS_PER_SEC: u32 = 1_000_000_000;
const SECONDS_MASK_64: u64 = (1 << 34) - 1;

/// A point in time relative to the Unix epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// Whole seconds since the epoch (negative before it).
    pub seconds: i64,
    /// Nanoseconds added to `seconds`, always below one second.
    pub nanos: u32,
}

impl Timestamp {
    /// Converts to a [SystemTime], or `None` if the platform cannot represent it.
    pub fn to_system_time(&self) -> Option<SystemTime> {
        let time = if self.seconds >= 0 {
            UNIX_EPOCH.checked_add(Duration::from_secs(self.seconds as u64))?
        } else {
            UNIX_EPOCH.checked_sub(Duration::from_secs(self.seconds.unsigned_abs()))?
        };
        time.checked_add(Duration::from_nanos(self.nanos as u64))
    }
}

impl<B: Buf, A: Allocator> Reader<B, A> {
    /// Reads a timestamp extension.
    ///
    /// Fails with [Error::TypeMismatch] on any other extension type, and with
    /// [Error::InvalidEncoding] if the payload length is not 4, 8, or 12 or the nanoseconds are
    /// out of range.
    pub fn expect_timestamp(&mut self) -> Result<Timestamp, Error> {
        self.guard(|r| {
            let (kind, len) = r.expect_ext_start()?;
            if kind != TIMESTAMP_EXT {
                debug!(kind, "extension is not a timestamp");
                return Err(Error::TypeMismatch);
            }
            let mut buf = [0u8; 12];
            let payload = match len {
                4 | 8 | 12 => &mut buf[..len as usize],
                _ => {
                    debug!(len, "invalid timestamp length");
                    return Err(Error::InvalidEncoding);
                }
            };
            r.read_bytes_into(payload)?;
            r.done_ext()?;

            let timestamp = match payload.len() {
                4 => Timestamp {
                    seconds: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as i64,
                    nanos: 0,
                },
                8 => {
                    let mut word = [0u8; 8];
                    word.copy_from_slice(&buf[..8]);
                    let value = u64::from_be_bytes(word);
                    Timestamp {
                        seconds: (value & SECONDS_MASK_64) as i64,
                        nanos: (value >> 34) as u32,
                    }
                }
                _ => {
                    let mut seconds = [0u8; 8];
                    seconds.copy_from_slice(&buf[4..12]);
                    Timestamp {
                        seconds: i64::from_be_bytes(seconds),
                        nanos: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
                    }
                }
            };
            if timestamp.nanos >= NANOS_PER_SEC {
                debug!(nanos = timestamp.nanos, "timestamp nanoseconds out of range");
                return Err(Error::InvalidEncoding);
            }
            Ok(timestamp)
        })
    }
}

impl Reflect for Timestamp {
    const SHAPE: Shape = Shape::Ext;

    fn read_reflect(
        reader: &mut Reader<impl Buf, impl Allocator>,
        _: &ReflectCfg,
    ) -> Result<Self, Error> {
        reader.expect_timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;

    fn read(data: &[u8]) -> Result<Timestamp, Error> {
        let mut reader = Reader::new(data);
        let timestamp = reader.expect_timestamp()?;
        reader.destroy()?;
        Ok(timestamp)
    }

    #[test]
    fn test_timestamp32() {
        let ts = read(&[0xd6, 0xff, 0x00, 0x00, 0x01, 0x00]).unwrap();
        assert_eq!(ts, Timestamp { seconds: 256, nanos: 0 });
    }

    #[test]
    fn test_timestamp64() {
        // nanos = 1 (upper 30 bits), seconds = 2^33 + 5 (lower 34 bits)
        let value: u64 = (1 << 34) | (1 << 33) | 5;
        let mut data = vec![0xd7, 0xff];
        data.extend_from_slice(&value.to_be_bytes());
        let ts = read(&data).unwrap();
        assert_eq!(
            ts,
            Timestamp {
                seconds: (1 << 33) + 5,
                nanos: 1
            }
        );
    }

    #[test]
    fn test_timestamp96() {
        let mut data = vec![0xc7, 0x0c, 0xff];
        data.extend_from_slice(&500u32.to_be_bytes());
        data.extend_from_slice(&(-2i64).to_be_bytes());
        let ts = read(&data).unwrap();
        assert_eq!(
            ts,
            Timestamp {
                seconds: -2,
                nanos: 500
            }
        );
        assert_eq!(
            ts.to_system_time(),
            UNIX_EPOCH.checked_sub(Duration::new(1, 999_999_500))
        );
    }

    #[test]
    fn test_timestamp_wrong_type() {
        assert!(matches!(
            read(&[0xd6, 0x01, 0x00, 0x00, 0x01, 0x00]),
            Err(Error::TypeMismatch)
        ));
        assert!(matches!(read(&[0xc0]), Err(Error::TypeMismatch)));
    }

    #[test]
    fn test_timestamp_invalid() {
        // 2-byte payload
        assert!(matches!(
            read(&[0xd5, 0xff, 0x00, 0x00]),
            Err(Error::InvalidEncoding)
        ));

        // nanos of exactly one second
        let mut data = vec![0xc7, 0x0c, 0xff];
        data.extend_from_slice(&NANOS_PER_SEC.to_be_bytes());
        data.extend_from_slice(&0i64.to_be_bytes());
        assert!(matches!(read(&data), Err(Error::InvalidEncoding)));
    }

    #[test]
    fn test_timestamp_truncated() {
        assert!(matches!(read(&[0xd6, 0xff, 0x00, 0x00]), Err(Error::Io)));
    }

    #[test]
    fn test_timestamp_reflect() {
        let ts: Timestamp =
            decode(&[0xd6u8, 0xff, 0x00, 0x00, 0x00, 0x2a][..], &ReflectCfg::default()).unwrap();
        assert_eq!(ts.seconds, 42);
        assert_eq!(Timestamp::SHAPE, Shape::Ext);
    }
}
