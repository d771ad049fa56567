//! Error types for decoding operations

use thiserror::Error;

/// Error type for decoding operations.
///
/// A [crate::Reader] remembers the first error it returns and hands the same value back from every
/// later operation, so the type is `Copy`. Context that does not fit here (offsets, selector bytes,
/// field names) is emitted through `tracing` where the failure is detected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// The byte source ran out of data (or failed) before a read could be satisfied.
    #[error("byte source exhausted")]
    Io,
    /// The value on the wire does not have the kind (or numeric range) the caller expected.
    #[error("type mismatch")]
    TypeMismatch,
    /// The input is not well-formed MessagePack (or held invalid UTF-8 where text was required).
    #[error("invalid encoding")]
    InvalidEncoding,
    /// An allocation requested by an owned read could not be satisfied.
    #[error("out of memory")]
    OutOfMemory,
    /// Any failure not covered by the other kinds.
    #[error("decoding failed")]
    Other,
}
