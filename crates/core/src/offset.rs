//! Logical message offsets
//!
//! Every message in a stream is identified by an [`Offset`]: a stream-local,
//! monotonically increasing `u64`. Offsets are never reused and never go
//! backwards.
//!
//! A stream's *tail* is the next offset it will assign, not the offset of the
//! last message written. A tail of [`Offset::EMPTY`] therefore means the
//! stream has never received a message, and after appending `n` messages at
//! `base` the tail becomes `base + n`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical position of a message within one stream.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Offset(u64);

impl Offset {
    /// The initial tail of a stream that has never been written to.
    pub const EMPTY: Offset = Offset(0);

    /// Create an offset from a raw value.
    #[inline]
    pub const fn new(value: u64) -> Self {
        Offset(value)
    }

    /// Raw value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// True for [`Offset::EMPTY`].
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The offset directly after this one.
    #[inline]
    pub const fn next(self) -> Offset {
        Offset(self.0 + 1)
    }

    /// Advance by `delta` messages.
    #[inline]
    pub const fn add(self, delta: u64) -> Offset {
        Offset(self.0 + delta)
    }

    /// Advance by a message count.
    #[inline]
    pub fn add_count(self, count: usize) -> Offset {
        Offset(self.0 + count as u64)
    }

    /// Little-endian encoding as stored in a frame's offset field.
    #[inline]
    pub const fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Decode from a frame's little-endian offset field.
    #[inline]
    pub const fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Offset(u64::from_le_bytes(bytes))
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Offset {
    fn from(value: u64) -> Self {
        Offset(value)
    }
}

impl From<Offset> for u64 {
    fn from(offset: Offset) -> Self {
        offset.0
    }
}
