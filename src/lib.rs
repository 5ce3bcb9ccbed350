//! strand - append-only log store
//!
//! A store holds named streams. Each stream is one append-only file of
//! frames, and each append assigns the frames of a caller-supplied batch
//! the next contiguous offsets.
//!
//! # Quick Start
//!
//! ```ignore
//! use strand::{encode_message_set, Store, StoreConfig};
//!
//! let store = Store::open(StoreConfig::new("/var/lib/strand"))?;
//!
//! // Two messages; returns the new tail
//! let tail = store.append("orders", encode_message_set([b"first", b"other"]))?;
//! assert_eq!(tail.as_u64(), 2);
//! ```
//!
//! # Wire Format
//!
//! A batch is a flat concatenation of frames. Each frame is a little-endian
//! `u32` length `L`, a little-endian `u64` offset, and `L - 8` payload bytes.
//! Offsets sent by the caller are ignored and overwritten.

pub use strand_core::{
    FramingError, Offset, StrandError, StrandResult, StreamName, StreamNameError,
};
pub use strand_durability::{
    encode_message_set, AppendReceipt, DurabilityMode, MessageSetBuilder, Stream,
    StreamCounters, StreamCursors,
};
pub use strand_engine::{Store, StoreConfig, StreamRegistry, CONFIG_FILE_NAME};
