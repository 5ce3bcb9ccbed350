//! Durability layer for strand
//!
//! This crate handles everything that touches disk:
//!
//! - Frame format: batch parsing, offset alignment, batch building
//! - Streams: the serialized append protocol over one backing file
//! - Recovery: cursor reconstruction and torn-tail repair on reopen
//! - Durability modes: Always, Standard (default)
//! - Directory: stream name to file resolution
//! - Fault-injecting files for testing

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod directory; // Stream name -> file resolution and reopen
pub mod format; // Wire and on-disk frame format
pub mod mode; // When streams fsync
pub mod stream; // Append protocol, cursors, recovery
pub mod testing; // Fault injection for the append path

pub use directory::{Directory, DEFAULT_EXTENSION};
pub use format::{
    encode_message_set, parse_frames, AlignedSet, FrameIndex, FrameRef, Frames,
    MessageSetBuilder, UnalignedSet, FRAME_HEADER_SIZE, MIN_FRAME_LENGTH,
};
pub use mode::DurabilityMode;
pub use stream::{
    recover, AppendReceipt, LogFile, Recovery, RecoveryError, Stream, StreamCounters,
    StreamCursors,
};
