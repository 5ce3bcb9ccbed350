//! Wire and on-disk byte formats.
//!
//! Submitted batches and stream files share one format, so this module is
//! the only place that knows how frames are laid out.
//!
//! # Module Structure
//!
//! - `frame`: frame layout, batch parsing, offset alignment, batch building

pub mod frame;

pub use frame::{
    encode_message_set, parse_frames, AlignedSet, FrameIndex, FrameRef, Frames,
    MessageSetBuilder, UnalignedSet, FRAME_HEADER_SIZE, LENGTH_PREFIX_SIZE, MAX_PAYLOAD_SIZE,
    MIN_FRAME_LENGTH, OFFSET_FIELD_SIZE,
};
