//! Message frame format, batch parsing and offset alignment.
//!
//! # Frame Layout
//!
//! ```text
//! ┌─────────────────┬──────────────────┬─────────────────────────┐
//! │ Length L (4)    │ Offset (8)       │ Payload (L - 8)         │
//! └─────────────────┴──────────────────┴─────────────────────────┘
//! ```
//!
//! All integers are little-endian. `L` counts the offset field plus the
//! payload, so `L >= 8`. A batch is a flat concatenation of frames with no
//! header or trailer, and stream files hold exactly the same bytes.
//!
//! # Lifecycle
//!
//! A submitted buffer is parsed into an [`UnalignedSet`], which records where
//! each frame sits. [`UnalignedSet::align`] consumes the set, writes
//! contiguous offsets into the frames' offset fields in place, and returns
//! the [`AlignedSet`] that the stream then writes verbatim. Payload bytes are
//! never copied or moved.

use byteorder::{ByteOrder, LittleEndian};
use std::ops::Range;
use strand_core::{FramingError, Offset};

/// Size of the length prefix in bytes
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the offset field in bytes
pub const OFFSET_FIELD_SIZE: usize = 8;

/// Length prefix plus offset field
pub const FRAME_HEADER_SIZE: usize = LENGTH_PREFIX_SIZE + OFFSET_FIELD_SIZE;

/// Smallest legal length prefix: an offset field with an empty payload
pub const MIN_FRAME_LENGTH: u32 = OFFSET_FIELD_SIZE as u32;

/// Largest payload a single frame can carry
pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize - OFFSET_FIELD_SIZE;

/// Location of one frame inside a batch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameIndex {
    /// Byte position of the length prefix
    pub position: usize,
    /// Value of the length prefix
    pub length: u32,
}

impl FrameIndex {
    /// Byte range of the offset field.
    #[inline]
    pub fn offset_field(&self) -> Range<usize> {
        let start = self.position + LENGTH_PREFIX_SIZE;
        start..start + OFFSET_FIELD_SIZE
    }

    /// Byte range of the payload.
    #[inline]
    pub fn payload(&self) -> Range<usize> {
        self.position + FRAME_HEADER_SIZE..self.end()
    }

    /// Byte position just past this frame.
    #[inline]
    pub fn end(&self) -> usize {
        self.position + LENGTH_PREFIX_SIZE + self.length as usize
    }

    /// Payload size in bytes.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.length as usize - OFFSET_FIELD_SIZE
    }
}

/// Split a buffer into frames.
///
/// Frames must be contiguous and cover the buffer exactly. An empty buffer
/// yields no frames.
pub fn parse_frames(buffer: &[u8]) -> Result<Vec<FrameIndex>, FramingError> {
    let mut position = 0;
    let mut index = Vec::with_capacity(8);

    while position < buffer.len() {
        let remaining = buffer.len() - position;
        if remaining < LENGTH_PREFIX_SIZE {
            return Err(FramingError::TruncatedLength {
                position,
                remaining,
            });
        }

        let length = LittleEndian::read_u32(&buffer[position..]);
        if length < MIN_FRAME_LENGTH {
            return Err(FramingError::TooShort {
                position,
                length,
                min: MIN_FRAME_LENGTH,
            });
        }

        let available = remaining - LENGTH_PREFIX_SIZE;
        if length as usize > available {
            return Err(FramingError::Truncated {
                position,
                length,
                remaining: available,
            });
        }

        index.push(FrameIndex { position, length });
        position += LENGTH_PREFIX_SIZE + length as usize;
    }

    Ok(index)
}

/// A parsed batch whose offsets have not been assigned yet.
///
/// Owns the submitted buffer. The only way forward is [`align`](Self::align),
/// which consumes the set.
#[derive(Debug)]
pub struct UnalignedSet {
    index: Vec<FrameIndex>,
    buffer: Vec<u8>,
}

impl UnalignedSet {
    /// Parse a submitted buffer.
    ///
    /// # Errors
    ///
    /// Returns a [`FramingError`] if a length prefix is cut short, is below
    /// [`MIN_FRAME_LENGTH`], or runs past the end of the buffer.
    pub fn parse(buffer: Vec<u8>) -> Result<Self, FramingError> {
        let index = parse_frames(&buffer)?;
        Ok(UnalignedSet { index, buffer })
    }

    /// Number of messages in the batch.
    pub fn message_count(&self) -> usize {
        self.index.len()
    }

    /// True if the batch holds no messages.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Size of the batch in bytes.
    pub fn byte_len(&self) -> usize {
        self.buffer.len()
    }

    /// Frame locations, in order.
    pub fn index(&self) -> &[FrameIndex] {
        &self.index
    }

    /// Iterate over the frames as submitted.
    pub fn frames(&self) -> Frames<'_> {
        Frames::new(&self.buffer, &self.index)
    }

    /// Assign offsets `base, base + 1, ...` to the frames.
    ///
    /// Each offset is written into its frame's offset field in the owned
    /// buffer; nothing else is touched.
    pub fn align(mut self, base: Offset) -> AlignedSet {
        for (i, frame) in self.index.iter().enumerate() {
            let offset = base.add_count(i);
            LittleEndian::write_u64(&mut self.buffer[frame.offset_field()], offset.as_u64());
        }

        let next_offset = base.add_count(self.index.len());
        AlignedSet {
            index: self.index,
            buffer: self.buffer,
            first_offset: base,
            next_offset,
        }
    }

    /// Give the buffer back without aligning.
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }
}

/// A batch with contiguous offsets patched into its buffer.
#[derive(Debug)]
pub struct AlignedSet {
    index: Vec<FrameIndex>,
    buffer: Vec<u8>,
    first_offset: Offset,
    next_offset: Offset,
}

impl AlignedSet {
    /// Offset of the first message (the alignment base).
    pub fn first_offset(&self) -> Offset {
        self.first_offset
    }

    /// Number of messages.
    pub fn count(&self) -> usize {
        self.index.len()
    }

    /// Offset after the last message; the stream's new tail.
    pub fn next_offset(&self) -> Offset {
        self.next_offset
    }

    /// Offset assigned to message `i`, read back from the buffer.
    pub fn offset_at(&self, i: usize) -> Option<Offset> {
        self.index
            .get(i)
            .map(|frame| read_offset_field(&self.buffer, frame))
    }

    /// Wire bytes, ready to be written.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Iterate over the aligned frames.
    pub fn frames(&self) -> Frames<'_> {
        Frames::new(&self.buffer, &self.index)
    }

    /// Take the aligned buffer.
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }
}

fn read_offset_field(buffer: &[u8], frame: &FrameIndex) -> Offset {
    Offset::new(LittleEndian::read_u64(&buffer[frame.offset_field()]))
}

/// A borrowed view of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRef<'a> {
    /// Byte position of the length prefix
    pub position: usize,
    /// Value currently held in the offset field
    pub offset: Offset,
    /// Message payload
    pub payload: &'a [u8],
}

/// Iterator over the frames of a set.
pub struct Frames<'a> {
    buffer: &'a [u8],
    index: std::slice::Iter<'a, FrameIndex>,
}

impl<'a> Frames<'a> {
    fn new(buffer: &'a [u8], index: &'a [FrameIndex]) -> Self {
        Frames {
            buffer,
            index: index.iter(),
        }
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = FrameRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.index.next()?;
        Some(FrameRef {
            position: frame.position,
            offset: read_offset_field(self.buffer, frame),
            payload: &self.buffer[frame.payload()],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.index.size_hint()
    }
}

impl ExactSizeIterator for Frames<'_> {}

/// Builds a wire batch from payloads.
///
/// Offset fields are left zeroed; the store assigns them on append.
///
/// ```
/// use strand_durability::format::MessageSetBuilder;
///
/// let mut builder = MessageSetBuilder::new();
/// builder.push(b"hello").push(b"world");
/// let batch = builder.build();
/// assert_eq!(batch.len(), 2 * (12 + 5));
/// ```
#[derive(Debug, Default, Clone)]
pub struct MessageSetBuilder {
    buffer: Vec<u8>,
    count: usize,
}

impl MessageSetBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with room for `bytes` of encoded frames.
    pub fn with_capacity(bytes: usize) -> Self {
        MessageSetBuilder {
            buffer: Vec::with_capacity(bytes),
            count: 0,
        }
    }

    /// Append one message.
    ///
    /// # Panics
    ///
    /// Panics if the payload exceeds [`MAX_PAYLOAD_SIZE`].
    pub fn push(&mut self, payload: &[u8]) -> &mut Self {
        assert!(
            payload.len() <= MAX_PAYLOAD_SIZE,
            "payload of {} bytes exceeds the frame limit of {} bytes",
            payload.len(),
            MAX_PAYLOAD_SIZE
        );

        let length = (OFFSET_FIELD_SIZE + payload.len()) as u32;
        self.buffer.reserve(FRAME_HEADER_SIZE + payload.len());
        self.buffer.extend_from_slice(&length.to_le_bytes());
        self.buffer.extend_from_slice(&Offset::EMPTY.to_le_bytes());
        self.buffer.extend_from_slice(payload);
        self.count += 1;
        self
    }

    /// Number of messages pushed so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Encoded size so far.
    pub fn byte_len(&self) -> usize {
        self.buffer.len()
    }

    /// Finish and return the wire bytes.
    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

/// Encode payloads into a single wire batch.
pub fn encode_message_set<I, P>(payloads: I) -> Vec<u8>
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    let mut builder = MessageSetBuilder::new();
    for payload in payloads {
        builder.push(payload.as_ref());
    }
    builder.build()
}
