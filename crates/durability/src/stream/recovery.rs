//! Cursor recovery for existing stream files.
//!
//! A stream file holds nothing but frames, so the tail offset and write
//! position are rebuilt by walking the frames from byte 0:
//!
//! 1. Each complete frame must carry the offset equal to its index
//!    (0, 1, 2, ...) and a length of at least [`MIN_FRAME_LENGTH`].
//! 2. An incomplete frame at the end of the file is a torn write from a
//!    crash. It is truncated away and recovery succeeds.
//! 3. Any other inconsistency is corruption and recovery fails without
//!    modifying the file.
//!
//! Only frame headers are read; payloads are skipped.

use super::StreamCursors;
use crate::format::{FRAME_HEADER_SIZE, LENGTH_PREFIX_SIZE, MIN_FRAME_LENGTH, OFFSET_FIELD_SIZE};
use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{self, BufReader, Seek, SeekFrom};
use std::path::Path;
use strand_core::Offset;
use tracing::{debug, warn};

/// Outcome of a successful recovery scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recovery {
    /// Recovered tail offset and write position
    pub cursors: StreamCursors,
    /// Bytes removed from a torn tail (0 if the file was clean)
    pub truncated_bytes: u64,
}

/// Recovery failure.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    /// I/O error while scanning or truncating
    #[error("I/O error during recovery: {0}")]
    Io(#[from] io::Error),

    /// A complete frame is inconsistent with its position in the file
    #[error("corrupt frame at byte {position}: {reason}")]
    Corrupt {
        /// Byte position of the frame
        position: u64,
        /// What was wrong
        reason: String,
    },
}

/// Scan `file` and rebuild its cursors, truncating a torn tail.
///
/// `path` is only used for logging.
pub fn recover(file: &mut File, path: &Path) -> Result<Recovery, RecoveryError> {
    let file_len = file.metadata()?.len();
    let cursors = scan(file, file_len)?;

    let truncated_bytes = file_len - cursors.position;
    if truncated_bytes > 0 {
        warn!(
            path = %path.display(),
            position = cursors.position,
            truncated_bytes,
            "Truncating torn frame at end of stream file"
        );
        file.set_len(cursors.position)?;
        file.sync_all()?;
    }

    debug!(
        path = %path.display(),
        tail = %cursors.tail,
        position = cursors.position,
        "Recovered stream cursors"
    );

    Ok(Recovery {
        cursors,
        truncated_bytes,
    })
}

fn scan(file: &mut File, file_len: u64) -> Result<StreamCursors, RecoveryError> {
    file.seek(SeekFrom::Start(0))?;
    let mut reader = BufReader::new(file);

    let mut position = 0u64;
    let mut tail = Offset::EMPTY;

    while position < file_len {
        if file_len - position < FRAME_HEADER_SIZE as u64 {
            break;
        }

        let length = reader.read_u32::<LittleEndian>()?;
        let frame_end = position + LENGTH_PREFIX_SIZE as u64 + length as u64;

        if length < MIN_FRAME_LENGTH {
            return Err(RecoveryError::Corrupt {
                position,
                reason: format!(
                    "frame length {} is below the minimum of {}",
                    length, MIN_FRAME_LENGTH
                ),
            });
        }
        if frame_end > file_len {
            break;
        }

        let offset = Offset::new(reader.read_u64::<LittleEndian>()?);
        if offset != tail {
            return Err(RecoveryError::Corrupt {
                position,
                reason: format!("expected offset {}, found {}", tail, offset),
            });
        }

        let payload_len = length as usize - OFFSET_FIELD_SIZE;
        reader.seek_relative(payload_len as i64)?;

        position = frame_end;
        tail = tail.next();
    }

    Ok(StreamCursors { tail, position })
}
