//! Error types for strand
//!
//! Every failure the store can report is a [`StrandError`]. None of them are
//! fatal to the process; whether a caller may simply resend the same request
//! is reported by [`StrandError::is_retryable`].

use crate::stream_name::StreamNameError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for strand operations
pub type StrandResult<T> = std::result::Result<T, StrandError>;

/// Malformed message batch.
///
/// Positions are byte offsets into the submitted buffer (or into a stream
/// file during recovery).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    /// Fewer than four bytes left where a length prefix was expected
    #[error("invalid frame length prefix at position {position}: only {remaining} bytes left")]
    TruncatedLength {
        /// Start of the partial length prefix
        position: usize,
        /// Bytes left in the buffer
        remaining: usize,
    },

    /// Length prefix runs past the end of the buffer
    #[error("frame truncated at position {position}: length {length} exceeds the {remaining} bytes left")]
    Truncated {
        /// Start of the frame
        position: usize,
        /// Declared frame length
        length: u32,
        /// Bytes left after the length prefix
        remaining: usize,
    },

    /// Length prefix too small to hold the offset field
    #[error("frame at position {position} has length {length}, below the minimum of {min}")]
    TooShort {
        /// Start of the frame
        position: usize,
        /// Declared frame length
        length: u32,
        /// Minimum frame length
        min: u32,
    },
}

impl FramingError {
    /// Byte position the error refers to.
    pub fn position(&self) -> usize {
        match self {
            FramingError::TruncatedLength { position, .. }
            | FramingError::Truncated { position, .. }
            | FramingError::TooShort { position, .. } => *position,
        }
    }
}

/// Error types for the strand store
#[derive(Debug, Error)]
pub enum StrandError {
    /// Stream name failed validation
    #[error("invalid stream name '{name}': {source}")]
    InvalidStreamName {
        /// Name as submitted
        name: String,
        /// Validation failure
        #[source]
        source: StreamNameError,
    },

    /// Submitted buffer is not a valid message batch
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Backing file could not be created or opened
    #[error("failed to create stream '{name}' at {}: {source}", path.display())]
    StreamCreation {
        /// Stream name
        name: String,
        /// Backing file location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Existing backing file failed recovery
    #[error("stream '{name}' is corrupt at byte {position}: {reason}")]
    Corruption {
        /// Stream name
        name: String,
        /// Byte position of the offending frame
        position: u64,
        /// What was wrong
        reason: String,
    },

    /// Durable write (or its sync) failed
    #[error("write to stream '{name}' at byte {position} failed: {source}")]
    Write {
        /// Stream name
        name: String,
        /// Byte position the batch was written at
        position: u64,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Durable write stored fewer bytes than the batch holds
    #[error("short write to stream '{name}' at byte {position}: wrote {written} of {expected} bytes")]
    ShortWrite {
        /// Stream name
        name: String,
        /// Byte position the batch was written at
        position: u64,
        /// Bytes actually written
        written: usize,
        /// Batch size
        expected: usize,
    },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error outside the append path (configuration files, directories)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StrandError {
    /// Build an `InvalidStreamName` error.
    pub fn invalid_stream_name(name: impl Into<String>, source: StreamNameError) -> Self {
        StrandError::InvalidStreamName {
            name: name.into(),
            source,
        }
    }

    /// Build a `Config` error.
    pub fn config(message: impl Into<String>) -> Self {
        StrandError::Config(message.into())
    }

    /// Whether resending the same request may succeed.
    ///
    /// Creation and write failures leave no state behind, so they can be
    /// retried as-is. Framing, naming, corruption and configuration errors
    /// fail identically on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StrandError::StreamCreation { .. }
                | StrandError::Write { .. }
                | StrandError::ShortWrite { .. }
                | StrandError::Io(_)
        )
    }

    /// True for `Write` and `ShortWrite`.
    pub fn is_write_error(&self) -> bool {
        matches!(
            self,
            StrandError::Write { .. } | StrandError::ShortWrite { .. }
        )
    }
}
