//! Core types for strand
//!
//! This crate defines the foundational types used throughout the system:
//! - Offset: Stream-local logical message position
//! - StreamName: Validated stream identity
//! - StrandError: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod offset;
pub mod stream_name;

pub use error::{FramingError, StrandError, StrandResult};
pub use offset::Offset;
pub use stream_name::{StreamName, StreamNameError, MAX_STREAM_NAME_LENGTH};
