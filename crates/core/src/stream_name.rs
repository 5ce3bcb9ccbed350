//! Stream name type
//!
//! A stream is addressed by a user-supplied name that is also used, verbatim,
//! as the stem of its backing file (`<root>/<name>.<ext>`). Names are
//! validated up front so that no name can escape the data directory or
//! collide with hidden files.
//!
//! ## Validation
//!
//! Stream names must:
//! - Be 1-200 characters
//! - Contain only alphanumeric, dash, underscore, dot
//! - Not start with a dash or dot

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a stream name
///
/// Leaves room for the file extension within common 255-byte file name
/// limits.
pub const MAX_STREAM_NAME_LENGTH: usize = 200;

/// Validated name of a stream
///
/// ## Examples
///
/// Valid names:
/// - "client0"
/// - "orders.v2"
/// - "_audit-log"
///
/// Invalid names:
/// - "" (empty)
/// - "../etc/passwd"
/// - ".hidden"
/// - "has spaces"
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StreamName(String);

/// Error when validating a stream name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamNameError {
    /// Name is empty
    #[error("stream name cannot be empty")]
    Empty,

    /// Name exceeds maximum length
    #[error("stream name too long: {length} chars (max {max})")]
    TooLong {
        /// Actual length of the name
        length: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Name contains invalid character
    #[error(
        "invalid character '{char}' at position {position} (only alphanumeric, dash, underscore, dot allowed)"
    )]
    InvalidChar {
        /// The invalid character
        char: char,
        /// Position of the invalid character
        position: usize,
    },

    /// Name starts with invalid character
    #[error("stream name cannot start with '{char}' (must start with alphanumeric or underscore)")]
    InvalidStart {
        /// The invalid starting character
        char: char,
    },
}

impl StreamName {
    /// Create a new StreamName, validating the input
    ///
    /// # Errors
    ///
    /// Returns `StreamNameError` if the name is invalid.
    pub fn new(name: impl Into<String>) -> Result<Self, StreamNameError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(StreamName(name))
    }

    /// Validate a stream name
    pub fn validate(name: &str) -> Result<(), StreamNameError> {
        let first = match name.chars().next() {
            Some(c) => c,
            None => return Err(StreamNameError::Empty),
        };

        if name.len() > MAX_STREAM_NAME_LENGTH {
            return Err(StreamNameError::TooLong {
                length: name.len(),
                max: MAX_STREAM_NAME_LENGTH,
            });
        }

        if !first.is_ascii_alphanumeric() && first != '_' {
            return Err(StreamNameError::InvalidStart { char: first });
        }

        for (position, ch) in name.chars().enumerate() {
            if !Self::is_valid_char(ch) {
                return Err(StreamNameError::InvalidChar { char: ch, position });
            }
        }

        Ok(())
    }

    #[inline]
    fn is_valid_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
    }

    /// Get the name as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StreamName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StreamName {
    type Error = StreamNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StreamName::new(value)
    }
}

impl TryFrom<&str> for StreamName {
    type Error = StreamNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        StreamName::new(value)
    }
}

impl From<StreamName> for String {
    fn from(name: StreamName) -> Self {
        name.0
    }
}
