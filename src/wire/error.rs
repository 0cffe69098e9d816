//! Error types for the binary wire formats.

use std::fmt;

/// Errors that can occur while encoding or decoding wire payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The input ended before a complete value could be read.
    UnexpectedEof {
        /// Bytes the reader needed.
        needed: usize,
        /// Bytes left in the input.
        remaining: usize,
    },

    /// Input was left over after a complete payload was decoded.
    TrailingBytes(usize),

    /// A length or count prefix was negative or otherwise unusable.
    InvalidLength(i32),

    /// A payload was too large for its 4-byte length prefix.
    TooLarge(usize),

    /// A string payload was not valid UTF-8.
    InvalidUtf8(String),

    /// A generic value started with a tag this codec does not know.
    UnknownValueTag(u8),

    /// A partition list contained the same partition twice.
    DuplicatePartition(i32),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof { needed, remaining } => write!(
                f,
                "Unexpected end of input: needed {} bytes, {} remaining",
                needed, remaining
            ),
            Self::TrailingBytes(n) => write!(f, "{} trailing bytes after payload", n),
            Self::InvalidLength(len) => write!(f, "Invalid length prefix: {}", len),
            Self::TooLarge(len) => write!(f, "Payload of {} bytes exceeds the 4-byte length prefix", len),
            Self::InvalidUtf8(msg) => write!(f, "Invalid UTF-8 string: {}", msg),
            Self::UnknownValueTag(tag) => write!(f, "Unknown value tag: {:#04x}", tag),
            Self::DuplicatePartition(pid) => write!(f, "Duplicate partition id: {}", pid),
        }
    }
}

impl std::error::Error for WireError {}

/// Result type for wire operations.
pub type WireResult<T> = Result<T, WireError>;
