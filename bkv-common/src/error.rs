//! # Wire Protocol Errors
//!
//! Purpose: Surface framing and codec failures with enough detail to tell a
//! broken stream apart from a malformed message body.

use thiserror::Error;

/// Result type for wire-level encode/decode.
pub type WireResult<T> = Result<T, WireError>;

/// Errors surfaced by the frame and message codecs.
#[derive(Debug, Error)]
pub enum WireError {
    /// Network or IO failure while reading/writing a frame.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A message body ended before all declared fields were read.
    #[error("truncated message body")]
    Truncated,
    /// A frame header declared a length beyond the protocol limit.
    #[error("frame of {len} bytes exceeds the protocol limit")]
    FrameTooLarge { len: usize },
    /// The message code is not part of the protocol.
    #[error("unknown message code 0x{0:02x}")]
    UnknownCode(u8),
    /// The body violated the declared layout.
    #[error("malformed message: {0}")]
    Malformed(&'static str),
}
