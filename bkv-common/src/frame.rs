//! # Frame Codec
//!
//! Purpose: Delimit messages on the TCP stream with a fixed five-byte header
//! so bodies can be decoded without lookahead.
//!
//! ## Design Principles
//! 1. **Explicit Framing**: Encode the header by hand; no codec machinery.
//! 2. **Bounded Reads**: Reject oversized frames before allocating for them.
//! 3. **Fail Fast**: A bad header poisons the stream and surfaces immediately.
//!
//! ## Frame Layout
//!
//! ```text
//! +-------------+----------+------------------+
//! | length: 4B  | code: 1B | body: length-1 B |
//! +-------------+----------+------------------+
//! ```
//!
//! `length` is big-endian and counts the code byte plus the body.

use std::io::Read;

use bytes::BufMut;

use crate::error::{WireError, WireResult};

/// Upper bound on a single frame, header excluded.
///
/// Large enough for any value the store accepts, small enough that a corrupt
/// length prefix cannot trigger a runaway allocation.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Appends one frame to `out`.
pub fn write_frame(out: &mut Vec<u8>, code: u8, body: &[u8]) {
    out.put_u32((body.len() + 1) as u32);
    out.put_u8(code);
    out.put_slice(body);
}

/// Reads one frame, returning the message code and body.
pub fn read_frame<R: Read>(reader: &mut R) -> WireResult<(u8, Vec<u8>)> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header)?;
    let len = u32::from_be_bytes(header) as usize;
    if len == 0 {
        return Err(WireError::Malformed("frame without a message code"));
    }
    if len > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge { len });
    }

    let mut code = [0u8; 1];
    reader.read_exact(&mut code)?;
    let mut body = vec![0u8; len - 1];
    reader.read_exact(&mut body)?;
    Ok((code[0], body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frame_roundtrip() {
        let mut buf = Vec::new();
        write_frame(&mut buf, 0x09, b"payload");
        assert_eq!(&buf[..4], &[0, 0, 0, 8]);

        let mut reader = Cursor::new(buf);
        let (code, body) = read_frame(&mut reader).unwrap();
        assert_eq!(code, 0x09);
        assert_eq!(body, b"payload");
    }

    #[test]
    fn empty_body_is_valid() {
        let mut buf = Vec::new();
        write_frame(&mut buf, 0x01, b"");

        let mut reader = Cursor::new(buf);
        let (code, body) = read_frame(&mut reader).unwrap();
        assert_eq!(code, 0x01);
        assert!(body.is_empty());
    }

    #[test]
    fn zero_length_frame_rejected() {
        let mut reader = Cursor::new(vec![0, 0, 0, 0]);
        assert!(matches!(
            read_frame(&mut reader),
            Err(WireError::Malformed(_))
        ));
    }

    #[test]
    fn oversized_frame_rejected() {
        let len = (MAX_FRAME_LEN as u32) + 1;
        let mut reader = Cursor::new(len.to_be_bytes().to_vec());
        assert!(matches!(
            read_frame(&mut reader),
            Err(WireError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn truncated_body_is_io_error() {
        let mut buf = Vec::new();
        write_frame(&mut buf, 0x09, b"payload");
        buf.truncate(buf.len() - 3);

        let mut reader = Cursor::new(buf);
        assert!(matches!(read_frame(&mut reader), Err(WireError::Io(_))));
    }
}
