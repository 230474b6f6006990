//! # Message Codecs
//!
//! Purpose: Define the closed set of protocol messages and their explicit
//! binary body layouts.
//!
//! ## Design Principles
//! 1. **Closed Enumeration**: Every code on the wire maps to one variant;
//!    anything else is rejected during decode.
//! 2. **Explicit Layouts**: Bodies are encoded field by field; no reflection
//!    or derived serialization on the hot path.
//! 3. **Binary-Safe**: Buckets, keys, and values are raw bytes end to end.
//! 4. **Strict Decode**: Trailing bytes after the last field are an error.
//!
//! ## Body Field Primitives
//!
//! ```text
//! u32:   4 bytes, big-endian (lengths, counts, codes)
//! u8:    1 byte (flags)
//! bytes: u32 length prefix + raw payload
//! ```
//!
//! ## Body Layout Examples
//!
//! ```text
//! GetReq (0x09):
//! +--------------+-----------+
//! | bucket:bytes | key:bytes |
//! +--------------+-----------+
//!
//! GetResp (0x0A):
//! +----------+---------------------------+
//! | found:1B | value:bytes (if found=1)  |
//! +----------+---------------------------+
//!
//! MapRedResp (0x12):
//! +----------+---------+----------------+------------------------------+
//! | phase:4B | done:1B | has_payload:1B | payload:bytes (if present)   |
//! +----------+---------+----------------+------------------------------+
//!
//! Error (0x00):
//! +------------+---------------+
//! | errcode:4B | message:bytes |
//! +------------+---------------+
//! ```

use bytes::{Buf, BufMut};

use crate::error::{WireError, WireResult};
use crate::frame::write_frame;

/// Server-reported error code meaning the requested object does not exist.
pub const ERR_NOT_FOUND: u32 = 1;

/// Message codes carried in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageCode {
    Error = 0x00,
    PingReq = 0x01,
    PingResp = 0x02,
    GetClientIdReq = 0x03,
    GetClientIdResp = 0x04,
    SetClientIdReq = 0x05,
    SetClientIdResp = 0x06,
    ServerInfoReq = 0x07,
    ServerInfoResp = 0x08,
    GetReq = 0x09,
    GetResp = 0x0a,
    PutReq = 0x0b,
    PutResp = 0x0c,
    DeleteReq = 0x0d,
    DeleteResp = 0x0e,
    ListBucketsReq = 0x0f,
    ListBucketsResp = 0x10,
    MapRedReq = 0x11,
    MapRedResp = 0x12,
}

impl MessageCode {
    /// Maps a raw code byte back into the enumeration.
    pub fn from_u8(value: u8) -> WireResult<Self> {
        match value {
            0x00 => Ok(MessageCode::Error),
            0x01 => Ok(MessageCode::PingReq),
            0x02 => Ok(MessageCode::PingResp),
            0x03 => Ok(MessageCode::GetClientIdReq),
            0x04 => Ok(MessageCode::GetClientIdResp),
            0x05 => Ok(MessageCode::SetClientIdReq),
            0x06 => Ok(MessageCode::SetClientIdResp),
            0x07 => Ok(MessageCode::ServerInfoReq),
            0x08 => Ok(MessageCode::ServerInfoResp),
            0x09 => Ok(MessageCode::GetReq),
            0x0a => Ok(MessageCode::GetResp),
            0x0b => Ok(MessageCode::PutReq),
            0x0c => Ok(MessageCode::PutResp),
            0x0d => Ok(MessageCode::DeleteReq),
            0x0e => Ok(MessageCode::DeleteResp),
            0x0f => Ok(MessageCode::ListBucketsReq),
            0x10 => Ok(MessageCode::ListBucketsResp),
            0x11 => Ok(MessageCode::MapRedReq),
            0x12 => Ok(MessageCode::MapRedResp),
            other => Err(WireError::UnknownCode(other)),
        }
    }
}

/// Client-to-server messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Ping,
    GetClientId,
    SetClientId { client_id: Vec<u8> },
    ServerInfo,
    Get { bucket: Vec<u8>, key: Vec<u8> },
    Put { bucket: Vec<u8>, key: Vec<u8>, value: Vec<u8>, return_body: bool },
    Delete { bucket: Vec<u8>, key: Vec<u8> },
    ListBuckets,
    MapRed { content_type: Vec<u8>, request: Vec<u8> },
}

impl Request {
    /// Message code for this request.
    pub fn code(&self) -> MessageCode {
        match self {
            Request::Ping => MessageCode::PingReq,
            Request::GetClientId => MessageCode::GetClientIdReq,
            Request::SetClientId { .. } => MessageCode::SetClientIdReq,
            Request::ServerInfo => MessageCode::ServerInfoReq,
            Request::Get { .. } => MessageCode::GetReq,
            Request::Put { .. } => MessageCode::PutReq,
            Request::Delete { .. } => MessageCode::DeleteReq,
            Request::ListBuckets => MessageCode::ListBucketsReq,
            Request::MapRed { .. } => MessageCode::MapRedReq,
        }
    }

    /// Encodes the request as one complete frame appended to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let mut body = Vec::new();
        match self {
            Request::Ping | Request::GetClientId | Request::ServerInfo | Request::ListBuckets => {}
            Request::SetClientId { client_id } => {
                put_bytes(&mut body, client_id);
            }
            Request::Get { bucket, key } | Request::Delete { bucket, key } => {
                put_bytes(&mut body, bucket);
                put_bytes(&mut body, key);
            }
            Request::Put { bucket, key, value, return_body } => {
                put_bytes(&mut body, bucket);
                put_bytes(&mut body, key);
                put_bytes(&mut body, value);
                body.put_u8(u8::from(*return_body));
            }
            Request::MapRed { content_type, request } => {
                put_bytes(&mut body, content_type);
                put_bytes(&mut body, request);
            }
        }
        write_frame(out, self.code() as u8, &body);
    }
}

/// Server-to-client messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Pong,
    ClientId { client_id: Vec<u8> },
    ClientIdSet,
    ServerInfo { node: Vec<u8>, version: Vec<u8> },
    Get { value: Option<Vec<u8>> },
    Put { value: Option<Vec<u8>> },
    Deleted,
    Buckets { buckets: Vec<Vec<u8>> },
    MapRed { phase: u32, payload: Option<Vec<u8>>, done: bool },
    Error { code: u32, message: Vec<u8> },
}

impl Response {
    /// Decodes a response from a frame's code byte and body.
    pub fn decode(code: u8, body: &[u8]) -> WireResult<Self> {
        let mut buf = body;
        let response = match MessageCode::from_u8(code)? {
            MessageCode::PingResp => Response::Pong,
            MessageCode::GetClientIdResp => Response::ClientId {
                client_id: take_bytes(&mut buf)?,
            },
            MessageCode::SetClientIdResp => Response::ClientIdSet,
            MessageCode::ServerInfoResp => Response::ServerInfo {
                node: take_bytes(&mut buf)?,
                version: take_bytes(&mut buf)?,
            },
            MessageCode::GetResp => {
                let found = take_u8(&mut buf)? != 0;
                let value = if found { Some(take_bytes(&mut buf)?) } else { None };
                Response::Get { value }
            }
            MessageCode::PutResp => {
                let has_body = take_u8(&mut buf)? != 0;
                let value = if has_body { Some(take_bytes(&mut buf)?) } else { None };
                Response::Put { value }
            }
            MessageCode::DeleteResp => Response::Deleted,
            MessageCode::ListBucketsResp => {
                let count = take_u32(&mut buf)? as usize;
                let mut buckets = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    buckets.push(take_bytes(&mut buf)?);
                }
                Response::Buckets { buckets }
            }
            MessageCode::MapRedResp => {
                let phase = take_u32(&mut buf)?;
                let done = take_u8(&mut buf)? != 0;
                let has_payload = take_u8(&mut buf)? != 0;
                let payload = if has_payload { Some(take_bytes(&mut buf)?) } else { None };
                Response::MapRed { phase, payload, done }
            }
            MessageCode::Error => Response::Error {
                code: take_u32(&mut buf)?,
                message: take_bytes(&mut buf)?,
            },
            _ => return Err(WireError::Malformed("request code in response position")),
        };

        if buf.has_remaining() {
            return Err(WireError::Malformed("trailing bytes after message body"));
        }
        Ok(response)
    }
}

fn put_bytes(out: &mut Vec<u8>, data: &[u8]) {
    out.put_u32(data.len() as u32);
    out.put_slice(data);
}

fn take_u8(buf: &mut &[u8]) -> WireResult<u8> {
    if buf.remaining() < 1 {
        return Err(WireError::Truncated);
    }
    Ok(buf.get_u8())
}

fn take_u32(buf: &mut &[u8]) -> WireResult<u32> {
    if buf.remaining() < 4 {
        return Err(WireError::Truncated);
    }
    Ok(buf.get_u32())
}

fn take_bytes(buf: &mut &[u8]) -> WireResult<Vec<u8>> {
    let len = take_u32(buf)? as usize;
    if buf.remaining() < len {
        return Err(WireError::Truncated);
    }
    let mut data = vec![0u8; len];
    buf.copy_to_slice(&mut data);
    Ok(data)
}
