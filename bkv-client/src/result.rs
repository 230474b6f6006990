//! # Operation Results
//!
//! Purpose: Give every client operation one uniform success/failure shape so
//! callers branch on error variants instead of catching panics.
//!
//! ## Design Principles
//! 1. **Closed Enumeration**: The error set is fixed; callers can match
//!    exhaustively and rely on it.
//! 2. **No Panics**: Expected failures (timeouts, shutdown, server errors)
//!    always travel as values.
//! 3. **Message Passthrough**: Server-reported errors keep their text.

use bkv_common::WireError;
use thiserror::Error;

/// Result type for client operations.
pub type OpResult<T> = Result<T, OpError>;

/// Errors surfaced by client operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    /// No usable connection could be supplied within the acquire timeout,
    /// or the transport failed mid-operation. Transient; retry upstream.
    #[error("communication error: {message}")]
    Communication { message: String },
    /// The client is being or has been disposed. Fatal for this instance.
    #[error("client is shutting down")]
    ShuttingDown,
    /// The request could not be built from the caller's arguments.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
    /// The server answered with a frame the operation does not recognize.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },
    /// The server reported that the requested object does not exist.
    #[error("not found")]
    NotFound,
    /// The server reported an operation failure.
    #[error("server error {code}: {message}")]
    Server { code: u32, message: String },
}

impl OpError {
    pub fn communication(message: impl Into<String>) -> Self {
        OpError::Communication {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        OpError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        OpError::InvalidResponse {
            message: message.into(),
        }
    }

    /// Maps a server error frame into the result model.
    pub fn from_server(code: u32, message: &[u8]) -> Self {
        if code == bkv_common::ERR_NOT_FOUND {
            return OpError::NotFound;
        }
        OpError::Server {
            code,
            message: String::from_utf8_lossy(message).into_owned(),
        }
    }
}

impl From<WireError> for OpError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Io(err) => OpError::communication(err.to_string()),
            other => OpError::invalid_response(other.to_string()),
        }
    }
}
