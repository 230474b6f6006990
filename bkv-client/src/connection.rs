//! # Pooled Connection
//!
//! Purpose: One TCP connection to a cluster node, with buffered reads,
//! reusable write buffers, and frame-level exchange.
//!
//! ## Design Principles
//! 1. **Opaque Resource**: The pool only creates, lends, and destroys
//!    connections; everything protocol-shaped lives here.
//! 2. **Cache-Friendly Buffers**: The write buffer is owned by the
//!    connection and reused across calls.
//! 3. **Poison On Failure**: Any transport or framing error marks the
//!    connection dirty so it is destroyed instead of recycled.

use std::io::{BufReader, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use bkv_common::{read_frame, Request, Response};

use crate::config::ClientConfig;
use crate::result::{OpError, OpResult};

/// Single pooled connection to a cluster node.
pub struct Connection {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<TcpStream>,
    write_buf: Vec<u8>,
    dirty: bool,
}

impl Connection {
    /// Opens a connection to the configured endpoint.
    pub(crate) fn dial(config: &ClientConfig) -> std::io::Result<Self> {
        let stream = connect_stream(config)?;
        if let Some(timeout) = config.read_timeout {
            stream.set_read_timeout(Some(timeout))?;
        }
        if let Some(timeout) = config.write_timeout {
            stream.set_write_timeout(Some(timeout))?;
        }
        // Disable Nagle to keep request latency low for small frames.
        stream.set_nodelay(true)?;
        tracing::debug!(host = %config.host, port = config.port, "opened connection");

        Ok(Connection {
            reader: BufReader::new(stream),
            write_buf: Vec::with_capacity(256),
            dirty: false,
        })
    }

    /// Sends one request frame.
    pub fn send(&mut self, request: &Request) -> OpResult<()> {
        self.write_buf.clear();
        request.encode(&mut self.write_buf);

        if let Err(err) = self.write_and_flush() {
            self.dirty = true;
            return Err(OpError::communication(err.to_string()));
        }
        Ok(())
    }

    fn write_and_flush(&mut self) -> std::io::Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()
    }

    /// Reads one response frame.
    pub fn receive(&mut self) -> OpResult<Response> {
        let decoded =
            read_frame(&mut self.reader).and_then(|(code, body)| Response::decode(code, &body));
        match decoded {
            Ok(response) => Ok(response),
            Err(err) => {
                // Either the stream died or its position is unknown.
                self.dirty = true;
                Err(err.into())
            }
        }
    }

    /// Sends a request and reads its response.
    pub fn exchange(&mut self, request: &Request) -> OpResult<Response> {
        self.send(request)?;
        self.receive()
    }

    /// Announces the caller's identity on this connection.
    pub(crate) fn announce_identity(&mut self, client_id: &[u8]) -> OpResult<()> {
        let request = Request::SetClientId {
            client_id: client_id.to_vec(),
        };
        match self.exchange(&request)? {
            Response::ClientIdSet => Ok(()),
            Response::Error { code, message } => Err(OpError::from_server(code, &message)),
            _ => {
                self.dirty = true;
                Err(OpError::invalid_response("unexpected reply to set-client-id"))
            }
        }
    }

    /// True when the connection must not be recycled.
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Poisons the connection without a transport error, e.g. when a
    /// response stream was abandoned midway.
    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Per-use teardown: drop scratch state and cut a poisoned socket.
    pub(crate) fn finish_use(&mut self) -> std::io::Result<()> {
        self.write_buf.clear();
        if self.dirty {
            self.reader.get_ref().shutdown(Shutdown::Both)?;
        }
        Ok(())
    }

    /// Releases the underlying socket. Used as the pool's destroyer.
    pub(crate) fn close(self) {
        if let Err(err) = self.reader.get_ref().shutdown(Shutdown::Both) {
            tracing::debug!(error = %err, "socket shutdown failed");
        }
    }
}

fn connect_stream(config: &ClientConfig) -> std::io::Result<TcpStream> {
    let endpoint = config.endpoint();
    match config.connect_timeout {
        Some(timeout) => {
            let mut last_err = None;
            for addr in endpoint.to_socket_addrs()? {
                match TcpStream::connect_timeout(&addr, timeout) {
                    Ok(stream) => return Ok(stream),
                    Err(err) => last_err = Some(err),
                }
            }
            Err(last_err.unwrap_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    "endpoint resolved to no addresses",
                )
            }))
        }
        None => TcpStream::connect(endpoint),
    }
}
