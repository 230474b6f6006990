//! # Client API
//!
//! Purpose: Expose one compact, blocking method per store operation, built
//! on the connection manager.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `KvClient` hides pooling, guarding, and framing.
//! 2. **Uniform Results**: Every method returns `OpResult`; unexpected
//!    frames map to `InvalidResponse`, server errors pass through.
//! 3. **Borrow-Friendly API**: Accept `&[u8]` to avoid unnecessary copies.

use bkv_common::{Request, Response};

use crate::config::{ClientConfig, ConfigError};
use crate::manager::ConnectionManager;
use crate::mapred::MapReduceQuery;
use crate::result::{OpError, OpResult};

/// Node identity and version reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub node: String,
    pub version: String,
}

/// One phase's output from a map-reduce stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRedOutput {
    /// Zero-based phase index the payload belongs to.
    pub phase: u32,
    /// Raw payload, JSON for `application/json` queries.
    pub payload: Vec<u8>,
}

/// Blocking client for a BucketKV cluster node.
pub struct KvClient {
    manager: ConnectionManager,
}

impl KvClient {
    /// Creates a client for the given endpoint with default tuning.
    pub fn connect(host: impl Into<String>, port: u16) -> Result<Self, ConfigError> {
        Self::with_config(ClientConfig::new(host, port))
    }

    /// Creates a client with a custom configuration.
    pub fn with_config(config: ClientConfig) -> Result<Self, ConfigError> {
        Ok(KvClient {
            manager: ConnectionManager::new(config)?,
        })
    }

    /// Checks that the node answers at all. Skips identity setup.
    pub fn ping(&self) -> OpResult<()> {
        self.manager
            .use_connection_with(false, |conn| match conn.exchange(&Request::Ping)? {
                Response::Pong => Ok(()),
                other => Err(unexpected("ping", other)),
            })
    }

    /// Fetches the node's identity and version.
    pub fn server_info(&self) -> OpResult<ServerInfo> {
        self.manager.use_connection_with(false, |conn| {
            match conn.exchange(&Request::ServerInfo)? {
                Response::ServerInfo { node, version } => Ok(ServerInfo {
                    node: String::from_utf8_lossy(&node).into_owned(),
                    version: String::from_utf8_lossy(&version).into_owned(),
                }),
                other => Err(unexpected("server-info", other)),
            }
        })
    }

    /// Asks the node which identity it currently has recorded for this
    /// connection.
    pub fn client_id(&self) -> OpResult<Vec<u8>> {
        self.manager
            .use_connection(|conn| match conn.exchange(&Request::GetClientId)? {
                Response::ClientId { client_id } => Ok(client_id),
                other => Err(unexpected("get-client-id", other)),
            })
    }

    /// Fetches a value. Returns `Ok(None)` when the key is missing.
    pub fn get(&self, bucket: &[u8], key: &[u8]) -> OpResult<Option<Vec<u8>>> {
        let request = Request::Get {
            bucket: bucket.to_vec(),
            key: key.to_vec(),
        };
        self.manager
            .use_connection(|conn| match conn.exchange(&request)? {
                Response::Get { value } => Ok(value),
                other => Err(unexpected("get", other)),
            })
    }

    /// Stores a value.
    pub fn put(&self, bucket: &[u8], key: &[u8], value: &[u8]) -> OpResult<()> {
        let request = Request::Put {
            bucket: bucket.to_vec(),
            key: key.to_vec(),
            value: value.to_vec(),
            return_body: false,
        };
        self.manager
            .use_connection(|conn| match conn.exchange(&request)? {
                Response::Put { .. } => Ok(()),
                other => Err(unexpected("put", other)),
            })
    }

    /// Stores a value and returns the body the server persisted.
    pub fn put_returning(
        &self,
        bucket: &[u8],
        key: &[u8],
        value: &[u8],
    ) -> OpResult<Option<Vec<u8>>> {
        let request = Request::Put {
            bucket: bucket.to_vec(),
            key: key.to_vec(),
            value: value.to_vec(),
            return_body: true,
        };
        self.manager
            .use_connection(|conn| match conn.exchange(&request)? {
                Response::Put { value } => Ok(value),
                other => Err(unexpected("put", other)),
            })
    }

    /// Deletes a key. Deleting a missing key is not an error.
    pub fn delete(&self, bucket: &[u8], key: &[u8]) -> OpResult<()> {
        let request = Request::Delete {
            bucket: bucket.to_vec(),
            key: key.to_vec(),
        };
        self.manager
            .use_connection(|conn| match conn.exchange(&request)? {
                Response::Deleted => Ok(()),
                other => Err(unexpected("delete", other)),
            })
    }

    /// Lists all buckets known to the node.
    pub fn list_buckets(&self) -> OpResult<Vec<Vec<u8>>> {
        self.manager
            .use_connection(|conn| match conn.exchange(&Request::ListBuckets)? {
                Response::Buckets { buckets } => Ok(buckets),
                other => Err(unexpected("list-buckets", other)),
            })
    }

    /// Submits a map-reduce query and collects the streamed phase outputs.
    pub fn map_reduce(&self, query: &MapReduceQuery) -> OpResult<Vec<MapRedOutput>> {
        let request = query
            .to_request()
            .map_err(|err| OpError::invalid_request(err.to_string()))?;

        self.manager.use_connection(|conn| {
            conn.send(&request)?;
            let mut outputs = Vec::new();
            loop {
                match conn.receive()? {
                    Response::MapRed { phase, payload, done } => {
                        if let Some(payload) = payload {
                            outputs.push(MapRedOutput { phase, payload });
                        }
                        if done {
                            return Ok(outputs);
                        }
                    }
                    Response::Error { code, message } => {
                        // The server terminates the stream on error.
                        return Err(OpError::from_server(code, &message));
                    }
                    _ => {
                        // The rest of the stream is unreadable from here.
                        conn.mark_dirty();
                        return Err(OpError::invalid_response("unexpected reply to map-reduce"));
                    }
                }
            }
        })
    }

    /// Tears the client down. Subsequent calls fail fast with
    /// `ShuttingDown`. Idempotent.
    pub fn dispose(&self) {
        self.manager.dispose();
    }
}

fn unexpected(operation: &'static str, response: Response) -> OpError {
    match response {
        Response::Error { code, message } => OpError::from_server(code, &message),
        _ => OpError::invalid_response(format!("unexpected reply to {operation}")),
    }
}
