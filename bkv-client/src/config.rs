//! # Client Configuration
//!
//! Purpose: Collect every tunable of the client in one serializable struct
//! with sane defaults and a construction-time validity gate.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected configuration values.
///
/// These are contract violations, caught before any pool or socket exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("pool_size must be at least 1")]
    ZeroPoolSize,
    #[error("acquire_timeout must be non-zero")]
    ZeroAcquireTimeout,
    #[error("client_id must not be empty")]
    EmptyClientId,
}

/// Configuration for the client and its connection pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Cluster node host name or address.
    pub host: String,
    /// Cluster node port.
    pub port: u16,
    /// Maximum pooled connections (idle + leased).
    pub pool_size: usize,
    /// How long an operation may wait for a pooled connection.
    pub acquire_timeout: Duration,
    /// Identity announced on each guarded use of a connection.
    pub client_id: String,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "127.0.0.1".to_string(),
            port: 8087,
            pool_size: 16,
            acquire_timeout: Duration::from_secs(4),
            client_id: "bkv-client".to_string(),
            connect_timeout: Some(Duration::from_secs(4)),
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the given endpoint with default tuning.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ClientConfig {
            host: host.into(),
            port,
            ..ClientConfig::default()
        }
    }

    /// Checks construction-time invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::ZeroPoolSize);
        }
        if self.acquire_timeout.is_zero() {
            return Err(ConfigError::ZeroAcquireTimeout);
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::EmptyClientId);
        }
        Ok(())
    }

    pub(crate) fn endpoint(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}
