//! # Connection Manager
//!
//! Purpose: The single entry point for running an operation against some
//! pooled connection, with shutdown fast-fail and uniform error mapping.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: Owns one pool; callers never touch it directly.
//! 2. **One-Way Shutdown**: The latch flips Active → ShuttingDown once and
//!    never back; calls past the latch complete normally.
//! 3. **Uniform Failures**: Pool-level failures become `Communication`
//!    errors; the wrapped operation's result passes through unchanged.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{ClientConfig, ConfigError};
use crate::connection::Connection;
use crate::guard::ConnectionUsage;
use crate::pool::{PoolGuard, ResourcePool};
use crate::result::{OpError, OpResult};

/// Runs caller operations against a pool of connections.
pub struct ConnectionManager {
    pool: ResourcePool<Connection>,
    identity: Vec<u8>,
    disposing: AtomicBool,
}

impl ConnectionManager {
    /// Builds a manager and its (empty) pool for the configured endpoint.
    ///
    /// No connection is opened here; the pool dials lazily on first use.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let identity = config.client_id.clone().into_bytes();
        let acquire_timeout = config.acquire_timeout;
        let pool_size = config.pool_size;
        let factory = move || match Connection::dial(&config) {
            Ok(conn) => Some(conn),
            Err(err) => {
                tracing::warn!(error = %err, "failed to open connection");
                None
            }
        };

        Ok(ConnectionManager {
            pool: ResourcePool::new(pool_size, acquire_timeout, factory, Connection::close),
            identity,
            disposing: AtomicBool::new(false),
        })
    }

    /// Runs `op` against a pooled connection with identity setup applied.
    pub fn use_connection<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> OpResult<T>,
    ) -> OpResult<T> {
        self.use_connection_with(true, op)
    }

    /// Runs `op` against a pooled connection.
    ///
    /// Fails fast with `ShuttingDown` once disposal has begun; maps an
    /// acquisition timeout or dial failure to `Communication`; otherwise
    /// returns `op`'s result unchanged.
    pub fn use_connection_with<T>(
        &self,
        set_identity: bool,
        op: impl FnOnce(&mut Connection) -> OpResult<T>,
    ) -> OpResult<T> {
        if self.disposing.load(Ordering::SeqCst) {
            return Err(OpError::ShuttingDown);
        }

        let identity = set_identity.then_some(self.identity.as_slice());
        let outcome = self.pool.consume(|guard| {
            let result = run_guarded(guard, identity, op);
            if guard.is_dirty() {
                guard.invalidate();
            }
            result
        });

        match outcome {
            Some(result) => result,
            None => Err(OpError::communication(
                "no pooled connection available within the acquire timeout",
            )),
        }
    }

    /// Tears the manager down: flips the latch, then disposes the pool.
    ///
    /// Idempotent. In-flight operations complete; their connections are
    /// destroyed on release instead of recycled.
    pub fn dispose(&self) {
        if self.disposing.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!("disposing connection manager");
        self.pool.dispose();
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn run_guarded<T>(
    guard: &mut PoolGuard<Connection>,
    identity: Option<&[u8]>,
    op: impl FnOnce(&mut Connection) -> OpResult<T>,
) -> OpResult<T> {
    let mut usage = ConnectionUsage::begin(guard, identity)?;
    op(usage.connection())
}
