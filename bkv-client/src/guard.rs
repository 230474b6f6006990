//! # Usage Guard
//!
//! Purpose: Scope every use of a borrowed connection between required setup
//! (identity announcement) and guaranteed teardown.
//!
//! Teardown runs on every exit path, including an operation that returns an
//! error or unwinds. It is best-effort: a teardown failure is logged and
//! never replaces the operation's own result.

use crate::connection::Connection;
use crate::result::OpResult;

/// Scoped setup/teardown wrapper around one lease.
pub(crate) struct ConnectionUsage<'c> {
    conn: &'c mut Connection,
}

impl<'c> ConnectionUsage<'c> {
    /// Runs per-use setup and hands back the guarded connection.
    ///
    /// When `identity` is supplied, it is announced on the wire before the
    /// caller's operation sees the connection.
    pub(crate) fn begin(conn: &'c mut Connection, identity: Option<&[u8]>) -> OpResult<Self> {
        if let Some(client_id) = identity {
            conn.announce_identity(client_id)?;
        }
        Ok(ConnectionUsage { conn })
    }

    pub(crate) fn connection(&mut self) -> &mut Connection {
        self.conn
    }
}

impl Drop for ConnectionUsage<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.conn.finish_use() {
            tracing::warn!(error = %err, "connection teardown failed");
        }
    }
}
