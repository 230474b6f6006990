//! # BucketKV Client
//!
//! Purpose: Provide a blocking client for a clustered, bucket-oriented
//! key-value store, hiding connection churn and concurrent access behind a
//! small, safe execution surface.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: A bounded pool of TCP connections with
//!    timeout-bounded, blocking acquisition.
//! 2. **Guarded Execution**: Every borrowed connection passes through
//!    per-use identity setup and guaranteed teardown.
//! 3. **Uniform Results**: Expected failures are values in a closed error
//!    enumeration, never panics.
//! 4. **Protocol Clarity**: Framing and message layouts are explicit, in
//!    the shared `bkv-common` crate.

mod client;
mod config;
mod connection;
mod guard;
mod keyfilter;
mod manager;
mod mapred;
mod pool;
mod result;

pub use client::{KvClient, MapRedOutput, ServerInfo};
pub use config::{ClientConfig, ConfigError};
pub use connection::Connection;
pub use keyfilter::KeyFilter;
pub use manager::ConnectionManager;
pub use mapred::{ErlangPhase, JsPhase, MapRedError, MapReduceQuery, MAPRED_CONTENT_TYPE};
pub use pool::{PoolGuard, ResourcePool};
pub use result::{OpError, OpResult};
