// bkv-common - Shared wire protocol definitions for BucketKV
//
// This crate defines the framed binary protocol spoken between BucketKV
// clients and cluster nodes.

pub mod error;
pub mod frame;
pub mod message;

// Re-export for convenience
pub use error::*;
pub use frame::*;
pub use message::*;
