#![forbid(unsafe_code)]
//! bytepool: a bounded pool of fixed-size byte buffers.
//!
//! Re-exports the public API of the workspace crates. See `bytepool-mem` for
//! the pool itself and `bytepool-core` for configuration and deadlines.

pub use bytepool_core::{BufferId, CancelToken, Deadline, PoolConfig};
pub use bytepool_mem::{Buffer, Error, Handle, Pool, Result};
