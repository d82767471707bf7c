#![forbid(unsafe_code)]
//! bytepool-mem: bounded pool of fixed-size byte buffers.
//!
//! The pool caps resident buffer memory at `max_count * buffer_size`. Every
//! slot lives in a bounded ledger as either a placeholder (permission to
//! allocate) or a filled buffer; the ledger plus the buffers held by callers
//! always add up to `max_count`. Acquire blocks on an empty ledger, which is
//! the backpressure mechanism. Handles dropped without being released put a
//! placeholder back from their drop guard, and an optional reclaimer thread
//! trims one idle buffer per sweep interval.

pub mod error;
mod guard;
mod ledger;
pub mod pool;
mod reclaimer;
mod registry;

pub use bytepool_core::{BufferId, CancelToken, Deadline, PoolConfig};
pub use error::{Error, Result};
pub use pool::{Buffer, Handle, Pool};
