#![forbid(unsafe_code)]
//! bytepool-core: identifiers, configuration, and cancellation primitives.
//!
//! Everything here is shared by the pool implementation in `bytepool-mem`
//! and by callers that only need to build a config or a deadline.

pub mod config;
pub mod deadline;
pub mod error;
pub mod id;
pub mod prelude;

pub use config::PoolConfig;
pub use deadline::{CancelToken, Deadline};
pub use error::{Error, Result};
pub use id::{BufferId, IdGenerator};
