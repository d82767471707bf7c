//! Convenient re-exports for downstream crates.

pub use crate::config::PoolConfig;
pub use crate::deadline::{CancelToken, Deadline};
pub use crate::error::{Error, Result};
pub use crate::id::{BufferId, IdGenerator};
