//! Leak guard carried by every [`Handle`](crate::Handle).
//!
//! A handle that is dropped without being released or detached puts a
//! placeholder back into the ledger, so forgetting to return a buffer never
//! shrinks the pool's slot budget. The leaked memory itself is freed with the
//! handle; only the right to allocate comes back.

use std::sync::Arc;

use crate::pool::Shared;

pub(crate) struct LeakGuard {
    shared: Arc<Shared>,
    armed: bool,
}

impl LeakGuard {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            armed: true,
        }
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Stop the guard from firing; the slot is being returned another way.
    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for LeakGuard {
    fn drop(&mut self) {
        if self.armed {
            self.armed = false;
            #[cfg(feature = "tracing")]
            tracing::debug!("handle dropped without release; restoring placeholder");
            self.shared.release(None);
        }
    }
}
