//! Slot ledger: a bounded channel that doubles as a counting semaphore.
//!
//! The ledger is created full (`capacity` placeholders). A slot leaves it on
//! acquire and comes back on release, so its length plus the number of
//! buffers held by callers is always `capacity`.

use bytepool_core::{CancelToken, Deadline};
use crossbeam_channel::{select, Receiver, RecvError, Sender};

use crate::error::{Error, Result};
use crate::pool::Buffer;

/// One unit of the pool's slot budget.
#[derive(Debug)]
pub enum Slot {
    /// Permission to allocate a fresh buffer. Carries no memory.
    Placeholder,
    /// An allocated buffer waiting to be reused.
    Filled(Buffer),
}

pub struct Ledger {
    tx: Sender<Slot>,
    rx: Receiver<Slot>,
    capacity: usize,
}

impl Ledger {
    /// Ledger holding `capacity` placeholders. `capacity` must be at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        for _ in 0..capacity {
            // Cannot fail: the channel is empty and sized for exactly this many.
            let _ = tx.try_send(Slot::Placeholder);
        }
        Self { tx, rx, capacity }
    }

    /// Wait for a slot until the deadline expires or its token is cancelled.
    ///
    /// On error no slot has been taken.
    pub fn take(&self, deadline: &Deadline) -> Result<Slot> {
        deadline.check()?;

        let never = crossbeam_channel::never();
        let cancel = deadline.cancel_token().map_or(&never, CancelToken::receiver);
        let timer = deadline
            .remaining()
            .map_or_else(crossbeam_channel::never, crossbeam_channel::after);

        select! {
            recv(self.rx) -> slot => Ok(opened(slot)),
            recv(cancel) -> _ => Err(Error::Cancelled),
            recv(timer) -> _ => Err(Error::DeadlineExceeded),
        }
    }

    /// Wait for a slot with no time limit.
    pub fn take_blocking(&self) -> Slot {
        opened(self.rx.recv())
    }

    pub fn try_take(&self) -> Option<Slot> {
        self.rx.try_recv().ok()
    }

    /// Return a slot without blocking. A slot that does not fit is dropped
    /// and `false` is returned.
    pub fn put(&self, slot: Slot) -> bool {
        self.tx.try_send(slot).is_ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// The ledger owns a sender for its whole life, so receives never see a
// disconnected channel.
fn opened(slot: std::result::Result<Slot, RecvError>) -> Slot {
    match slot {
        Ok(slot) => slot,
        Err(RecvError) => unreachable!("slot ledger disconnected while still owned"),
    }
}
