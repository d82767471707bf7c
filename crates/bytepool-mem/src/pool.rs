//! Bounded pool of fixed-size byte buffers.
//!
//! All transient I/O scratch buffers of one size should be borrowed here so
//! resident memory stays under `max_count * buffer_size`.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use bytepool_core::{BufferId, Deadline, IdGenerator, PoolConfig};
use crossbeam_channel::Sender;

use crate::error::Result;
use crate::guard::LeakGuard;
use crate::ledger::{Ledger, Slot};
use crate::reclaimer;
use crate::registry::Registry;

/// A pooled buffer detached from its handle.
///
/// Produced by [`Handle::detach`]. It carries the identity assigned when its
/// memory was allocated; passing it to [`Pool::release`] returns its slot.
/// Nothing guards a detached buffer: dropping it without a release
/// permanently removes one slot from the pool.
#[derive(PartialEq, Eq)]
pub struct Buffer {
    id: BufferId,
    bytes: Vec<u8>,
}

impl Buffer {
    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Full access to the backing vector. A buffer whose length or capacity
    /// no longer matches the pool's `buffer_size` is discarded on release.
    pub fn bytes_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl Deref for Buffer {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl DerefMut for Buffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bytes
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl From<Handle> for Buffer {
    fn from(handle: Handle) -> Self {
        handle.detach()
    }
}

/// Caller-owned borrow of one pooled buffer.
///
/// Return it with [`Handle::release`]. Dropping it instead restores an empty
/// slot to the pool and frees the memory.
pub struct Handle {
    id: BufferId,
    bytes: Vec<u8>,
    guard: LeakGuard,
}

impl Handle {
    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.bytes
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Full access to the backing vector, e.g. to swap in other memory.
    pub fn as_mut_vec(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    /// The pool this handle was borrowed from.
    pub fn pool(&self) -> Pool {
        Pool {
            shared: Arc::clone(self.guard.shared()),
        }
    }

    /// Give the buffer back to its pool.
    pub fn release(self) {
        let Handle {
            id,
            bytes,
            mut guard,
        } = self;
        guard.disarm();
        guard.shared().release(Some(Buffer { id, bytes }));
    }

    /// Take the buffer out of the handle, disarming the leak guard.
    pub fn detach(self) -> Buffer {
        let Handle {
            id,
            bytes,
            mut guard,
        } = self;
        guard.disarm();
        Buffer { id, bytes }
    }
}

impl Deref for Handle {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl DerefMut for Handle {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bytes
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// State shared by the pool, its handles, and the reclaimer.
pub(crate) struct Shared {
    ledger: Ledger,
    registry: Registry,
    ids: IdGenerator,
    buffer_size: usize,
    // Dropping this disconnects the reclaimer's shutdown channel.
    _reclaimer_stop: Option<Sender<()>>,
}

impl Shared {
    /// Turn a slot taken from the ledger into a caller-owned handle.
    fn checkout(self: &Arc<Self>, slot: Slot) -> Handle {
        let (id, bytes) = match slot {
            Slot::Placeholder => {
                let id = self.ids.next_id();
                #[cfg(feature = "tracing")]
                tracing::trace!(%id, bytes = self.buffer_size, "allocating pooled buffer");
                (id, vec![0u8; self.buffer_size])
            }
            Slot::Filled(Buffer { id, bytes }) => {
                self.registry.clear(id);
                (id, bytes)
            }
        };
        Handle {
            id,
            bytes,
            guard: LeakGuard::new(Arc::clone(self)),
        }
    }

    /// Return a slot to the ledger. `None` returns a placeholder.
    ///
    /// Never blocks and never fails: a duplicate release is ignored, a buffer
    /// of the wrong size is replaced by a placeholder, and a slot that does
    /// not fit in the ledger is dropped.
    pub(crate) fn release(&self, buf: Option<Buffer>) {
        let slot = match buf {
            None => Slot::Placeholder,
            Some(buf)
                if buf.bytes.len() != self.buffer_size
                    || buf.bytes.capacity() != self.buffer_size =>
            {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    id = %buf.id,
                    len = buf.bytes.len(),
                    capacity = buf.bytes.capacity(),
                    expected = self.buffer_size,
                    "discarding buffer of unexpected size"
                );
                Slot::Placeholder
            }
            Some(buf) => {
                if !self.registry.mark_returned(buf.id) {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(id = %buf.id, "ignoring duplicate release");
                    return;
                }
                Slot::Filled(buf)
            }
        };
        self.restore(slot);
    }

    /// One reclaimer tick: trade at most one idle buffer for a placeholder.
    /// Returns whether memory was freed.
    pub(crate) fn sweep(&self) -> bool {
        match self.ledger.try_take() {
            None => false,
            Some(Slot::Placeholder) => {
                self.restore(Slot::Placeholder);
                false
            }
            Some(Slot::Filled(buf)) => {
                self.registry.clear(buf.id);
                #[cfg(feature = "tracing")]
                tracing::trace!(id = %buf.id, "reclaiming idle buffer");
                drop(buf);
                self.restore(Slot::Placeholder);
                true
            }
        }
    }

    fn restore(&self, slot: Slot) {
        if !self.ledger.put(slot) {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                capacity = self.ledger.capacity(),
                "slot ledger already full; dropping returned slot"
            );
        }
    }
}

/// Bounded pool of `max_count` buffers of exactly `buffer_size` bytes.
///
/// Cloning is cheap and every clone refers to the same pool.
#[derive(Clone)]
pub struct Pool {
    shared: Arc<Shared>,
}

impl Pool {
    /// Build a pool. A zero `sweep_interval` disables the reclaimer.
    pub fn new(max_count: usize, buffer_size: usize, sweep_interval: Duration) -> Result<Self> {
        Self::with_config(&PoolConfig::new(max_count, buffer_size, sweep_interval))
    }

    pub fn with_config(cfg: &PoolConfig) -> Result<Self> {
        cfg.validate()?;

        let interval = cfg.sweep_interval();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let shared = Arc::new(Shared {
            ledger: Ledger::new(cfg.max_count),
            registry: Registry::new(),
            ids: IdGenerator::new(),
            buffer_size: cfg.buffer_size,
            _reclaimer_stop: interval.map(|_| stop_tx),
        });

        if let Some(interval) = interval {
            reclaimer::spawn(Arc::downgrade(&shared), stop_rx, interval)?;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            max_count = cfg.max_count,
            buffer_size = cfg.buffer_size,
            sweep_interval_ms = cfg.sweep_interval_ms,
            "byte pool created"
        );

        Ok(Self { shared })
    }

    /// Borrow a buffer, waiting as long as it takes for a slot.
    pub fn acquire(&self) -> Handle {
        let slot = self.shared.ledger.take_blocking();
        self.shared.checkout(slot)
    }

    /// Borrow a buffer only if a slot is free right now.
    pub fn try_acquire(&self) -> Option<Handle> {
        let slot = self.shared.ledger.try_take()?;
        Some(self.shared.checkout(slot))
    }

    /// Borrow a buffer, giving up when `deadline` expires or is cancelled.
    ///
    /// On error the pool is unchanged.
    pub fn acquire_with_deadline(&self, deadline: &Deadline) -> Result<Handle> {
        match self.shared.ledger.take(deadline) {
            Ok(slot) => Ok(self.shared.checkout(slot)),
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(error = %e, "acquire gave up");
                Err(e)
            }
        }
    }

    /// Return a buffer to the pool; `None` returns an empty slot.
    pub fn release(&self, buf: Option<Buffer>) {
        self.shared.release(buf);
    }

    /// Run one reclaimer tick now. Returns whether an idle buffer was freed.
    pub fn sweep(&self) -> bool {
        self.shared.sweep()
    }

    pub fn buffer_size(&self) -> usize {
        self.shared.buffer_size
    }

    pub fn max_count(&self) -> usize {
        self.shared.ledger.capacity()
    }

    /// Slots currently in the ledger, filled or not.
    pub fn available(&self) -> usize {
        self.shared.ledger.len()
    }

    /// Slots currently borrowed by callers.
    pub fn outstanding(&self) -> usize {
        self.max_count().saturating_sub(self.available())
    }

    pub fn max_memory_bytes(&self) -> usize {
        self.max_count() * self.buffer_size()
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("max_count", &self.max_count())
            .field("buffer_size", &self.buffer_size())
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use super::*;

    // Same identity and contents; only reachable inside the crate.
    fn forge_copy(buf: &Buffer) -> Buffer {
        Buffer {
            id: buf.id,
            bytes: buf.bytes.clone(),
        }
    }

    fn pool(max_count: usize, buffer_size: usize) -> Pool {
        Pool::new(max_count, buffer_size, Duration::ZERO).expect("valid pool")
    }

    #[test]
    fn placeholder_allocates_zeroed_buffer() {
        let p = pool(2, 3);
        let h = p.acquire();
        assert_eq!(h.data(), &[0, 0, 0]);
        assert_eq!(h.len(), 3);
        assert_eq!(p.available(), 1);
        assert_eq!(p.outstanding(), 1);
        h.release();
        assert_eq!(p.available(), 2);
    }

    #[test]
    fn filled_slot_clears_registry_entry_on_reacquire() {
        let p = pool(1, 4);
        let h = p.acquire();
        let id = h.id();
        h.release();
        assert!(p.shared.registry.contains(id));

        let h = p.acquire();
        assert_eq!(h.id(), id);
        assert!(!p.shared.registry.contains(id));
        h.release();
    }

    #[test]
    fn sweep_converts_one_filled_slot() {
        let p = pool(2, 8);
        let a = p.acquire();
        let b = p.acquire();
        a.release();
        b.release();

        let filled = |p: &Pool| {
            let mut slots = Vec::new();
            while let Some(s) = p.shared.ledger.try_take() {
                slots.push(s);
            }
            let n = slots
                .iter()
                .filter(|s| matches!(s, Slot::Filled(_)))
                .count();
            for s in slots {
                p.shared.ledger.put(s);
            }
            n
        };

        assert_eq!(filled(&p), 2);
        assert!(p.sweep());
        assert_eq!(p.available(), 2);
        assert_eq!(filled(&p), 1);
        assert!(p.shared.registry.len() <= 1);
    }

    #[test]
    fn sweep_on_empty_ledger_is_noop() {
        let p = pool(1, 8);
        let h = p.acquire();
        assert!(!p.sweep());
        assert_eq!(p.available(), 0);
        drop(h);
        assert_eq!(p.available(), 1);
    }

    #[test]
    fn handle_pool_refers_to_same_pool() {
        let p = pool(2, 8);
        let h = p.acquire();
        let q = h.pool();
        assert_eq!(q.outstanding(), 1);
        h.release();
        assert_eq!(q.outstanding(), 0);
    }

    #[test]
    fn duplicate_release_is_ignored() {
        let p = pool(2, 4);
        let _held = p.acquire();
        let buf = p.acquire().detach();
        let copy = forge_copy(&buf);
        let again = forge_copy(&buf);

        p.release(Some(buf));
        assert_eq!(p.available(), 1);
        p.release(Some(copy));
        p.release(Some(again));
        assert_eq!(p.available(), 1);
        assert_eq!(p.shared.registry.len(), 1);
    }

    #[test]
    fn racing_duplicate_releases_insert_once() {
        let p = pool(2, 8);
        let _held = p.acquire();
        let buf = p.acquire().detach();
        let barrier = Arc::new(Barrier::new(8));

        let racers: Vec<_> = (0..8)
            .map(|_| {
                let p = p.clone();
                let buf = forge_copy(&buf);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    p.release(Some(buf));
                })
            })
            .collect();
        for r in racers {
            r.join().expect("racer panicked");
        }

        assert_eq!(p.available(), 1);
        assert_eq!(p.shared.registry.len(), 1);
    }

    #[test]
    fn wrong_size_release_does_not_register_id() {
        let p = pool(1, 8);
        for _ in 0..1000 {
            let mut h = p.acquire();
            h.as_mut_vec().push(1);
            h.release();
            assert_eq!(p.available(), 1);
        }
        assert!(p.shared.registry.len() <= p.max_count());
        assert!(p.shared.registry.is_empty());
    }

    #[test]
    fn registry_stays_bounded_by_capacity() {
        let p = pool(3, 8);
        for round in 0..100 {
            let handles: Vec<_> = (0..3).map(|_| p.acquire()).collect();
            for (i, mut h) in handles.into_iter().enumerate() {
                if (round + i) % 2 == 0 {
                    h.as_mut_vec().truncate(4);
                }
                h.release();
            }
            if round % 7 == 0 {
                p.sweep();
            }
            assert!(p.shared.registry.len() <= p.max_count());
        }
        assert_eq!(p.available(), 3);
    }
}
