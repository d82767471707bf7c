//! Identity registry: remembers which buffer ids are already back in the
//! ledger so a second release of the same id is ignored.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use bytepool_core::BufferId;

#[derive(Debug, Default)]
pub struct Registry {
    returned: Mutex<HashSet<BufferId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically record `id` as returned. Returns `false` if it already was.
    pub fn mark_returned(&self, id: BufferId) -> bool {
        self.lock().insert(id)
    }

    /// Forget `id`; called when its buffer leaves the ledger again.
    pub fn clear(&self, id: BufferId) {
        self.lock().remove(&id);
    }

    #[cfg(test)]
    pub fn contains(&self, id: BufferId) -> bool {
        self.lock().contains(&id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<BufferId>> {
        self.returned.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn second_mark_is_rejected_until_cleared() {
        let reg = Registry::new();
        let id = BufferId::new(1);
        assert!(reg.mark_returned(id));
        assert!(!reg.mark_returned(id));
        assert!(reg.contains(id));

        reg.clear(id);
        assert!(reg.is_empty());
        assert!(reg.mark_returned(id));
    }

    #[test]
    fn concurrent_marks_admit_exactly_one() {
        let reg = Arc::new(Registry::new());
        let wins = Arc::new(AtomicUsize::new(0));
        let id = BufferId::new(42);

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                let wins = Arc::clone(&wins);
                std::thread::spawn(move || {
                    if reg.mark_returned(id) {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().expect("thread panicked");
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert_eq!(reg.len(), 1);
    }
}
