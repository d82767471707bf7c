//! Strongly-typed identifiers used across the pool.
//!
//! Buffer identities are never derived from memory addresses: an address can
//! be handed out again after the allocator reclaims it, an id cannot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

new_id!(BufferId);

/// Monotonic source of [`BufferId`]s.
///
/// Each pool owns its own generator so independent pools never share state.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Generator whose first id is `BufferId(1)`.
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> BufferId {
        BufferId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_start_at_one() {
        let ids = IdGenerator::new();
        assert_eq!(ids.next_id(), BufferId::new(1));
        assert_eq!(ids.next_id(), BufferId::new(2));
        assert!(ids.next_id() > BufferId::new(2));
    }

    #[test]
    fn generators_are_independent() {
        let a = IdGenerator::new();
        let b = IdGenerator::new();
        a.next_id();
        a.next_id();
        assert_eq!(b.next_id(), BufferId::new(1));
    }

    #[test]
    fn display_names_the_type() {
        assert_eq!(BufferId::new(7).to_string(), "BufferId(7)");
    }
}
