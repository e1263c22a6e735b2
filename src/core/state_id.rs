//! Recyclable state ids.
//!
//! Every core gets a small integer id used downstream for state sorting.
//! Ids below [`StateId::FIRST_ALLOCATED`] are reserved for the per-category
//! default cores; the rest are handed out by a [`StateIdPool`] that reuses
//! released ids lowest-first.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::core::CoreKind;

/// Globally unique (while live), recyclable core state id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u32);

impl StateId {
    /// First id handed out by the pool; everything below is reserved.
    pub const FIRST_ALLOCATED: u32 = CoreKind::COUNT as u32;

    #[inline]
    pub(crate) const fn reserved(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Whether this id belongs to a category default core.
    #[inline]
    #[must_use]
    pub fn is_reserved(self) -> bool {
        self.0 < Self::FIRST_ALLOCATED
    }
}

/// Allocator for [`StateId`]s with a free list.
#[derive(Debug)]
pub struct StateIdPool {
    next: u32,
    free: BinaryHeap<Reverse<u32>>,
}

impl Default for StateIdPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StateIdPool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: StateId::FIRST_ALLOCATED,
            free: BinaryHeap::new(),
        }
    }

    /// Takes the lowest released id, or a fresh one when none is free.
    pub fn acquire(&mut self) -> StateId {
        if let Some(Reverse(id)) = self.free.pop() {
            return StateId(id);
        }
        let id = self.next;
        self.next += 1;
        StateId(id)
    }

    /// Returns an id to the pool.
    pub fn release(&mut self, id: StateId) {
        debug_assert!(!id.is_reserved(), "reserved state id {} released", id.0);
        debug_assert!(id.0 < self.next, "state id {} was never acquired", id.0);
        self.free.push(Reverse(id.0));
    }

    /// Number of ids currently handed out.
    #[must_use]
    pub fn live(&self) -> usize {
        (self.next - StateId::FIRST_ALLOCATED) as usize - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_after_reserved_range() {
        let mut pool = StateIdPool::new();
        let id = pool.acquire();
        assert_eq!(id.get(), StateId::FIRST_ALLOCATED);
        assert!(!id.is_reserved());
        assert!(CoreKind::Xform.default_state_id().is_reserved());
    }

    #[test]
    fn released_ids_are_recycled_lowest_first() {
        let mut pool = StateIdPool::new();
        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();
        pool.release(c);
        pool.release(a);
        assert_eq!(pool.live(), 1);

        assert_eq!(pool.acquire(), a);
        assert_eq!(pool.acquire(), c);
        assert_ne!(pool.acquire(), b);
        assert_eq!(pool.live(), 4);
    }
}
