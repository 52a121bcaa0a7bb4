//! Fixed-capacity pool of reusable chunk slots
//!
//! The pool never grows: when every slot is checked out, acquisition reports
//! exhaustion and the caller leaves the cell unfilled until reconciliation
//! frees capacity. This is the streaming system's backpressure valve, not an
//! error condition.

use std::sync::Mutex;

use crate::streaming::chunk::SlotId;

/// Free list over the chunk store's slot ids.
pub struct ChunkPool {
    free: Mutex<Vec<SlotId>>,
    capacity: usize,
}

impl ChunkPool {
    /// Pool with all `capacity` slots parked and available.
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new((0..capacity).rev().collect()),
            capacity,
        }
    }

    /// Default capacity for a streaming window of the given reach:
    /// `(2*reach + 1)^2 - 1`, sized once at startup.
    pub fn default_capacity(reach: i32) -> usize {
        let window = (2 * reach + 1) as usize;
        window * window - 1
    }

    /// Pop one parked slot, or None when the pool is exhausted.
    pub fn acquire(&self) -> Option<SlotId> {
        self.free.lock().unwrap().pop()
    }

    /// Return a released slot. The caller must already have parked the chunk
    /// and cleared its index entry and decor.
    pub fn release(&self, slot: SlotId) {
        let mut free = self.free.lock().unwrap();
        debug_assert!(!free.contains(&slot), "slot {} released twice", slot);
        free.push(slot);
    }

    pub fn free_count(&self) -> usize {
        self.free.lock().unwrap().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity_from_reach() {
        assert_eq!(ChunkPool::default_capacity(1), 8);
        assert_eq!(ChunkPool::default_capacity(2), 24);
        assert_eq!(ChunkPool::default_capacity(8), 288);
    }

    #[test]
    fn test_acquire_until_exhausted_then_release() {
        let pool = ChunkPool::new(3);
        assert_eq!(pool.free_count(), 3);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let c = pool.acquire().unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);

        // Exhausted: explicit None, the pool never grows
        assert!(pool.acquire().is_none());
        assert_eq!(pool.free_count(), 0);

        pool.release(b);
        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.acquire(), Some(b));
    }

    #[test]
    fn test_round_trip_restores_full_capacity() {
        let pool = ChunkPool::new(8);
        let taken: Vec<_> = std::iter::from_fn(|| pool.acquire()).collect();
        assert_eq!(taken.len(), 8);

        for slot in taken {
            pool.release(slot);
        }
        assert_eq!(pool.free_count(), pool.capacity());
    }
}
