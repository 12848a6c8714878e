//! Bounded pending queue.
//!
//! FIFO buffer of snapshots that could not be delivered. At capacity, a
//! push evicts the oldest entry: freshness wins over completeness.

use std::collections::VecDeque;
use tracing::debug;

/// Capacity-bounded FIFO queue (oldest evicted first)
#[derive(Debug, Clone)]
pub struct PendingQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> PendingQueue<T> {
    /// New queue holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `item`, returning the evicted front entry if the queue was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        if evicted.is_some() {
            debug!("pending queue full ({}), evicted oldest entry", self.capacity);
        }
        self.items.push_back(item);
        evicted
    }

    /// Remove and return every entry, oldest first
    pub fn drain_all(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    /// Oldest entry
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
