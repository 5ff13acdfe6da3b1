//! In-memory FIFO wait queue with keyed removal.

use std::collections::{HashMap, VecDeque};

use crate::core::HandleId;

/// Compaction kicks in once stale ids outnumber live entries by this much.
const COMPACT_SLACK: usize = 64;

/// FIFO queue of waiting entries keyed by handle id.
///
/// Arrival order lives in a `VecDeque` of ids, the entries themselves in a
/// map. Removing an entry by id is O(1): its id stays behind in the order
/// deque and is skipped when it reaches the front. Ids must never be reused.
pub struct WaitQueue<T> {
    order: VecDeque<HandleId>,
    entries: HashMap<HandleId, T>,
}

impl<T> WaitQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    /// Append an entry at the back. Returns `false` if the id is already queued.
    pub fn push_back(&mut self, id: HandleId, entry: T) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, entry);
        self.order.push_back(id);
        true
    }

    /// Remove and return the oldest live entry.
    pub fn pop_front(&mut self) -> Option<(HandleId, T)> {
        while let Some(id) = self.order.pop_front() {
            if let Some(entry) = self.entries.remove(&id) {
                return Some((id, entry));
            }
        }
        None
    }

    /// Remove an entry wherever it sits in the queue.
    pub fn remove(&mut self, id: HandleId) -> Option<T> {
        let entry = self.entries.remove(&id)?;
        if self.order.len() > self.entries.len() * 2 + COMPACT_SLACK {
            let entries = &self.entries;
            self.order.retain(|id| entries.contains_key(id));
        }
        Some(entry)
    }

    /// Whether the id is currently queued.
    #[must_use]
    pub fn contains(&self, id: HandleId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Queued ids in admission order.
    pub fn ids(&self) -> impl Iterator<Item = HandleId> + '_ {
        self.order
            .iter()
            .copied()
            .filter(|id| self.entries.contains_key(id))
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for WaitQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
