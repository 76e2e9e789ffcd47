use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// FIFO of keys awaiting reconciliation
///
/// A key is queued at most once and is never handed out while it is already
/// being processed. Pushing a key that is in flight marks it dirty so it runs
/// once more after the current pass finishes.
#[derive(Debug)]
pub(crate) struct WorkQueue<K> {
    pending: VecDeque<K>,
    queued: HashSet<K>,
    active: HashSet<K>,
    dirty: HashSet<K>,
}

impl<K: Clone + Eq + Hash> WorkQueue<K> {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            queued: HashSet::new(),
            active: HashSet::new(),
            dirty: HashSet::new(),
        }
    }

    pub fn push(&mut self, key: K) {
        if self.active.contains(&key) {
            self.dirty.insert(key);
        } else if self.queued.insert(key.clone()) {
            self.pending.push_back(key);
        }
    }

    /// Next key to process; it stays active until [`WorkQueue::done`]
    pub fn pop(&mut self) -> Option<K> {
        let key = self.pending.pop_front()?;
        self.queued.remove(&key);
        self.active.insert(key.clone());
        Some(key)
    }

    pub fn done(&mut self, key: &K) {
        self.active.remove(key);
        if self.dirty.remove(key) {
            self.push(key.clone());
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
