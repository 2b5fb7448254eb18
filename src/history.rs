//! Bounded view history.
//!
//! Remembers the most recently viewed entries, oldest first, with each key
//! present at most once. Re-recording a key moves it to the tail; growing
//! past the limit evicts from the head. Nodes live in a slot arena linked
//! by index, with a key -> slot map, so `record` and `remove` are O(1).

use std::collections::HashMap;
use std::hash::Hash;

/// Default number of entries kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// An entry that can be tracked by [`History`].
pub trait Keyed {
    type Key: Copy + Eq + Hash;

    fn key(&self) -> Self::Key;
}

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct History<T: Keyed> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    index: HashMap<T::Key, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    limit: usize,
}

impl<T: Keyed> Default for History<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl<T: Keyed> History<T> {
    /// Create an empty history holding at most `limit` entries (minimum 1).
    pub fn new(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            limit: limit.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: T::Key) -> bool {
        self.index.contains_key(&key)
    }

    /// Record a view. `None` is ignored.
    pub fn record(&mut self, entry: Option<T>) {
        let Some(value) = entry else {
            return;
        };

        let key = value.key();
        self.remove(key);

        let slot = self.allocate(Node {
            value,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.index.insert(key, slot);

        while self.index.len() > self.limit {
            let Some(head) = self.head else {
                break;
            };
            let evicted = self.node(head).value.key();
            self.remove(evicted);
        }
    }

    /// Detach the entry for `key`. Absent keys are ignored.
    pub fn remove(&mut self, key: T::Key) {
        let Some(slot) = self.index.remove(&key) else {
            return;
        };
        let Some(node) = self.slots[slot].take() else {
            return;
        };
        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.node_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }
        self.free.push(slot);
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            history: self,
            cursor: self.head,
        }
    }

    fn allocate(&mut self, node: Node<T>) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn node(&self, slot: usize) -> &Node<T> {
        self.slots[slot]
            .as_ref()
            .unwrap_or_else(|| unreachable!("history slot {slot} is linked but empty"))
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node<T> {
        self.slots[slot]
            .as_mut()
            .unwrap_or_else(|| unreachable!("history slot {slot} is linked but empty"))
    }
}

impl<T: Keyed + Clone> History<T> {
    /// Snapshot of the entries, oldest first.
    pub fn list(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

/// Iterator over history entries, oldest first.
pub struct Iter<'a, T: Keyed> {
    history: &'a History<T>,
    cursor: Option<usize>,
}

impl<'a, T: Keyed> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let node = self.history.node(slot);
        self.cursor = node.next;
        Some(&node.value)
    }
}

impl<'a, T: Keyed> IntoIterator for &'a History<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
