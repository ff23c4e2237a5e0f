//! Read-copy-update container for entities the audio thread reads and the
//! user thread rarely mutates (channels, waves). Readers take a lock-free
//! snapshot that keeps the current version alive for as long as they hold
//! it and never blocks or allocates; writers clone the current snapshot,
//! mutate the copy and commit with a single atomic pointer swap.
//!
//! Grounded on the same `arc_swap::ArcSwap` pattern the rest of this
//! lineage uses for its routing-table hot-swap.

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use parking_lot::Mutex;

pub trait Identified {
    type Id: Copy + Eq;

    fn id(&self) -> Self::Id;
}

/// A pinned view of the list at one point in time. Holding a `Snapshot`
/// never blocks a concurrent writer; it only delays reclamation of the
/// version it pins.
pub type Snapshot<T> = Guard<Arc<Vec<Arc<T>>>>;

pub struct RcuList<T: Identified> {
    current: ArcSwap<Vec<Arc<T>>>,
    writers: Mutex<()>,
}

impl<T: Identified> Default for RcuList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identified> RcuList<T> {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from(Arc::new(Vec::new())),
            writers: Mutex::new(()),
        }
    }

    /// Audio-thread entry point: take a lock-free snapshot of the current
    /// version. No allocation, no blocking.
    #[inline]
    pub fn snapshot(&self) -> Snapshot<T> {
        self.current.load()
    }

    pub fn get(&self, id: T::Id) -> Option<Arc<T>> {
        self.snapshot().iter().find(|item| item.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends one element. Serializes against concurrent writers; never
    /// called from the audio thread.
    pub fn push(&self, item: T) {
        let _guard = self.writers.lock();
        let mut next: Vec<Arc<T>> = (**self.current.load()).clone();
        next.push(Arc::new(item));
        self.current.store(Arc::new(next));
    }

    /// Removes the element with the given id, returning it if present.
    pub fn pop(&self, id: T::Id) -> Option<Arc<T>> {
        let _guard = self.writers.lock();
        let current = self.current.load();
        if !current.iter().any(|item| item.id() == id) {
            return None;
        }
        let mut removed = None;
        let next: Vec<Arc<T>> = current
            .iter()
            .filter(|item| {
                if item.id() == id {
                    removed = Some(Arc::clone(item));
                    false
                } else {
                    true
                }
            })
            .cloned()
            .collect();
        self.current.store(Arc::new(next));
        removed
    }

    /// Replaces the element with `id` by `new_item`, returning the old value
    /// on success. Used by channel-clone/load flows that need an atomic
    /// replace-in-place rather than pop-then-push (which would momentarily
    /// drop the id from the list).
    pub fn replace(&self, id: T::Id, new_item: Arc<T>) -> Option<Arc<T>> {
        let _guard = self.writers.lock();
        let current = self.current.load();
        if !current.iter().any(|item| item.id() == id) {
            return None;
        }
        let mut old = None;
        let next: Vec<Arc<T>> = current
            .iter()
            .map(|item| {
                if item.id() == id {
                    old = Some(Arc::clone(item));
                    Arc::clone(&new_item)
                } else {
                    Arc::clone(item)
                }
            })
            .collect();
        self.current.store(Arc::new(next));
        old
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        value: i32,
    }

    impl Identified for Item {
        type Id = u32;
        fn id(&self) -> u32 {
            self.id
        }
    }

    #[test]
    fn push_then_get() {
        let list: RcuList<Item> = RcuList::new();
        list.push(Item { id: 1, value: 10 });
        assert_eq!(list.get(1).map(|i| i.value), Some(10));
        assert_eq!(list.get(2), None);
    }

    #[test]
    fn pop_removes_and_returns() {
        let list: RcuList<Item> = RcuList::new();
        list.push(Item { id: 1, value: 10 });
        list.push(Item { id: 2, value: 20 });
        let popped = list.pop(1).unwrap();
        assert_eq!(popped.value, 10);
        assert_eq!(list.len(), 1);
        assert!(list.get(1).is_none());
    }

    #[test]
    fn snapshot_is_stable_across_concurrent_write() {
        let list: RcuList<Item> = RcuList::new();
        list.push(Item { id: 1, value: 10 });
        let snap = list.snapshot();
        list.push(Item { id: 2, value: 20 });
        assert_eq!(snap.len(), 1);
        assert_eq!(list.snapshot().len(), 2);
    }
}
