//! Process-wide keyed exclusive locks
//!
//! Every mutation of the tree runs while holding a [`LockGuard`] for the key
//! that covers it. Keys are plain values; two guards for equal keys never
//! coexist. A guard releases its key when dropped, including on unwinding.

use std::collections::HashSet;
use std::fmt;

use parking_lot::{Condvar, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockCategory {
    Dav,
    ODataCollection,
    Cell,
}

/// Identifies the part of the tree a lock covers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey {
    pub category: LockCategory,
    pub cell_id: String,
    pub box_id: Option<String>,
    pub node_id: Option<String>,
}

impl LockKey {
    /// Box granularity, taken by every WebDAV mutation inside the box
    pub fn dav(cell_id: Uuid, box_id: Uuid) -> Self {
        Self {
            category: LockCategory::Dav,
            cell_id: cell_id.to_string(),
            box_id: Some(box_id.to_string()),
            node_id: None,
        }
    }

    /// Node granularity, taken while an OData collection's data is emptied
    pub fn odata(cell_id: Uuid, box_id: Uuid, node_id: Uuid) -> Self {
        Self {
            category: LockCategory::ODataCollection,
            cell_id: cell_id.to_string(),
            box_id: Some(box_id.to_string()),
            node_id: Some(node_id.to_string()),
        }
    }

    /// Cell granularity. Cells that do not exist yet are keyed by name.
    pub fn cell(cell_id: impl Into<String>) -> Self {
        Self {
            category: LockCategory::Cell,
            cell_id: cell_id.into(),
            box_id: None,
            node_id: None,
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}-{}-{}-{}",
            self.category,
            self.cell_id,
            self.box_id.as_deref().unwrap_or(""),
            self.node_id.as_deref().unwrap_or("")
        )
    }
}

/// Set of currently held keys
#[derive(Debug, Default)]
pub struct LockTable {
    held: Mutex<HashSet<LockKey>>,
    released: Condvar,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `key` is free, then take it
    pub fn acquire(&self, key: LockKey) -> LockGuard<'_> {
        let mut held = self.held.lock();
        while held.contains(&key) {
            tracing::debug!(key = %key, "waiting for lock");
            self.released.wait(&mut held);
        }
        held.insert(key.clone());
        tracing::debug!(key = %key, "lock acquired");
        LockGuard { table: self, key }
    }

    /// Take `key` only if nobody holds it
    pub fn try_acquire(&self, key: LockKey) -> Option<LockGuard<'_>> {
        let mut held = self.held.lock();
        if !held.insert(key.clone()) {
            return None;
        }
        tracing::debug!(key = %key, "lock acquired");
        Some(LockGuard { table: self, key })
    }

    pub fn is_held(&self, key: &LockKey) -> bool {
        self.held.lock().contains(key)
    }

    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }

    fn release(&self, key: &LockKey) {
        self.held.lock().remove(key);
        self.released.notify_all();
        tracing::debug!(key = %key, "lock released");
    }
}

/// Exclusive hold on one [`LockKey`]
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    table: &'a LockTable,
    key: LockKey,
}

impl LockGuard<'_> {
    pub fn key(&self) -> &LockKey {
        &self.key
    }

    /// Release explicitly; same as dropping the guard
    pub fn release(self) {}
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_guard_releases_on_drop() {
        let table = LockTable::new();
        let key = LockKey::cell("cellA");
        {
            let _guard = table.acquire(key.clone());
            assert!(table.is_held(&key));
            assert!(table.try_acquire(key.clone()).is_none());
        }
        assert!(!table.is_held(&key));
        assert_eq!(table.held_count(), 0);
    }

    #[test]
    fn test_explicit_release() {
        let table = LockTable::new();
        let key = LockKey::cell("cellA");
        let guard = table.acquire(key.clone());
        guard.release();
        assert!(table.try_acquire(key).is_some());
    }

    #[test]
    fn test_disjoint_keys_do_not_block() {
        let table = LockTable::new();
        let cell = Uuid::new_v4();
        let _a = table.acquire(LockKey::dav(cell, Uuid::new_v4()));
        let _b = table.acquire(LockKey::dav(cell, Uuid::new_v4()));
        assert_eq!(table.held_count(), 2);
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let table = Arc::new(LockTable::new());
        let key = LockKey::cell("cellA");
        let t = table.clone();
        let k = key.clone();
        let result = thread::spawn(move || {
            let _guard = t.acquire(k);
            panic!("boom");
        })
        .join();
        assert!(result.is_err());
        assert!(!table.is_held(&key));
    }

    #[test]
    fn test_same_key_is_exclusive() {
        let table = Arc::new(LockTable::new());
        let key = LockKey::dav(Uuid::new_v4(), Uuid::new_v4());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = table.clone();
                let key = key.clone();
                let inside = inside.clone();
                let max_inside = max_inside.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        let _guard = table.acquire(key.clone());
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_micros(50));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}
