//! Copy-on-write id set shared between handles
//!
//! Readers take `Arc` snapshots that never change under them; writers clone
//! the set, modify the clone and swap it in.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

/// Immutable view of a set at one point in time
pub type IdSnapshot = Arc<HashSet<String>>;

#[derive(Clone, Default)]
pub struct SharedIdSet {
    inner: Arc<RwLock<IdSnapshot>>,
}

impl std::fmt::Debug for SharedIdSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedIdSet")
            .field("len", &self.len())
            .finish()
    }
}

impl SharedIdSet {
    pub fn snapshot(&self) -> IdSnapshot {
        Arc::clone(&self.inner.read())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Returns whether the id was new
    pub fn insert(&self, id: &str) -> bool {
        self.modify(|set| !set.contains(id), |set| {
            set.insert(id.to_string());
        })
    }

    /// Returns whether the id was present
    pub fn remove(&self, id: &str) -> bool {
        self.modify(|set| set.contains(id), |set| {
            set.remove(id);
        })
    }

    /// Returns whether any id was new
    pub fn extend(&self, ids: impl IntoIterator<Item = String>) -> bool {
        let ids: Vec<String> = ids.into_iter().collect();
        self.modify(
            |set| ids.iter().any(|id| !set.contains(id)),
            |set| set.extend(ids.iter().cloned()),
        )
    }

    /// Returns whether the set held anything
    pub fn clear(&self) -> bool {
        self.modify(|set| !set.is_empty(), HashSet::clear)
    }

    /// Swap in a modified copy, but only when `would_change` says so
    fn modify(
        &self,
        would_change: impl FnOnce(&HashSet<String>) -> bool,
        apply: impl FnOnce(&mut HashSet<String>),
    ) -> bool {
        let mut guard = self.inner.write();
        if !would_change(&guard) {
            return false;
        }
        let mut next = HashSet::clone(&guard);
        apply(&mut next);
        *guard = Arc::new(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_do_not_see_later_writes() {
        let set = SharedIdSet::default();
        assert!(set.insert("a"));
        let before = set.snapshot();

        assert!(set.insert("b"));
        assert!(!before.contains("b"));
        assert!(set.contains("b"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn unchanged_writes_keep_the_snapshot() {
        let set = SharedIdSet::default();
        set.insert("a");
        let before = set.snapshot();

        assert!(!set.insert("a"));
        assert!(!set.remove("missing"));
        assert!(!set.extend(vec!["a".to_string()]));
        assert!(Arc::ptr_eq(&before, &set.snapshot()));
    }

    #[test]
    fn clear_reports_whether_anything_was_dropped() {
        let set = SharedIdSet::default();
        assert!(!set.clear());
        set.extend(vec!["a".to_string(), "b".to_string()]);
        assert!(set.clear());
        assert!(set.is_empty());
    }

    #[test]
    fn clones_share_the_set() {
        let set = SharedIdSet::default();
        let other = set.clone();
        set.insert("x");
        assert!(other.contains("x"));
        assert!(other.remove("x"));
        assert!(!set.contains("x"));
    }
}
