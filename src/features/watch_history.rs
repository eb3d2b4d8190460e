//! Local watch history
//!
//! Owns the set of episode ids watched on this device. Readers take cheap
//! `Arc` snapshots; every mutation swaps in a new set (copy-on-write) and
//! schedules a write of the full set to the persistence collaborator.
//! Persistence failures are logged and swallowed: the in-memory set stays
//! authoritative for the session. The last failure is kept for display.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use super::id_set::{IdSnapshot, SharedIdSet};

/// Immutable view of the watched ids at one point in time
pub type WatchedSnapshot = IdSnapshot;

/// Storage backend for the watched set
#[async_trait]
pub trait WatchHistoryPersistence: Send + Sync {
    async fn load_watched_ids(&self) -> Result<Vec<String>>;
    async fn store_watched_ids(&self, ids: Vec<String>) -> Result<()>;
}

struct Inner {
    watched: SharedIdSet,
    store: Arc<dyn WatchHistoryPersistence>,
    /// Message of the last failed write, cleared by the next good one
    persist_error: RwLock<Option<String>>,
    /// Serializes writes so they land in mutation order
    write_lock: tokio::sync::Mutex<()>,
}

/// Shared handle to the watch history
#[derive(Clone)]
pub struct WatchHistory {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for WatchHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHistory")
            .field("watched", &self.inner.watched.len())
            .finish_non_exhaustive()
    }
}

impl WatchHistory {
    pub fn new(store: Arc<dyn WatchHistoryPersistence>) -> Self {
        Self {
            inner: Arc::new(Inner {
                watched: SharedIdSet::default(),
                store,
                persist_error: RwLock::new(None),
                write_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Load persisted ids and merge them into the in-memory set.
    ///
    /// Ids marked locally before hydration are kept.
    pub async fn hydrate(&self) {
        match self.inner.store.load_watched_ids().await {
            Ok(ids) => {
                let count = ids.len();
                self.inner.watched.extend(ids);
                tracing::debug!("Watch history hydrated with {} ids", count);
            }
            Err(e) => {
                tracing::warn!("Failed to load watch history, starting empty: {}", e);
            }
        }
    }

    pub fn snapshot(&self) -> WatchedSnapshot {
        self.inner.watched.snapshot()
    }

    pub fn is_watched(&self, episode_id: &str) -> bool {
        self.inner.watched.contains(episode_id)
    }

    /// Why the last write to the store failed, if it did
    pub fn last_persist_error(&self) -> Option<String> {
        self.inner.persist_error.read().clone()
    }

    /// Add an episode to the watched set. Returns whether the set changed.
    pub fn mark_watched(&self, episode_id: &str) -> bool {
        self.set_watched(episode_id, true)
    }

    /// Remove an episode from the watched set. Returns whether the set changed.
    pub fn mark_unwatched(&self, episode_id: &str) -> bool {
        self.set_watched(episode_id, false)
    }

    pub fn set_watched(&self, episode_id: &str, watched: bool) -> bool {
        let changed = if watched {
            self.inner.watched.insert(episode_id)
        } else {
            self.inner.watched.remove(episode_id)
        };
        if changed {
            tracing::debug!("Episode {} watched={}", episode_id, watched);
            self.schedule_persist();
        }
        changed
    }

    pub fn clear(&self) {
        if self.inner.watched.clear() {
            self.schedule_persist();
        }
    }

    /// Write the current set to the store.
    pub async fn persist_now(&self) -> Result<()> {
        let _guard = self.inner.write_lock.lock().await;
        // Read under the write lock so a queued older write never wins
        let mut ids: Vec<String> = self.snapshot().iter().cloned().collect();
        ids.sort();
        let result = self.inner.store.store_watched_ids(ids).await;
        *self.inner.persist_error.write() = result.as_ref().err().map(|e| format!("{:#}", e));
        result
    }

    /// Persist in the background; errors are logged only
    fn schedule_persist(&self) -> Option<JoinHandle<()>> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime, watch history change kept in memory only");
            return None;
        };
        let this = self.clone();
        Some(handle.spawn(async move {
            if let Err(e) = this.persist_now().await {
                tracing::warn!("Failed to persist watch history: {}", e);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        stored: Mutex<Vec<Vec<String>>>,
        initial: Vec<String>,
        fail: bool,
    }

    #[async_trait]
    impl WatchHistoryPersistence for MemoryStore {
        async fn load_watched_ids(&self) -> Result<Vec<String>> {
            if self.fail {
                anyhow::bail!("storage offline");
            }
            Ok(self.initial.clone())
        }

        async fn store_watched_ids(&self, ids: Vec<String>) -> Result<()> {
            if self.fail {
                anyhow::bail!("storage offline");
            }
            self.stored.lock().push(ids);
            Ok(())
        }
    }

    #[tokio::test]
    async fn mark_watched_persists_full_set() {
        let store = Arc::new(MemoryStore::default());
        let history = WatchHistory::new(store.clone());

        assert!(history.mark_watched("a"));
        assert!(!history.mark_watched("a"));
        history.mark_watched("b");
        history.persist_now().await.unwrap();

        let last = store.stored.lock().last().cloned().unwrap();
        assert_eq!(last, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn snapshots_are_copy_on_write() {
        let history = WatchHistory::new(Arc::new(MemoryStore::default()));
        let before = history.snapshot();
        history.mark_watched("x");
        assert!(!before.contains("x"));
        assert!(history.snapshot().contains("x"));
        assert!(history.is_watched("x"));

        history.mark_unwatched("x");
        assert!(!history.is_watched("x"));
    }

    #[tokio::test]
    async fn persistence_failure_keeps_memory_state() {
        let store = Arc::new(MemoryStore {
            fail: true,
            ..Default::default()
        });
        let history = WatchHistory::new(store);

        history.hydrate().await;
        assert!(history.snapshot().is_empty());

        assert!(history.mark_watched("ep-7"));
        assert!(history.persist_now().await.is_err());
        assert!(history.is_watched("ep-7"));
        assert_eq!(history.last_persist_error().as_deref(), Some("storage offline"));
    }

    #[tokio::test]
    async fn good_write_clears_the_persist_error() {
        let store = Arc::new(MemoryStore::default());
        let history = WatchHistory::new(store.clone());
        *history.inner.persist_error.write() = Some("disk full".to_string());

        history.mark_watched("a");
        history.persist_now().await.unwrap();
        assert!(history.last_persist_error().is_none());
    }

    #[tokio::test]
    async fn hydrate_merges_with_local_marks() {
        let store = Arc::new(MemoryStore {
            initial: vec!["old".to_string()],
            ..Default::default()
        });
        let history = WatchHistory::new(store);
        history.mark_watched("new");
        history.hydrate().await;

        let snap = history.snapshot();
        assert!(snap.contains("old"));
        assert!(snap.contains("new"));
    }

    #[test]
    fn works_without_runtime() {
        let history = WatchHistory::new(Arc::new(MemoryStore::default()));
        assert!(history.mark_watched("offline"));
        history.clear();
        assert!(history.snapshot().is_empty());
    }
}
