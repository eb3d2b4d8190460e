//! Database repository - main entry point
//! Delegates to ops modules for actual operations

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};
use std::path::Path;

use super::{models::*, ops, schema};
use crate::features::WatchHistoryPersistence;

/// Database connection pool wrapper
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create and initialize database at the given path
    pub async fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        // WAL keeps snapshot reads from blocking on background persistence
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;

        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&pool)
            .await?;

        schema::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Private in-memory database, one connection so every query sees the same data
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        schema::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    // ============ Watch History Operations ============

    pub async fn get_watched_episodes(&self) -> Result<Vec<DbWatchedEpisode>> {
        ops::get_watched_episodes(&self.pool).await
    }

    pub async fn set_watched_episodes(&self, ids: &[String]) -> Result<()> {
        ops::set_watched_episodes(&self.pool, ids).await
    }

    pub async fn set_episode_watched(&self, episode_id: &str, watched: bool) -> Result<()> {
        ops::set_episode_watched(&self.pool, episode_id, watched).await
    }

    pub async fn is_episode_watched(&self, episode_id: &str) -> Result<bool> {
        ops::is_episode_watched(&self.pool, episode_id).await
    }

    pub async fn clear_watch_history(&self) -> Result<()> {
        ops::clear_watch_history(&self.pool).await
    }
}

#[async_trait]
impl WatchHistoryPersistence for Database {
    async fn load_watched_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .get_watched_episodes()
            .await?
            .into_iter()
            .map(|row| row.episode_id)
            .collect())
    }

    async fn store_watched_ids(&self, ids: Vec<String>) -> Result<()> {
        self.set_watched_episodes(&ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn set_replaces_whole_set() {
        let db = Database::open_in_memory().await.unwrap();
        db.set_watched_episodes(&ids(&["a", "b", "c"])).await.unwrap();
        db.set_watched_episodes(&ids(&["b", "d"])).await.unwrap();

        let mut stored = db.load_watched_ids().await.unwrap();
        stored.sort();
        assert_eq!(stored, ids(&["b", "d"]));
    }

    #[tokio::test]
    async fn single_episode_toggle() {
        let db = Database::open_in_memory().await.unwrap();
        db.set_episode_watched("ep-1", true).await.unwrap();
        db.set_episode_watched("ep-1", true).await.unwrap();
        assert!(db.is_episode_watched("ep-1").await.unwrap());
        assert_eq!(db.get_watched_episodes().await.unwrap().len(), 1);

        db.set_episode_watched("ep-1", false).await.unwrap();
        assert!(!db.is_episode_watched("ep-1").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_ids_are_collapsed() {
        let db = Database::open_in_memory().await.unwrap();
        db.store_watched_ids(ids(&["x", "x", "y"])).await.unwrap();
        assert_eq!(db.load_watched_ids().await.unwrap().len(), 2);

        db.clear_watch_history().await.unwrap();
        assert!(db.load_watched_ids().await.unwrap().is_empty());
    }
}
