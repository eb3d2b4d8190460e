//! Database models for persistent storage
//! These models map directly to SQLite tables

use sqlx::FromRow;

/// Row of the `watch_history` table
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DbWatchedEpisode {
    pub episode_id: String,
    /// Unix timestamp of the first time the episode was marked watched
    pub watched_at: i64,
}
