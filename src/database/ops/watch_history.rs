//! Watch history operations

use std::collections::HashSet;

use anyhow::Result;
use sqlx::{Pool, Sqlite};

use crate::database::DbWatchedEpisode;
use crate::utils::current_timestamp;

/// All watched episode ids, oldest first
pub async fn get_watched_episodes(pool: &Pool<Sqlite>) -> Result<Vec<DbWatchedEpisode>> {
    let rows = sqlx::query_as::<_, DbWatchedEpisode>(
        "SELECT episode_id, watched_at FROM watch_history ORDER BY watched_at ASC, episode_id ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Replace the whole watched set.
///
/// Ids already present keep their original `watched_at`.
pub async fn set_watched_episodes(pool: &Pool<Sqlite>, ids: &[String]) -> Result<()> {
    use sqlx::Acquire;

    let now = current_timestamp();
    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();

    let mut conn = pool.acquire().await?;
    let mut tx = conn.begin().await?;

    let existing: Vec<String> = sqlx::query_scalar("SELECT episode_id FROM watch_history")
        .fetch_all(&mut *tx)
        .await?;
    for stale in existing.iter().filter(|id| !wanted.contains(id.as_str())) {
        sqlx::query("DELETE FROM watch_history WHERE episode_id = ?")
            .bind(stale)
            .execute(&mut *tx)
            .await?;
    }

    for id in &wanted {
        sqlx::query("INSERT OR IGNORE INTO watch_history (episode_id, watched_at) VALUES (?, ?)")
            .bind(*id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Mark or unmark a single episode
pub async fn set_episode_watched(pool: &Pool<Sqlite>, episode_id: &str, watched: bool) -> Result<()> {
    if watched {
        sqlx::query("INSERT OR IGNORE INTO watch_history (episode_id, watched_at) VALUES (?, ?)")
            .bind(episode_id)
            .bind(current_timestamp())
            .execute(pool)
            .await?;
    } else {
        sqlx::query("DELETE FROM watch_history WHERE episode_id = ?")
            .bind(episode_id)
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Whether a single episode is in the watched set
pub async fn is_episode_watched(pool: &Pool<Sqlite>, episode_id: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM watch_history WHERE episode_id = ?")
            .bind(episode_id)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// Forget every watched episode
pub async fn clear_watch_history(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("DELETE FROM watch_history").execute(pool).await?;
    Ok(())
}
