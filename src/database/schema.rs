//! Database schema migrations

use anyhow::Result;
use sqlx::{Pool, Sqlite};

/// Run database migrations to create/update schema
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    // Locally watched episodes; the server keeps its own flag
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS watch_history (
            episode_id TEXT PRIMARY KEY NOT NULL,
            watched_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_watch_history_watched_at ON watch_history(watched_at);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
