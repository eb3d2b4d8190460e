//! Reelswipe - inspect how a show's episode feed would play
//!
//! `reelswipe <show-id> [episode-id]` fetches the show's episodes, overlays the
//! local watch history and logs the resolved queue.

use std::sync::Arc;

use anyhow::{Context, Result};

use reelswipe::api::{EpisodeQuery, ShowsClient, ShowsService};
use reelswipe::database::Database;
use reelswipe::features::{Settings, WatchHistory, WatchHistoryPersistence};
use reelswipe::player::{PlayerSession, SessionEvent, resolve_uri};
use reelswipe::utils::format_duration;

/// Viewport used for the offline session; gestures are never fed
const VIEWPORT_HEIGHT: f64 = 800.0;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let show_id = args
        .next()
        .context("usage: reelswipe <show-id> [episode-id]")?;
    let requested_episode = args.next();

    let settings = Settings::load();
    let store = open_store(&settings).await?;
    let history = WatchHistory::new(store);
    history.hydrate().await;

    let shows = ShowsClient::new(&settings.api)?;
    let episodes = shows
        .get_show_episodes(&show_id, EpisodeQuery::playback_order())
        .await
        .with_context(|| format!("failed to fetch episodes for show {}", show_id))?;
    if episodes.is_empty() {
        tracing::warn!("Show {} has no episodes", show_id);
        return Ok(());
    }

    let start_id = requested_episode.unwrap_or_else(|| episodes[0].id.clone());
    let mut session = PlayerSession::new(
        start_id.as_str(),
        settings.playback.clone(),
        settings.gesture.clone(),
        VIEWPORT_HEIGHT,
    );
    session.handle(SessionEvent::WatchedChanged(history.snapshot()));
    let out = session.handle(SessionEvent::EpisodesLoaded(episodes));

    let queue = session.queue();
    let template = &settings.playback.stream_url_template;
    for (index, entry) in queue.episodes().iter().enumerate() {
        let marker = if Some(index) == queue.current_index() {
            ">"
        } else {
            " "
        };
        let source = resolve_uri(&entry.episode, template)
            .unwrap_or_else(|| "not available".to_string());
        tracing::info!(
            "{} #{} {} [{}] watched={} {}",
            marker,
            entry.episode.order,
            entry.episode.title,
            format_duration(entry.episode.duration_sec),
            entry.watched,
            source
        );
    }

    if let Some(current) = queue.current()
        && current.id() != start_id
    {
        tracing::warn!("Episode {} not in show, starting at {}", start_id, current.id());
    }
    tracing::info!(
        "Start at {:?} of {}, previous: {}, next: {}",
        queue.current_index(),
        queue.len(),
        queue.previous().map_or("-", |e| e.id()),
        queue.next().map_or("-", |e| e.id()),
    );
    for command in &out.commands {
        tracing::debug!("Initial command: {:?}", command);
    }

    Ok(())
}

/// SQLite watch history, or an in-memory one if the file cannot be opened
async fn open_store(settings: &Settings) -> Result<Arc<dyn WatchHistoryPersistence>> {
    let path = settings.storage.database_path();
    match Database::new(&path).await {
        Ok(db) => Ok(Arc::new(db)),
        Err(e) => {
            tracing::warn!("Cannot open {:?} ({}), watch history is not kept", path, e);
            Ok(Arc::new(Database::open_in_memory().await?))
        }
    }
}
