//! Session runtime - drives one [`PlayerSession`] against real surfaces
//!
//! A single tokio task owns the session, so all state transitions run on one
//! timeline. Source replaces are spawned and report back through the event
//! channel; play/pause/mute are synchronous calls whose errors are fed back
//! as `CommandFailed`.
//!
//! ## Architecture
//! ```text
//! Host (SessionHandle) --[RuntimeMessage]--> Runtime task (PlayerSession)
//! Host                 <--[SharedState]----- Runtime task (non-blocking reads)
//! Runtime task --> VideoSurface (current | next | previous)
//! ```
//!
//! Dropping every [`SessionHandle`] (or calling [`SessionHandle::shutdown`])
//! stops the task: the controls timer is cancelled, the current surface is
//! paused and results of replaces still in flight are dropped.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{EpisodeQuery, ShowsService};
use crate::features::{Settings, ShowSession, WatchHistory};

use super::controls::{ControlsHiddenReceiver, ControlsTimer, controls_channel};
use super::error::PlaybackError;
use super::events::{PlayerCommand, PlayerEvent, SlotKind};
use super::gesture::GestureSample;
use super::session::{PlayerSession, SessionEffect, SessionEvent, SessionSnapshot};

/// Playback primitive behind one slot
#[async_trait]
pub trait VideoSurface: Send + Sync {
    /// Swap the media source. Resolves once the new source is attached.
    async fn replace_source(&self, uri: &str) -> Result<()>;
    fn play(&self) -> Result<()>;
    fn pause(&self) -> Result<()>;
    fn set_muted(&self, muted: bool) -> Result<()>;
}

/// The three surfaces of a feed
#[derive(Clone)]
pub struct Surfaces {
    pub current: Arc<dyn VideoSurface>,
    pub next: Arc<dyn VideoSurface>,
    pub previous: Arc<dyn VideoSurface>,
}

impl Surfaces {
    pub fn get(&self, slot: SlotKind) -> &Arc<dyn VideoSurface> {
        match slot {
            SlotKind::Current => &self.current,
            SlotKind::Next => &self.next,
            SlotKind::Previous => &self.previous,
        }
    }
}

/// Collaborators shared with the rest of the app
#[derive(Clone)]
pub struct SessionServices {
    pub shows: Arc<dyn ShowsService>,
    pub history: WatchHistory,
    pub started: ShowSession,
}

/// Messages accepted by the runtime task
#[derive(Debug)]
pub enum RuntimeMessage {
    Session(SessionEvent),
    /// Fetch the episode list again
    Reload,
    Shutdown,
}

pub type RuntimeSender = mpsc::UnboundedSender<RuntimeMessage>;
type RuntimeReceiver = mpsc::UnboundedReceiver<RuntimeMessage>;

// ============ Shared State ============

#[derive(Debug, Default)]
struct SessionStateInner {
    snapshot: SessionSnapshot,
    controls_visible: bool,
    fetch_error: Option<PlaybackError>,
    persistence_error: Option<PlaybackError>,
}

/// Thread-safe session state for non-blocking host reads
#[derive(Clone, Default)]
pub struct SharedSessionState {
    inner: Arc<RwLock<SessionStateInner>>,
}

impl std::fmt::Debug for SharedSessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("SharedSessionState")
            .field("current_index", &inner.snapshot.current_index)
            .field("phase", &inner.snapshot.source.phase)
            .field("controls_visible", &inner.controls_visible)
            .finish()
    }
}

impl SharedSessionState {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().snapshot.clone()
    }

    pub fn controls_visible(&self) -> bool {
        self.inner.read().controls_visible
    }

    /// Error of the last episode fetch, if it failed
    pub fn fetch_error(&self) -> Option<PlaybackError> {
        self.inner.read().fetch_error.clone()
    }

    /// Last failed watch-history write, if the latest write failed
    pub fn persistence_error(&self) -> Option<PlaybackError> {
        self.inner.read().persistence_error.clone()
    }

    fn publish(
        &self,
        snapshot: SessionSnapshot,
        controls_visible: bool,
        persistence_error: Option<PlaybackError>,
    ) {
        let mut inner = self.inner.write();
        inner.snapshot = snapshot;
        inner.controls_visible = controls_visible;
        inner.persistence_error = persistence_error;
    }

    fn set_controls_visible(&self, visible: bool) {
        self.inner.write().controls_visible = visible;
    }

    fn set_fetch_error(&self, error: Option<PlaybackError>) {
        self.inner.write().fetch_error = error;
    }
}

// ============ Handle ============

/// Non-blocking control of a running session.
///
/// Every method sends a message and returns immediately.
#[derive(Clone)]
pub struct SessionHandle {
    tx: RuntimeSender,
    state: SharedSessionState,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("state", &self.state)
            .finish()
    }
}

impl SessionHandle {
    pub fn state(&self) -> &SharedSessionState {
        &self.state
    }

    pub fn send(&self, event: SessionEvent) {
        let _ = self.tx.send(RuntimeMessage::Session(event));
    }

    /// Forward a surface notification
    pub fn player_event(&self, slot: SlotKind, event: PlayerEvent) {
        self.send(SessionEvent::Player { slot, event });
    }

    pub fn gesture(&self, sample: GestureSample) {
        self.send(SessionEvent::Gesture(sample));
    }

    pub fn frame(&self, dt: Duration) {
        self.send(SessionEvent::Frame(dt));
    }

    pub fn toggle_playback(&self) {
        self.send(SessionEvent::TogglePlayback);
    }

    pub fn tap(&self) {
        self.send(SessionEvent::Tap);
    }

    pub fn focus_lost(&self) {
        self.send(SessionEvent::FocusLost);
    }

    pub fn focus_gained(&self) {
        self.send(SessionEvent::FocusGained);
    }

    pub fn reload(&self) {
        let _ = self.tx.send(RuntimeMessage::Reload);
    }

    /// Ask the runtime task to stop
    pub fn shutdown(&self) {
        let _ = self.tx.send(RuntimeMessage::Shutdown);
    }
}

/// What [`spawn_session`] returns
pub struct SessionRuntimeHandle {
    pub handle: SessionHandle,
    pub task: JoinHandle<()>,
}

/// Start a session for `show_id`, positioned on `start_episode_id`.
///
/// Must be called inside a tokio runtime.
pub fn spawn_session(
    show_id: impl Into<String>,
    start_episode_id: impl Into<String>,
    settings: &Settings,
    viewport_height: f64,
    services: SessionServices,
    surfaces: Surfaces,
) -> SessionRuntimeHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let (controls_tx, controls_rx) = controls_channel();
    let state = SharedSessionState::default();

    let runtime = SessionRuntime {
        show_id: show_id.into(),
        session: PlayerSession::new(
            start_episode_id,
            settings.playback.clone(),
            settings.gesture.clone(),
            viewport_height,
        ),
        services,
        surfaces,
        controls: ControlsTimer::new(settings.controls.hide_delay(), controls_tx),
        controls_rx,
        tx: tx.downgrade(),
        rx,
        state: state.clone(),
    };
    let task = tokio::spawn(runtime.run());

    SessionRuntimeHandle {
        handle: SessionHandle { tx, state },
        task,
    }
}

// ============ Runtime task ============

struct SessionRuntime {
    show_id: String,
    session: PlayerSession,
    services: SessionServices,
    surfaces: Surfaces,
    controls: ControlsTimer,
    controls_rx: ControlsHiddenReceiver,
    /// Weak so that dropping every handle closes the channel
    tx: mpsc::WeakUnboundedSender<RuntimeMessage>,
    rx: RuntimeReceiver,
    state: SharedSessionState,
}

impl SessionRuntime {
    async fn run(mut self) {
        tracing::info!("Player session started for show {}", self.show_id);

        self.dispatch(SessionEvent::WatchedChanged(self.services.history.snapshot()));
        self.reload().await;

        loop {
            tokio::select! {
                message = self.rx.recv() => match message {
                    Some(RuntimeMessage::Session(event)) => self.dispatch(event),
                    Some(RuntimeMessage::Reload) => self.reload().await,
                    Some(RuntimeMessage::Shutdown) | None => break,
                },
                Some(hidden) = self.controls_rx.recv() => {
                    if self.controls.on_hidden(hidden) {
                        self.state.set_controls_visible(false);
                    }
                }
            }
        }

        self.teardown();
    }

    async fn reload(&mut self) {
        match self
            .services
            .shows
            .get_show_episodes(&self.show_id, EpisodeQuery::playback_order())
            .await
        {
            Ok(episodes) => {
                self.state.set_fetch_error(None);
                self.dispatch(SessionEvent::EpisodesLoaded(episodes));
            }
            Err(e) => {
                tracing::error!("Failed to fetch episodes for show {}: {:#}", self.show_id, e);
                self.state
                    .set_fetch_error(Some(PlaybackError::FetchFailed(e.to_string())));
            }
        }
    }

    /// Run `event` and every follow-up it causes, then publish the new state
    fn dispatch(&mut self, event: SessionEvent) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let out = self.session.handle(event);
            for command in out.commands {
                if let Some(failed) = self.execute(command) {
                    queue.push_back(failed);
                }
            }
            for effect in out.effects {
                match effect {
                    SessionEffect::MarkWatched(id) => {
                        let history = &self.services.history;
                        if history.mark_watched(&id) {
                            queue.push_back(SessionEvent::WatchedChanged(history.snapshot()));
                        }
                    }
                    SessionEffect::ShowControls => self.controls.show(),
                    SessionEffect::HideControls => self.controls.hide(),
                    SessionEffect::Activated(id) => {
                        tracing::debug!("Show {} now on episode {}", self.show_id, id);
                    }
                    SessionEffect::ShowStarted(show_id) => {
                        if self.services.started.mark_started(&show_id) {
                            tracing::debug!("Show {} started", show_id);
                        }
                    }
                }
            }
        }
        self.state.publish(
            self.session.snapshot(),
            self.controls.is_visible(),
            self.persistence_error(),
        );
    }

    fn persistence_error(&self) -> Option<PlaybackError> {
        self.services
            .history
            .last_persist_error()
            .map(PlaybackError::PersistenceFailure)
    }

    /// Execute one command. Returns the failure event of a synchronous command.
    fn execute(&self, command: PlayerCommand) -> Option<SessionEvent> {
        let surface = self.surfaces.get(command.slot());
        let result = match &command {
            PlayerCommand::Replace { slot, uri, ticket } => {
                let Some(tx) = self.tx.upgrade() else {
                    return None;
                };
                let surface = Arc::clone(surface);
                let (slot, uri, ticket) = (*slot, uri.clone(), *ticket);
                tokio::spawn(async move {
                    let result = surface
                        .replace_source(&uri)
                        .await
                        .map_err(|e| format!("{:#}", e));
                    // Receiver gone means the session ended; the result is moot
                    let _ = tx.send(RuntimeMessage::Session(SessionEvent::ReplaceSettled {
                        slot,
                        ticket,
                        result,
                    }));
                });
                return None;
            }
            PlayerCommand::Play { .. } => surface.play(),
            PlayerCommand::Pause { .. } => surface.pause(),
            PlayerCommand::SetMuted { muted, .. } => surface.set_muted(*muted),
        };

        result.err().map(|e| SessionEvent::CommandFailed {
            command,
            error: format!("{:#}", e),
        })
    }

    fn teardown(&mut self) {
        self.session.unmount();
        self.controls.hide();
        if let Err(e) = self.surfaces.current.pause() {
            tracing::debug!("Pause on shutdown failed (ignored): {}", e);
        }
        self.state
            .publish(self.session.snapshot(), false, self.persistence_error());
        tracing::info!("Player session for show {} stopped", self.show_id);
    }
}
