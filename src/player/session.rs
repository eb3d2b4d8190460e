//! Player session - the single dispatcher of the episode feed
//!
//! [`PlayerSession`] owns the queue, the current-slot source controller, the
//! preload state and the swipe mapper, and is the only place their state
//! changes. Every input arrives as a [`SessionEvent`]; every output is a list of
//! [`PlayerCommand`]s for the video surfaces plus [`SessionEffect`]s for the
//! surrounding runtime.
//!
//! The session does no I/O and holds no clock; the runtime feeds it frame
//! deltas and settle results.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::api::Episode;
use crate::features::{GestureSettings, PlaybackSettings, WatchedSnapshot};

use super::episode::{EffectiveEpisode, merge_watch_state};
use super::error::PlaybackError;
use super::events::{PlayerCommand, PlayerEvent, ReplaceTicket, SlotKind};
use super::gesture::{GestureMapper, GestureSample, GestureState, SwipeDecision};
use super::preload::{PreloadManager, PreloadTrigger};
use super::queue_navigator::PlaybackQueue;
use super::source_controller::{SourceController, SourceState};
use super::source_resolver::resolve_uri;

/// Everything the session reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Fresh episode list from the data service, sorted by `order`
    EpisodesLoaded(Vec<Episode>),
    /// The local watched set changed
    WatchedChanged(WatchedSnapshot),
    /// Notification from one of the video surfaces
    Player { slot: SlotKind, event: PlayerEvent },
    /// A `Replace` command finished; `result` carries the error message
    ReplaceSettled {
        slot: SlotKind,
        ticket: ReplaceTicket,
        result: Result<(), String>,
    },
    /// A play/pause/mute command returned an error
    CommandFailed {
        command: PlayerCommand,
        error: String,
    },
    Gesture(GestureSample),
    /// Frame clock tick driving swipe animations
    Frame(Duration),
    /// Tap on the video: flip play/pause
    TogglePlayback,
    /// Interaction that only reveals the controls
    Tap,
    FocusLost,
    FocusGained,
    ViewportResized(f64),
}

/// Side effects the runtime performs on behalf of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// The episode played to its end; record it in the watch history
    MarkWatched(String),
    /// Reveal the playback controls and restart their hide timer
    ShowControls,
    /// Hide the controls and cancel their hide timer
    HideControls,
    /// A new episode became current
    Activated(String),
    /// First activation of the session; carries the show id
    ShowStarted(String),
}

/// Result of handling one event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionOutput {
    pub commands: Vec<PlayerCommand>,
    pub effects: Vec<SessionEffect>,
}

impl SessionOutput {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.effects.is_empty()
    }
}

/// Render snapshot of a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub current: Option<EffectiveEpisode>,
    pub current_index: Option<usize>,
    pub episode_count: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub source: SourceState,
    /// Error to render, including "not available"
    pub error: Option<PlaybackError>,
    pub gesture: GestureState,
    pub position_secs: f64,
}

pub struct PlayerSession {
    playback: PlaybackSettings,
    queue: PlaybackQueue,
    source: SourceController,
    trigger: PreloadTrigger,
    preload: PreloadManager,
    gesture: GestureMapper,
    /// Episode the queue is positioned on when the list identity changes
    anchor_id: String,
    active_id: Option<String>,
    show_started: bool,
    server_episodes: Vec<Episode>,
    watched: WatchedSnapshot,
    position_secs: f64,
}

impl std::fmt::Debug for PlayerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerSession")
            .field("episodes", &self.queue.len())
            .field("current_index", &self.queue.current_index())
            .field("active_id", &self.active_id)
            .field("phase", &self.source.phase())
            .finish()
    }
}

impl PlayerSession {
    pub fn new(
        start_episode_id: impl Into<String>,
        playback: PlaybackSettings,
        gesture: GestureSettings,
        viewport_height: f64,
    ) -> Self {
        Self {
            source: SourceController::new(playback.auto_play),
            trigger: PreloadTrigger::new(playback.preload_threshold),
            playback,
            queue: PlaybackQueue::default(),
            preload: PreloadManager::default(),
            gesture: GestureMapper::new(gesture, viewport_height),
            anchor_id: start_episode_id.into(),
            active_id: None,
            show_started: false,
            server_episodes: Vec::new(),
            watched: Arc::new(HashSet::new()),
            position_secs: 0.0,
        }
    }

    pub fn queue(&self) -> &PlaybackQueue {
        &self.queue
    }

    pub fn source(&self) -> &SourceController {
        &self.source
    }

    pub fn gesture(&self) -> &GestureMapper {
        &self.gesture
    }

    pub fn preload(&self) -> &PreloadManager {
        &self.preload
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current: self.queue.current().cloned(),
            current_index: self.queue.current_index(),
            episode_count: self.queue.len(),
            has_next: self.queue.has_next(),
            has_previous: self.queue.has_previous(),
            source: self.source.state(),
            error: self.source.user_error(),
            gesture: self.gesture.state(),
            position_secs: self.position_secs,
        }
    }

    /// Handle one event
    pub fn handle(&mut self, event: SessionEvent) -> SessionOutput {
        let mut out = SessionOutput::default();
        match event {
            SessionEvent::EpisodesLoaded(episodes) => {
                tracing::debug!("Episode list loaded: {} episodes", episodes.len());
                self.server_episodes = episodes;
                self.rebuild_queue(&mut out);
            }
            SessionEvent::WatchedChanged(watched) => {
                self.watched = watched;
                self.rebuild_queue(&mut out);
            }
            SessionEvent::Player { slot, event } => {
                if slot.is_current() {
                    self.on_player_event(event, &mut out);
                } else {
                    tracing::trace!("Hidden {:?} slot event: {:?}", slot, event);
                }
            }
            SessionEvent::ReplaceSettled {
                slot,
                ticket,
                result,
            } => {
                if slot.is_current() {
                    out.commands
                        .extend(self.source.on_replace_settled(ticket, result));
                } else {
                    self.preload.on_settled(slot, ticket, result);
                }
            }
            SessionEvent::CommandFailed { command, error } => {
                if command.slot().is_current() {
                    self.source.on_command_failed(&command, &error);
                } else {
                    tracing::warn!("{:?} failed on hidden slot (ignored): {}", command, error);
                }
            }
            SessionEvent::Gesture(sample) => {
                if let Some(decision) =
                    self.gesture
                        .on_sample(sample, self.queue.has_next(), self.queue.has_previous())
                {
                    tracing::debug!("Swipe released: {:?}", decision);
                }
            }
            SessionEvent::Frame(dt) => {
                if let Some(decision) = self.gesture.tick(dt) {
                    self.commit_swipe(decision, &mut out);
                }
            }
            SessionEvent::TogglePlayback => {
                out.commands.extend(self.source.toggle());
                out.effects.push(SessionEffect::ShowControls);
            }
            SessionEvent::Tap => out.effects.push(SessionEffect::ShowControls),
            SessionEvent::FocusLost => {
                out.commands.extend(self.source.on_focus_lost());
                self.gesture.settle();
                out.effects.push(SessionEffect::HideControls);
            }
            SessionEvent::FocusGained => self.source.on_focus_gained(),
            SessionEvent::ViewportResized(height) => self.gesture.set_viewport_height(height),
        }
        out
    }

    /// Screen goes away: settle the swipe and forget hidden slots.
    ///
    /// The caller pauses the current surface itself.
    pub fn unmount(&mut self) {
        self.source.on_focus_lost();
        self.gesture.settle();
        self.preload.reset();
    }

    fn on_player_event(&mut self, event: PlayerEvent, out: &mut SessionOutput) {
        match event {
            PlayerEvent::StatusChange(status) => {
                out.commands.extend(self.source.on_status(status));
            }
            PlayerEvent::PlayingChange(playing) => self.source.on_playing_change(playing),
            PlayerEvent::TimeUpdate {
                position_secs,
                duration_secs,
            } => {
                // Ticks of the outgoing source must not count for the incoming one
                if self.source.is_replacing() {
                    return;
                }
                self.position_secs = position_secs;
                let Some(current) = self.queue.current() else {
                    return;
                };
                let duration = duration_secs
                    .filter(|d| d.is_finite() && *d > 0.0)
                    .unwrap_or(current.episode.duration_sec);
                if self
                    .trigger
                    .on_progress(position_secs, duration, self.queue.has_next())
                {
                    self.preload_next(out);
                }
            }
            PlayerEvent::PlayToEnd => {
                if self.source.is_replacing() {
                    tracing::debug!("Ignoring end of superseded source");
                    return;
                }
                self.on_play_to_end(out);
            }
        }
    }

    fn on_play_to_end(&mut self, out: &mut SessionOutput) {
        let Some(current) = self.queue.current() else {
            return;
        };
        let id = current.id().to_string();
        tracing::info!("Episode {} finished", id);

        self.queue.set_watched(&id, true);
        out.effects.push(SessionEffect::MarkWatched(id));

        if self.queue.advance_next() {
            self.activate_current(out);
        } else {
            self.source.on_ended();
        }
    }

    fn commit_swipe(&mut self, decision: SwipeDecision, out: &mut SessionOutput) {
        let moved = match decision {
            SwipeDecision::CommitNext => self.queue.advance_next(),
            SwipeDecision::CommitPrevious => self.queue.advance_previous(),
            SwipeDecision::SnapBack => false,
        };
        if moved {
            tracing::info!("Swipe committed: {:?}", decision);
            self.activate_current(out);
        } else if decision != SwipeDecision::SnapBack {
            tracing::debug!("Swipe {:?} had nowhere to go", decision);
        }
    }

    /// Merge server list and local watched set into the queue
    fn rebuild_queue(&mut self, out: &mut SessionOutput) {
        let merged = merge_watch_state(&self.server_episodes, &self.watched);
        let identity_changed = self.queue.replace(merged, &self.anchor_id);
        if identity_changed {
            tracing::debug!(
                "Queue positioned at {:?} of {}",
                self.queue.current_index(),
                self.queue.len()
            );
        }
        self.activate_current(out);
    }

    /// Point the current slot at the queue's current episode, if it changed
    fn activate_current(&mut self, out: &mut SessionOutput) {
        let Some(current) = self.queue.current() else {
            if self.active_id.take().is_some() {
                tracing::info!("Episode list is empty, player idle");
                out.commands.extend(self.source.clear());
                self.trigger.reset();
                self.preload.reset();
                self.position_secs = 0.0;
            }
            return;
        };
        if self.active_id.as_deref() == Some(current.id()) {
            return;
        }

        let id = current.id().to_string();
        let show_id = current.episode.show_id.clone();
        let uri = resolve_uri(&current.episode, &self.playback.stream_url_template);
        match &uri {
            Some(uri) => tracing::info!("Activating episode {} ({})", id, uri),
            None => tracing::info!("Activating episode {} (no playable source)", id),
        }

        out.commands.extend(self.source.set_target(uri));
        self.trigger.reset();
        self.position_secs = 0.0;
        self.anchor_id = id.clone();
        self.active_id = Some(id.clone());
        out.effects.push(SessionEffect::Activated(id));
        if !self.show_started {
            self.show_started = true;
            out.effects.push(SessionEffect::ShowStarted(show_id));
        }

        if self.playback.prime_previous {
            self.preload_previous(out);
        }
    }

    fn preload_next(&mut self, out: &mut SessionOutput) {
        let Some(next) = self.queue.next() else {
            return;
        };
        match resolve_uri(&next.episode, &self.playback.stream_url_template) {
            Some(uri) => {
                if let Some(commands) = self.preload.prime(SlotKind::Next, uri) {
                    out.commands.extend(commands);
                }
            }
            None => tracing::debug!("Next episode {} has no source to preload", next.id()),
        }
    }

    fn preload_previous(&mut self, out: &mut SessionOutput) {
        let Some(previous) = self.queue.previous() else {
            return;
        };
        if let Some(uri) = resolve_uri(&previous.episode, &self.playback.stream_url_template)
            && let Some(commands) = self.preload.prime(SlotKind::Previous, uri)
        {
            out.commands.extend(commands);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::episode::fixtures::episodes;
    use crate::player::events::PlayerStatus;
    use crate::player::gesture::GesturePhase;
    use crate::player::source_controller::SourcePhase;

    const VH: f64 = 800.0;

    fn session(start: &str, count: usize) -> (PlayerSession, SessionOutput) {
        let mut session = PlayerSession::new(
            start,
            PlaybackSettings::default(),
            GestureSettings::default(),
            VH,
        );
        let out = session.handle(SessionEvent::EpisodesLoaded(episodes(count)));
        (session, out)
    }

    fn current_replace(out: &SessionOutput) -> Option<(ReplaceTicket, String)> {
        out.commands.iter().find_map(|c| match c {
            PlayerCommand::Replace {
                slot: SlotKind::Current,
                ticket,
                uri,
            } => Some((*ticket, uri.clone())),
            _ => None,
        })
    }

    fn settle(session: &mut PlayerSession, ticket: ReplaceTicket) -> SessionOutput {
        session.handle(SessionEvent::ReplaceSettled {
            slot: SlotKind::Current,
            ticket,
            result: Ok(()),
        })
    }

    fn ready(session: &mut PlayerSession) -> SessionOutput {
        session.handle(SessionEvent::Player {
            slot: SlotKind::Current,
            event: PlayerEvent::StatusChange(PlayerStatus::ReadyToPlay),
        })
    }

    fn swipe_up(session: &mut PlayerSession) -> SessionOutput {
        session.handle(SessionEvent::Gesture(GestureSample::new(
            GesturePhase::Active,
            -0.4 * VH,
            0.0,
        )));
        session.handle(SessionEvent::Gesture(GestureSample::new(
            GesturePhase::End,
            -0.4 * VH,
            -200.0,
        )));
        session.handle(SessionEvent::Frame(Duration::from_millis(300)))
    }

    fn tick(session: &mut PlayerSession, position: f64) -> SessionOutput {
        session.handle(SessionEvent::Player {
            slot: SlotKind::Current,
            event: PlayerEvent::TimeUpdate {
                position_secs: position,
                duration_secs: Some(100.0),
            },
        })
    }

    #[test]
    fn loads_the_requested_episode() {
        let (session, out) = session("ep2", 4);
        let (_, uri) = current_replace(&out).unwrap();
        assert_eq!(uri, "https://stream.mux.com/pb-ep2.m3u8");
        assert_eq!(session.queue().current_index(), Some(2));
        assert!(out.effects.contains(&SessionEffect::Activated("ep2".into())));

        // Previous neighbour is warmed muted
        assert!(out.commands.contains(&PlayerCommand::SetMuted {
            slot: SlotKind::Previous,
            muted: true,
        }));
    }

    #[test]
    fn unknown_start_falls_back_to_first() {
        let (session, _) = session("missing", 3);
        assert_eq!(session.queue().current_index(), Some(0));
        assert!(!session.queue().has_previous());
    }

    #[test]
    fn rapid_swipes_converge_on_the_last_episode() {
        let (mut session, out) = session("ep0", 6);
        let (first, _) = current_replace(&out).unwrap();

        for _ in 0..5 {
            let out = swipe_up(&mut session);
            assert!(current_replace(&out).is_none(), "second replace while in flight");
        }
        assert_eq!(session.queue().current_index(), Some(5));

        let out = settle(&mut session, first);
        let (second, uri) = current_replace(&out).unwrap();
        assert_eq!(uri, "https://stream.mux.com/pb-ep5.m3u8");
        settle(&mut session, second);
        assert_eq!(
            session.source().loaded_uri(),
            Some("https://stream.mux.com/pb-ep5.m3u8")
        );
    }

    #[test]
    fn preload_fires_once_per_activation() {
        let (mut session, out) = session("ep0", 3);
        let (ticket, _) = current_replace(&out).unwrap();
        settle(&mut session, ticket);
        ready(&mut session);

        let mut next_primes = 0;
        for ratio in [0.5, 0.7, 0.8, 0.85, 0.9] {
            let out = tick(&mut session, ratio * 100.0);
            next_primes += out
                .commands
                .iter()
                .filter(|c| matches!(c, PlayerCommand::Replace { slot: SlotKind::Next, .. }))
                .count();
        }
        assert_eq!(next_primes, 1);
    }

    #[test]
    fn end_of_media_advances_and_marks_watched() {
        let (mut session, out) = session("ep0", 2);
        let (ticket, _) = current_replace(&out).unwrap();
        settle(&mut session, ticket);
        ready(&mut session);

        let out = session.handle(SessionEvent::Player {
            slot: SlotKind::Current,
            event: PlayerEvent::PlayToEnd,
        });
        assert!(out.effects.contains(&SessionEffect::MarkWatched("ep0".into())));
        assert_eq!(session.queue().current_index(), Some(1));
        assert!(session.queue().episodes()[0].watched);
        assert!(current_replace(&out).is_some());
    }

    #[test]
    fn end_of_last_episode_stays_put() {
        let (mut session, out) = session("ep2", 3);
        let (ticket, _) = current_replace(&out).unwrap();
        settle(&mut session, ticket);
        ready(&mut session);
        session.handle(SessionEvent::Player {
            slot: SlotKind::Current,
            event: PlayerEvent::PlayingChange(true),
        });

        let out = session.handle(SessionEvent::Player {
            slot: SlotKind::Current,
            event: PlayerEvent::PlayToEnd,
        });
        assert_eq!(out.effects, vec![SessionEffect::MarkWatched("ep2".into())]);
        assert!(out.commands.is_empty());
        assert_eq!(session.queue().current_index(), Some(2));
        assert!(session.queue().current().unwrap().watched);
        assert_eq!(session.source().phase(), SourcePhase::Paused);
    }

    #[test]
    fn watched_update_keeps_position_and_playback() {
        let (mut session, out) = session("ep0", 3);
        let (ticket, _) = current_replace(&out).unwrap();
        settle(&mut session, ticket);
        ready(&mut session);
        let out = swipe_up(&mut session);
        let (ticket, _) = current_replace(&out).unwrap();
        settle(&mut session, ticket);

        let mut watched = HashSet::new();
        watched.insert("ep0".to_string());
        let out = session.handle(SessionEvent::WatchedChanged(Arc::new(watched)));
        assert!(out.is_empty());
        assert_eq!(session.queue().current_index(), Some(1));
        assert!(session.queue().episodes()[0].watched);
    }

    #[test]
    fn episode_without_source_is_unavailable() {
        let mut list = episodes(2);
        list[1].playback_id = None;
        let mut session = PlayerSession::new(
            "ep1",
            PlaybackSettings::default(),
            GestureSettings::default(),
            VH,
        );
        let out = session.handle(SessionEvent::EpisodesLoaded(list));
        assert!(current_replace(&out).is_none());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.source.phase, SourcePhase::Unavailable);
        assert_eq!(snapshot.error, Some(PlaybackError::SourceUnavailable));
    }

    #[test]
    fn hidden_slot_failures_stay_hidden() {
        let (mut session, out) = session("ep1", 3);
        let (ticket, _) = current_replace(&out).unwrap();
        settle(&mut session, ticket);

        let prev_ticket = out
            .commands
            .iter()
            .find_map(|c| match c {
                PlayerCommand::Replace {
                    slot: SlotKind::Previous,
                    ticket,
                    ..
                } => Some(*ticket),
                _ => None,
            })
            .unwrap();
        session.handle(SessionEvent::ReplaceSettled {
            slot: SlotKind::Previous,
            ticket: prev_ticket,
            result: Err("403".into()),
        });
        session.handle(SessionEvent::Player {
            slot: SlotKind::Previous,
            event: PlayerEvent::StatusChange(PlayerStatus::Error("bad stream".into())),
        });
        assert!(session.snapshot().error.is_none());
    }

    #[test]
    fn focus_loss_pauses_current() {
        let (mut session, out) = session("ep0", 2);
        let (ticket, _) = current_replace(&out).unwrap();
        settle(&mut session, ticket);
        ready(&mut session);
        session.handle(SessionEvent::Player {
            slot: SlotKind::Current,
            event: PlayerEvent::PlayingChange(true),
        });

        let out = session.handle(SessionEvent::FocusLost);
        assert_eq!(
            out.commands,
            vec![PlayerCommand::Pause {
                slot: SlotKind::Current
            }]
        );
    }

    #[test]
    fn emptied_list_leaves_the_player_idle() {
        let (mut session, out) = session("ep0", 2);
        let (ticket, _) = current_replace(&out).unwrap();
        settle(&mut session, ticket);
        ready(&mut session);
        assert!(session.source().is_playing());

        let out = session.handle(SessionEvent::EpisodesLoaded(Vec::new()));
        assert_eq!(
            out.commands,
            vec![PlayerCommand::Pause {
                slot: SlotKind::Current
            }]
        );
        let snapshot = session.snapshot();
        assert_eq!(snapshot.source.phase, SourcePhase::Idle);
        assert!(snapshot.source.loaded_uri.is_none());
        assert!(!snapshot.source.playing);
        assert!(snapshot.current.is_none());
        assert!(snapshot.error.is_none());

        // A refilled list starts over
        let out = session.handle(SessionEvent::EpisodesLoaded(episodes(2)));
        assert!(current_replace(&out).is_some());
    }

    #[test]
    fn emptied_list_discards_the_load_in_flight() {
        let (mut session, out) = session("ep0", 2);
        let (ticket, _) = current_replace(&out).unwrap();
        session.handle(SessionEvent::EpisodesLoaded(Vec::new()));

        let out = settle(&mut session, ticket);
        assert!(out.commands.is_empty());
        assert_eq!(session.source().phase(), SourcePhase::Idle);
        assert!(session.source().loaded_uri().is_none());
    }

    #[test]
    fn focus_loss_hides_controls_and_settles_swipe() {
        let (mut session, _) = session("ep0", 3);
        session.handle(SessionEvent::Gesture(GestureSample::new(
            GesturePhase::Active,
            -0.4 * VH,
            0.0,
        )));
        session.handle(SessionEvent::Gesture(GestureSample::new(
            GesturePhase::End,
            -0.4 * VH,
            0.0,
        )));
        assert!(session.gesture().is_committing());

        let out = session.handle(SessionEvent::FocusLost);
        assert!(out.effects.contains(&SessionEffect::HideControls));
        assert!(!session.gesture().is_animating());
        assert_eq!(session.gesture().live_offset(), 0.0);

        // The dropped slide never commits
        let out = session.handle(SessionEvent::Frame(Duration::from_millis(300)));
        assert!(out.is_empty());
        assert_eq!(session.queue().current_index(), Some(0));
    }

    #[test]
    fn show_started_once_per_session() {
        let (mut session, out) = session("ep0", 3);
        assert!(out.effects.contains(&SessionEffect::ShowStarted("show-1".into())));

        let out = swipe_up(&mut session);
        assert!(out.effects.contains(&SessionEffect::Activated("ep1".into())));
        assert!(
            !out.effects
                .iter()
                .any(|e| matches!(e, SessionEffect::ShowStarted(_)))
        );
    }

    #[test]
    fn unmount_forgets_hidden_slots() {
        let (mut session, out) = session("ep1", 3);
        let (ticket, _) = current_replace(&out).unwrap();
        settle(&mut session, ticket);
        ready(&mut session);
        assert!(session.preload().slot(SlotKind::Previous).unwrap().uri.is_some());

        session.unmount();
        assert!(!session.source().is_playing());
        assert!(session.preload().slot(SlotKind::Previous).unwrap().uri.is_none());
    }

    #[test]
    fn toggle_reveals_controls() {
        let (mut session, _) = session("ep0", 1);
        let out = session.handle(SessionEvent::TogglePlayback);
        assert_eq!(out.effects, vec![SessionEffect::ShowControls]);
    }
}
