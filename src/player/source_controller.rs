//! Current-slot source state machine
//!
//! Owns the single visible playback target and serializes source
//! replacement against it:
//!
//! - at most one replace is in flight; target changes while it runs only
//!   overwrite `target_uri` (single pending slot, latest wins)
//! - when the in-flight replace settles it is applied only if its URI is still
//!   the target, otherwise it is discarded and the latest target is loaded
//!   straight away; intermediate targets are never visited
//! - auto-play is issued once the load is applied and the player reports ready
//!
//! ```text
//! Idle/Unavailable ──target──> Loading ──ok──> Ready ──play──> Playing <──> Paused
//!                                 │                  ^
//!                                 └──err──> Error ───┘ (new target / retry)
//! ```
//!
//! The controller never performs I/O. Every transition returns the
//! [`PlayerCommand`]s the runtime has to execute.

use super::error::PlaybackError;
use super::events::{PlayerCommand, PlayerStatus, ReplaceTicket, SlotKind};

const SLOT: SlotKind = SlotKind::Current;

/// Externally visible phase of the current slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourcePhase {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Current episode has no playable source
    Unavailable,
    /// A replace is in flight
    Loading,
    /// Loaded, not playing
    Ready,
    Playing,
    Paused,
    Error,
}

/// Snapshot of the controller for rendering
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceState {
    pub phase: SourcePhase,
    pub loaded_uri: Option<String>,
    pub target_uri: Option<String>,
    pub is_replacing: bool,
    pub auto_play_pending: bool,
    pub playing: bool,
    pub last_error: Option<PlaybackError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InFlight {
    ticket: ReplaceTicket,
    uri: String,
}

/// State before an optimistic toggle, restored if the command fails
#[derive(Debug, Clone, Copy)]
struct ToggleUndo {
    phase: SourcePhase,
    playing: bool,
}

#[derive(Debug)]
pub struct SourceController {
    auto_play: bool,
    phase: SourcePhase,
    loaded_uri: Option<String>,
    target_uri: Option<String>,
    in_flight: Option<InFlight>,
    auto_play_pending: bool,
    player_ready: bool,
    playing: bool,
    focused: bool,
    last_error: Option<PlaybackError>,
    toggle_undo: Option<ToggleUndo>,
    next_ticket: u64,
}

impl Default for SourceController {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SourceController {
    pub fn new(auto_play: bool) -> Self {
        Self {
            auto_play,
            phase: SourcePhase::Idle,
            loaded_uri: None,
            target_uri: None,
            in_flight: None,
            auto_play_pending: false,
            player_ready: false,
            playing: false,
            focused: true,
            last_error: None,
            toggle_undo: None,
            next_ticket: 0,
        }
    }

    // ============ Accessors ============

    pub fn phase(&self) -> SourcePhase {
        self.phase
    }

    pub fn loaded_uri(&self) -> Option<&str> {
        self.loaded_uri.as_deref()
    }

    pub fn target_uri(&self) -> Option<&str> {
        self.target_uri.as_deref()
    }

    pub fn is_replacing(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight_ticket(&self) -> Option<ReplaceTicket> {
        self.in_flight.as_ref().map(|f| f.ticket)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn auto_play_pending(&self) -> bool {
        self.auto_play_pending
    }

    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    /// Error to show the user, including the "not available" state
    pub fn user_error(&self) -> Option<PlaybackError> {
        if self.phase == SourcePhase::Unavailable {
            Some(PlaybackError::SourceUnavailable)
        } else {
            self.last_error.clone()
        }
    }

    pub fn state(&self) -> SourceState {
        SourceState {
            phase: self.phase,
            loaded_uri: self.loaded_uri.clone(),
            target_uri: self.target_uri.clone(),
            is_replacing: self.is_replacing(),
            auto_play_pending: self.auto_play_pending,
            playing: self.playing,
            last_error: self.last_error.clone(),
        }
    }

    // ============ Transitions ============

    /// The current episode changed: `uri` is its resolved source, if any.
    pub fn set_target(&mut self, uri: Option<String>) -> Vec<PlayerCommand> {
        self.auto_play_pending = self.auto_play && self.focused;
        self.toggle_undo = None;

        let Some(uri) = uri else {
            self.target_uri = None;
            let commands = self.pause_if_playing();
            if self.in_flight.is_none() {
                self.phase = SourcePhase::Unavailable;
            }
            return commands;
        };

        self.target_uri = Some(uri.clone());

        if let Some(flight) = &self.in_flight {
            tracing::debug!(
                "Replace {:?} in flight, queued target {}",
                flight.ticket,
                uri
            );
            self.phase = SourcePhase::Loading;
            return Vec::new();
        }

        let already_loaded = self.loaded_uri.as_deref() == Some(uri.as_str());
        if already_loaded && self.phase != SourcePhase::Error {
            if !matches!(self.phase, SourcePhase::Playing | SourcePhase::Paused) {
                self.phase = SourcePhase::Ready;
            }
            return self.maybe_auto_play();
        }

        self.start_replace(uri)
    }

    /// No current episode any more: pause and drop every source.
    ///
    /// A replace still in flight is left to settle; its result is discarded.
    pub fn clear(&mut self) -> Vec<PlayerCommand> {
        let commands = self.pause_if_playing();
        self.target_uri = None;
        self.loaded_uri = None;
        self.auto_play_pending = false;
        self.toggle_undo = None;
        self.player_ready = false;
        self.last_error = None;
        self.phase = SourcePhase::Idle;
        commands
    }

    /// The replace identified by `ticket` finished.
    ///
    /// `result` is the error message on failure.
    pub fn on_replace_settled(
        &mut self,
        ticket: ReplaceTicket,
        result: Result<(), String>,
    ) -> Vec<PlayerCommand> {
        let Some(flight) = self.in_flight.take_if(|f| f.ticket == ticket) else {
            tracing::warn!("Ignoring result of unknown replace {:?}", ticket);
            return Vec::new();
        };

        let superseded = self.target_uri.as_deref() != Some(flight.uri.as_str());
        let cleared = superseded && self.target_uri.is_none() && self.phase == SourcePhase::Idle;

        if let Err(message) = &result {
            tracing::error!("Replace {:?} for {} failed: {}", ticket, flight.uri, message);
            if !cleared {
                self.last_error = Some(PlaybackError::LoadFailed(message.clone()));
            }
        }

        if superseded {
            // The surface holds a source nobody wants any more
            self.loaded_uri = None;
            return match self.target_uri.clone() {
                Some(target) => {
                    tracing::debug!("Replace {:?} superseded, loading {}", ticket, target);
                    self.start_replace(target)
                }
                None => {
                    if !cleared {
                        self.phase = SourcePhase::Unavailable;
                    }
                    Vec::new()
                }
            };
        }

        match result {
            Ok(()) => {
                tracing::debug!("Replace {:?} applied: {}", ticket, flight.uri);
                self.loaded_uri = Some(flight.uri);
                if matches!(self.last_error, Some(PlaybackError::LoadFailed(_))) {
                    self.last_error = None;
                }
                self.phase = SourcePhase::Ready;
                if self.player_ready {
                    self.on_ready()
                } else {
                    Vec::new()
                }
            }
            Err(_) => {
                self.loaded_uri = None;
                self.phase = SourcePhase::Error;
                Vec::new()
            }
        }
    }

    /// Status notification from the current surface
    pub fn on_status(&mut self, status: PlayerStatus) -> Vec<PlayerCommand> {
        match status {
            PlayerStatus::Idle | PlayerStatus::Loading => {
                self.player_ready = false;
                Vec::new()
            }
            PlayerStatus::ReadyToPlay => {
                self.player_ready = true;
                if self.in_flight.is_none() && self.loaded_uri.is_some() {
                    self.on_ready()
                } else {
                    Vec::new()
                }
            }
            PlayerStatus::Error(message) => {
                tracing::error!("Player fault: {}", message);
                self.player_ready = false;
                self.playing = false;
                self.last_error = Some(PlaybackError::PlaybackFault(message));
                if self.in_flight.is_none() {
                    self.phase = SourcePhase::Error;
                }
                Vec::new()
            }
        }
    }

    /// The surface reported a change of its playing flag
    pub fn on_playing_change(&mut self, playing: bool) {
        self.playing = playing;
        self.toggle_undo = None;
        if self.in_flight.is_some() || self.loaded_uri.is_none() {
            return;
        }
        if self.phase == SourcePhase::Error && !playing {
            return;
        }
        self.phase = if playing {
            SourcePhase::Playing
        } else {
            SourcePhase::Paused
        };
    }

    /// User tap: flip play/pause optimistically
    pub fn toggle(&mut self) -> Vec<PlayerCommand> {
        let undo = ToggleUndo {
            phase: self.phase,
            playing: self.playing,
        };
        let command = match self.phase {
            SourcePhase::Ready | SourcePhase::Paused => {
                self.playing = true;
                self.phase = SourcePhase::Playing;
                self.auto_play_pending = false;
                PlayerCommand::Play { slot: SLOT }
            }
            SourcePhase::Playing => {
                self.playing = false;
                self.phase = SourcePhase::Paused;
                self.auto_play_pending = false;
                PlayerCommand::Pause { slot: SLOT }
            }
            SourcePhase::Loading => {
                // Nothing to command yet; decide what happens once loaded
                self.auto_play_pending = !self.auto_play_pending;
                return Vec::new();
            }
            SourcePhase::Idle | SourcePhase::Unavailable | SourcePhase::Error => {
                return Vec::new();
            }
        };
        self.toggle_undo = Some(undo);
        vec![command]
    }

    /// A play/pause command for the current slot failed
    pub fn on_command_failed(&mut self, command: &PlayerCommand, error: &str) {
        match command {
            PlayerCommand::Pause { slot } if slot.is_current() && !self.focused => {
                tracing::debug!("Pause after focus loss failed (ignored): {}", error);
            }
            PlayerCommand::Play { slot } | PlayerCommand::Pause { slot } if slot.is_current() => {
                tracing::warn!("{:?} failed: {}", command, error);
                if let Some(undo) = self.toggle_undo.take() {
                    self.phase = undo.phase;
                    self.playing = undo.playing;
                } else if matches!(command, PlayerCommand::Play { .. }) {
                    // Auto-play never started
                    self.playing = false;
                    if self.phase == SourcePhase::Playing {
                        self.phase = SourcePhase::Ready;
                    }
                }
            }
            _ => {}
        }
    }

    /// Screen lost focus: pause and forget pending auto-play
    pub fn on_focus_lost(&mut self) -> Vec<PlayerCommand> {
        self.focused = false;
        self.auto_play_pending = false;
        self.toggle_undo = None;
        self.pause_if_playing()
    }

    pub fn on_focus_gained(&mut self) {
        self.focused = true;
    }

    /// The media played to its end without a next episode to move to
    pub fn on_ended(&mut self) {
        self.playing = false;
        if self.loaded_uri.is_some() && self.in_flight.is_none() {
            self.phase = SourcePhase::Paused;
        }
    }

    // ============ Internals ============

    fn start_replace(&mut self, uri: String) -> Vec<PlayerCommand> {
        let ticket = ReplaceTicket(self.next_ticket);
        self.next_ticket += 1;

        let mut commands = self.pause_if_playing();
        self.in_flight = Some(InFlight {
            ticket,
            uri: uri.clone(),
        });
        self.loaded_uri = None;
        self.player_ready = false;
        self.phase = SourcePhase::Loading;
        tracing::debug!("Replace {:?} started: {}", ticket, uri);
        commands.push(PlayerCommand::Replace {
            slot: SLOT,
            uri,
            ticket,
        });
        commands
    }

    fn on_ready(&mut self) -> Vec<PlayerCommand> {
        if matches!(self.last_error, Some(PlaybackError::PlaybackFault(_))) {
            self.last_error = None;
        }
        if !matches!(self.phase, SourcePhase::Playing | SourcePhase::Paused) {
            self.phase = SourcePhase::Ready;
        }
        self.maybe_auto_play()
    }

    fn maybe_auto_play(&mut self) -> Vec<PlayerCommand> {
        if !self.auto_play_pending || !self.player_ready {
            return Vec::new();
        }
        self.auto_play_pending = false;
        if self.playing {
            return Vec::new();
        }
        self.playing = true;
        self.phase = SourcePhase::Playing;
        vec![PlayerCommand::Play { slot: SLOT }]
    }

    fn pause_if_playing(&mut self) -> Vec<PlayerCommand> {
        if !self.playing {
            return Vec::new();
        }
        self.playing = false;
        if matches!(self.phase, SourcePhase::Playing) {
            self.phase = SourcePhase::Paused;
        }
        vec![PlayerCommand::Pause { slot: SLOT }]
    }
}
