//! Player communication types
//!
//! - `PlayerCommand` - commands from the session to a video surface
//! - `PlayerEvent` - notifications from a video surface to the session
//!
//! ## Architecture
//! ```text
//! Session --[PlayerCommand]--> Runtime --> VideoSurface (current | next | previous)
//! Session <--[SessionEvent]--- Runtime <-- VideoSurface events, replace results
//! ```

/// Which video surface a command or event belongs to.
///
/// Only `Current` is visible and audible; the others are muted, hidden
/// warm-up slots whose failures never reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Current,
    Next,
    Previous,
}

impl SlotKind {
    pub fn is_current(self) -> bool {
        self == SlotKind::Current
    }
}

/// Identifies one source-replace operation.
///
/// Results are matched against the ticket that is in flight, never against a URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplaceTicket(pub u64);

/// Status reported by the playback primitive
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerStatus {
    Idle,
    Loading,
    ReadyToPlay,
    Error(String),
}

/// Events emitted by a video surface
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    StatusChange(PlayerStatus),
    PlayingChange(bool),
    /// Progress tick; `duration_secs` is `None` when the surface does not know it
    TimeUpdate {
        position_secs: f64,
        duration_secs: Option<f64>,
    },
    /// Playback reached the end of the media
    PlayToEnd,
}

/// Commands sent to a video surface
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    /// Replace the surface's source; the result comes back as `ReplaceSettled`
    Replace {
        slot: SlotKind,
        uri: String,
        ticket: ReplaceTicket,
    },
    Play { slot: SlotKind },
    Pause { slot: SlotKind },
    SetMuted { slot: SlotKind, muted: bool },
}

impl PlayerCommand {
    pub fn slot(&self) -> SlotKind {
        match self {
            Self::Replace { slot, .. }
            | Self::Play { slot }
            | Self::Pause { slot }
            | Self::SetMuted { slot, .. } => *slot,
        }
    }
}
