//! Episode player module
//!
//! This module provides the headless core of the episode feed:
//! - `PlaybackQueue`: ordered episodes and the current position
//! - `SourceController`: serialized source replacement for the visible slot
//! - `PreloadTrigger` / `PreloadManager`: warming the hidden neighbour slots
//! - `GestureMapper`: swipe samples to offsets and commits
//! - `ControlsTimer`: auto-hiding controls
//! - `PlayerSession`: the dispatcher tying them together
//! - `runtime`: the async driver running a session against video surfaces

mod controls;
mod episode;
mod error;
pub mod events;
pub mod gesture;
mod preload;
mod queue_navigator;
pub mod runtime;
mod session;
mod source_controller;
mod source_resolver;
mod spring;

pub use controls::{ControlsHidden, ControlsTimer, controls_channel};
pub use episode::{EffectiveEpisode, merge_watch_state};
pub use error::PlaybackError;
pub use events::{PlayerCommand, PlayerEvent, PlayerStatus, ReplaceTicket, SlotKind};
pub use gesture::{
    GestureMapper, GesturePhase, GestureSample, GestureState, SwipeDecision, SwipeDirection,
    decide_swipe,
};
pub use preload::{PreloadManager, PreloadSlot, PreloadTrigger, SlotState};
pub use queue_navigator::{AdjacentIndices, PlaybackQueue, resolve_index};
pub use runtime::{
    SessionHandle, SessionRuntimeHandle, SessionServices, SharedSessionState, Surfaces,
    VideoSurface, spawn_session,
};
pub use session::{PlayerSession, SessionEffect, SessionEvent, SessionOutput, SessionSnapshot};
pub use source_controller::{SourceController, SourcePhase, SourceState};
pub use source_resolver::{PLAYBACK_ID_PLACEHOLDER, resolve_uri};
pub use spring::{Spring, SpringParams};
