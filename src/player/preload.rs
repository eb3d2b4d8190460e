//! Neighbour preloading
//!
//! This module provides:
//! - [`PreloadTrigger`]: fires once per activation when progress crosses the threshold
//! - [`PreloadManager`]: tracks what the hidden next/previous slots hold, so the
//!   same source is never requested twice
//!
//! Preloading is pure optimization. Failures are logged and otherwise ignored;
//! nothing here feeds back into the current slot.

use super::events::{PlayerCommand, ReplaceTicket, SlotKind};

/// Progress-ratio trigger for the next-episode preload
#[derive(Debug, Clone)]
pub struct PreloadTrigger {
    threshold: f64,
    fired: bool,
}

impl PreloadTrigger {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            fired: false,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Re-arm for a new current episode
    pub fn reset(&mut self) {
        self.fired = false;
    }

    /// Feed one progress tick of the current episode.
    ///
    /// Returns `true` exactly once per activation: on the first tick at or past
    /// the threshold while a next episode exists.
    pub fn on_progress(&mut self, position_secs: f64, duration_secs: f64, has_next: bool) -> bool {
        if self.fired || !has_next {
            return false;
        }
        if !(duration_secs.is_finite() && duration_secs > 0.0 && position_secs.is_finite()) {
            return false;
        }
        if position_secs / duration_secs >= self.threshold {
            self.fired = true;
            return true;
        }
        false
    }
}

/// State of a hidden slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    /// Nothing requested
    #[default]
    Idle,
    /// Replace in progress
    Pending,
    /// Source loaded, muted and paused
    Ready,
    Failed,
}

/// What a hidden slot holds
#[derive(Debug, Clone, Default)]
pub struct PreloadSlot {
    pub uri: Option<String>,
    pub state: SlotState,
    ticket: Option<ReplaceTicket>,
}

impl PreloadSlot {
    /// Whether this slot holds (or is fetching) `uri`
    pub fn holds(&self, uri: &str) -> bool {
        self.uri.as_deref() == Some(uri)
            && matches!(self.state, SlotState::Pending | SlotState::Ready)
    }
}

/// Single source of truth for the hidden next/previous slots
#[derive(Debug, Default)]
pub struct PreloadManager {
    next: PreloadSlot,
    previous: PreloadSlot,
    next_ticket: u64,
}

impl PreloadManager {
    pub fn slot(&self, slot: SlotKind) -> Option<&PreloadSlot> {
        match slot {
            SlotKind::Next => Some(&self.next),
            SlotKind::Previous => Some(&self.previous),
            SlotKind::Current => None,
        }
    }

    fn slot_mut(&mut self, slot: SlotKind) -> Option<&mut PreloadSlot> {
        match slot {
            SlotKind::Next => Some(&mut self.next),
            SlotKind::Previous => Some(&mut self.previous),
            SlotKind::Current => None,
        }
    }

    /// Commands that load `uri` muted into `slot`, or `None` if it already holds it
    pub fn prime(&mut self, slot: SlotKind, uri: String) -> Option<Vec<PlayerCommand>> {
        // Tickets of hidden slots live in their own space, far from current-slot tickets
        let ticket = ReplaceTicket(u64::MAX / 2 + self.next_ticket);
        let entry = self.slot_mut(slot)?;
        if entry.holds(&uri) {
            tracing::debug!("{:?} slot already holds {}", slot, uri);
            return None;
        }
        entry.uri = Some(uri.clone());
        entry.state = SlotState::Pending;
        entry.ticket = Some(ticket);
        self.next_ticket += 1;

        tracing::debug!("Priming {:?} slot with {}", slot, uri);
        Some(vec![
            PlayerCommand::SetMuted { slot, muted: true },
            PlayerCommand::Replace { slot, uri, ticket },
        ])
    }

    /// A hidden-slot replace finished. Stale tickets are ignored.
    pub fn on_settled(&mut self, slot: SlotKind, ticket: ReplaceTicket, result: Result<(), String>) {
        let Some(entry) = self.slot_mut(slot) else {
            return;
        };
        if entry.ticket != Some(ticket) {
            tracing::debug!("Dropping stale {:?} preload result {:?}", slot, ticket);
            return;
        }
        match result {
            Ok(()) => entry.state = SlotState::Ready,
            Err(e) => {
                tracing::warn!("Preload into {:?} slot failed (ignored): {}", slot, e);
                entry.state = SlotState::Failed;
            }
        }
    }

    /// Forget everything (screen unmount)
    pub fn reset(&mut self) {
        self.next = PreloadSlot::default();
        self.previous = PreloadSlot::default();
    }
}
