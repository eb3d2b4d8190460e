//! Vertical swipe handling
//!
//! Raw drag samples go through three steps:
//!
//! 1. `Active` samples move the live offset (negative = towards next)
//! 2. on `End`, [`decide_swipe`] turns translation and velocity into a decision
//! 3. the mapper animates: a fixed-duration ease to `∓viewport` for commits,
//!    a spring back to zero otherwise
//!
//! A commit is only reported from [`GestureMapper::tick`] once its slide has
//! finished and the offset has been reset.

use std::time::Duration;

use crate::features::GestureSettings;

use super::spring::{Spring, SpringParams};

/// Gesture recogniser phase of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Begin,
    Active,
    End,
    Cancelled,
}

/// One sample of a vertical drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSample {
    /// Pixels from the drag origin, negative is upwards
    pub translation_y: f64,
    /// Pixels per second, negative is upwards
    pub velocity_y: f64,
    pub phase: GesturePhase,
}

impl GestureSample {
    pub fn new(phase: GesturePhase, translation_y: f64, velocity_y: f64) -> Self {
        Self {
            translation_y,
            velocity_y,
            phase,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    /// Towards the next episode
    Up,
    /// Towards the previous episode
    Down,
}

/// Outcome of a released drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDecision {
    CommitNext,
    CommitPrevious,
    SnapBack,
}

/// Decide what a released drag does.
///
/// A drag commits when it covers `commit_ratio` of the viewport or is flicked
/// faster than `fast_velocity` in the same sense, and only if there is an
/// episode on that side.
pub fn decide_swipe(
    translation_y: f64,
    velocity_y: f64,
    viewport_height: f64,
    has_next: bool,
    has_previous: bool,
    settings: &GestureSettings,
) -> SwipeDecision {
    let threshold = settings.commit_ratio * viewport_height.max(0.0);
    let fast = velocity_y.abs() > settings.fast_velocity;

    if has_next && (translation_y < -threshold || (fast && velocity_y < 0.0)) {
        SwipeDecision::CommitNext
    } else if has_previous && (translation_y > threshold || (fast && velocity_y > 0.0)) {
        SwipeDecision::CommitPrevious
    } else {
        SwipeDecision::SnapBack
    }
}

/// Ease-out cubic
fn ease_out(t: f64) -> f64 {
    1.0 - (1.0 - t.clamp(0.0, 1.0)).powi(3)
}

#[derive(Debug, Clone)]
enum Animation {
    Commit {
        from: f64,
        to: f64,
        elapsed: Duration,
        duration: Duration,
        decision: SwipeDecision,
    },
    SnapBack(Spring),
}

/// Render snapshot of the swipe
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureState {
    pub live_offset: f64,
    pub direction: Option<SwipeDirection>,
    pub committing: bool,
}

/// Turns drag samples into offsets and commits
#[derive(Debug, Clone)]
pub struct GestureMapper {
    settings: GestureSettings,
    viewport_height: f64,
    live_offset: f64,
    direction: Option<SwipeDirection>,
    animation: Option<Animation>,
}

impl GestureMapper {
    pub fn new(settings: GestureSettings, viewport_height: f64) -> Self {
        Self {
            settings,
            viewport_height,
            live_offset: 0.0,
            direction: None,
            animation: None,
        }
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = height;
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn live_offset(&self) -> f64 {
        self.live_offset
    }

    pub fn direction(&self) -> Option<SwipeDirection> {
        self.direction
    }

    /// A commit slide is running; no further commit is possible until it ends
    pub fn is_committing(&self) -> bool {
        matches!(self.animation, Some(Animation::Commit { .. }))
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn state(&self) -> GestureState {
        GestureState {
            live_offset: self.live_offset,
            direction: self.direction,
            committing: self.is_committing(),
        }
    }

    /// Feed one sample. Returns the release decision on `End`.
    ///
    /// Samples arriving during a commit slide are accepted but cannot move the
    /// offset or start another commit.
    pub fn on_sample(
        &mut self,
        sample: GestureSample,
        has_next: bool,
        has_previous: bool,
    ) -> Option<SwipeDecision> {
        if self.is_committing() {
            if sample.phase == GesturePhase::End {
                tracing::debug!("Release during commit slide ignored");
            }
            return None;
        }

        match sample.phase {
            GesturePhase::Begin => {
                // Grab the page where the spring currently has it
                if matches!(self.animation, Some(Animation::SnapBack(_))) {
                    self.animation = None;
                }
                None
            }
            GesturePhase::Active => {
                self.animation = None;
                self.live_offset = sample.translation_y;
                let deadzone = self.settings.direction_deadzone;
                if sample.translation_y < -deadzone {
                    self.direction = Some(SwipeDirection::Up);
                } else if sample.translation_y > deadzone {
                    self.direction = Some(SwipeDirection::Down);
                }
                None
            }
            GesturePhase::End => {
                let decision = decide_swipe(
                    sample.translation_y,
                    sample.velocity_y,
                    self.viewport_height,
                    has_next,
                    has_previous,
                    &self.settings,
                );
                self.live_offset = sample.translation_y;
                match decision {
                    SwipeDecision::CommitNext => self.start_commit(decision, -self.viewport_height),
                    SwipeDecision::CommitPrevious => {
                        self.start_commit(decision, self.viewport_height)
                    }
                    SwipeDecision::SnapBack => self.start_snap_back(sample.velocity_y),
                }
                Some(decision)
            }
            GesturePhase::Cancelled => {
                self.start_snap_back(0.0);
                None
            }
        }
    }

    /// Drop any drag or animation and rest the page at zero offset
    pub fn settle(&mut self) {
        if self.is_committing() {
            tracing::debug!("Commit slide dropped");
        }
        self.finish();
    }

    /// Advance animations by `dt`. Returns the commit once its slide completes.
    pub fn tick(&mut self, dt: Duration) -> Option<SwipeDecision> {
        match self.animation.as_mut()? {
            Animation::Commit {
                from,
                to,
                elapsed,
                duration,
                decision,
            } => {
                *elapsed += dt;
                let progress = if duration.is_zero() {
                    1.0
                } else {
                    elapsed.as_secs_f64() / duration.as_secs_f64()
                };
                if progress >= 1.0 {
                    let decision = *decision;
                    self.finish();
                    return Some(decision);
                }
                self.live_offset = *from + (*to - *from) * ease_out(progress);
                None
            }
            Animation::SnapBack(spring) => {
                self.live_offset = spring.update(dt.as_secs_f64());
                if spring.arrived() {
                    self.finish();
                }
                None
            }
        }
    }

    fn start_commit(&mut self, decision: SwipeDecision, to: f64) {
        tracing::debug!("Swipe {:?} from offset {:.1}", decision, self.live_offset);
        self.animation = Some(Animation::Commit {
            from: self.live_offset,
            to,
            elapsed: Duration::ZERO,
            duration: self.settings.commit_duration(),
            decision,
        });
    }

    fn start_snap_back(&mut self, velocity: f64) {
        if self.live_offset == 0.0 {
            self.finish();
            return;
        }
        self.animation = Some(Animation::SnapBack(Spring::new(
            self.live_offset,
            velocity,
            0.0,
            SpringParams::SNAP_BACK,
        )));
    }

    fn finish(&mut self) {
        self.animation = None;
        self.live_offset = 0.0;
        self.direction = None;
    }
}
