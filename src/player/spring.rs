//! Spring physics for the snap-back motion
//!
//! Uses time-based analytical solutions rather than frame-by-frame integration,
//! so the result does not depend on the host's frame rate.
//!
//! Overdamped condition: `1.0 <= damping / (2.0 * sqrt(stiffness * mass))`
//!
//! ### Overdamped
//! ```text
//! angular_frequency = -sqrt(stiffness / mass)
//! leftover = -angular_frequency * delta - velocity
//! position(t) = to - (delta + t * leftover) * e^(t * angular_frequency)
//! ```
//!
//! ### Underdamped
//! ```text
//! damping_frequency = sqrt(4 * mass * stiffness - damping^2)
//! leftover = (damping * delta - 2 * mass * velocity) / damping_frequency
//! position(t) = to - (cos(t * dfm) * delta + sin(t * dfm) * leftover) * e^(t * dm)
//! ```

use std::f64::consts::E;

/// Numerical derivative step size
const H: f64 = 0.001;

/// Distance and speed under which the spring counts as settled
const REST_EPSILON: f64 = 0.5;

/// Spring parameters for physics simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    pub mass: f64,
    pub damping: f64,
    pub stiffness: f64,
}

impl SpringParams {
    /// Feed snap-back: critically damped enough not to overshoot visibly
    pub const SNAP_BACK: Self = Self {
        mass: 1.0,
        damping: 26.0,
        stiffness: 170.0,
    };

    pub fn is_overdamped(&self) -> bool {
        1.0 <= self.damping / (2.0 * (self.stiffness * self.mass).sqrt())
    }
}

impl Default for SpringParams {
    fn default() -> Self {
        Self::SNAP_BACK
    }
}

/// Closed-form position at time `t` after release
#[derive(Debug, Clone, Copy)]
enum Solution {
    Overdamped {
        angular_frequency: f64,
        leftover: f64,
    },
    Underdamped {
        leftover: f64,
        dfm: f64,
        dm: f64,
    },
}

/// One spring motion from `from` (with initial `velocity`) to `to`
#[derive(Debug, Clone)]
pub struct Spring {
    to: f64,
    delta: f64,
    elapsed: f64,
    position: f64,
    solution: Solution,
}

impl Spring {
    pub fn new(from: f64, velocity: f64, to: f64, params: SpringParams) -> Self {
        let SpringParams {
            mass,
            damping,
            stiffness,
        } = params;
        let delta = to - from;

        let solution = if params.is_overdamped() {
            let angular_frequency = -(stiffness / mass).sqrt();
            Solution::Overdamped {
                angular_frequency,
                leftover: -angular_frequency * delta - velocity,
            }
        } else {
            let damping_frequency = (4.0 * mass * stiffness - damping.powi(2)).sqrt();
            Solution::Underdamped {
                leftover: (damping * delta - 2.0 * mass * velocity) / damping_frequency,
                dfm: 0.5 * damping_frequency / mass,
                dm: -0.5 * damping / mass,
            }
        };

        Self {
            to,
            delta,
            elapsed: 0.0,
            position: from,
            solution,
        }
    }

    fn position_at(&self, t: f64) -> f64 {
        // The closed forms measure displacement from `to`
        match self.solution {
            Solution::Overdamped {
                angular_frequency,
                leftover,
            } => self.to - (self.delta + t * leftover) * E.powf(t * angular_frequency),
            Solution::Underdamped { leftover, dfm, dm } => {
                self.to
                    - ((t * dfm).cos() * self.delta + (t * dfm).sin() * leftover)
                        * E.powf(t * dm)
            }
        }
    }

    /// Advance by `dt` seconds and return the new position.
    ///
    /// Snaps exactly onto the target once at rest.
    pub fn update(&mut self, dt: f64) -> f64 {
        self.elapsed += dt.max(0.0);
        self.position = self.position_at(self.elapsed);
        if self.arrived() {
            self.position = self.to;
        }
        self.position
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn velocity(&self) -> f64 {
        let t = self.elapsed.max(H);
        (self.position_at(t + H) - self.position_at(t - H)) / (2.0 * H)
    }

    pub fn target(&self) -> f64 {
        self.to
    }

    pub fn arrived(&self) -> bool {
        (self.to - self.position).abs() < REST_EPSILON && self.velocity().abs() < REST_EPSILON
    }
}
