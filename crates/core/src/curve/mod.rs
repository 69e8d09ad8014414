//! Rose curve generator.
//!
//! The generator is a pure function of its [`GeneratorState`]: feeding the
//! same state and angle step always produces the same point, which is what
//! makes paused, resumed and exported animations line up frame for frame.

use std::f64::consts::TAU;

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Polar rose `r(θ) = cos(n/d · θ)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoseCurve {
    n: u32,
    d: u32,
}

impl Default for RoseCurve {
    fn default() -> Self {
        Self { n: 4, d: 5 }
    }
}

impl RoseCurve {
    /// Creates a rose with petal ratio `n / d`. Both terms are raised to at
    /// least one.
    pub fn new(n: u32, d: u32) -> Self {
        Self {
            n: n.max(1),
            d: d.max(1),
        }
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn d(&self) -> u32 {
        self.d
    }

    pub fn k(&self) -> f64 {
        f64::from(self.n) / f64::from(self.d)
    }

    /// Angle after which the drawn figure closes on itself.
    pub fn closure_degrees(&self) -> f64 {
        180.0 * f64::from(self.closure_half_turns())
    }

    fn closure_half_turns(&self) -> u32 {
        if self.n % 2 == self.d % 2 {
            self.d
        } else {
            2 * self.d
        }
    }

    /// Smallest whole number of turns after which the figure has closed.
    pub fn cycle_turns(&self) -> u32 {
        let half_turns = self.closure_half_turns();
        if half_turns % 2 == 0 {
            half_turns / 2
        } else {
            self.period_turns()
        }
    }

    /// Ticks needed to draw the closed figure at `angle_delta_deg` per tick.
    pub fn figure_steps(&self, angle_delta_deg: f64) -> u32 {
        let steps = self.closure_degrees() / angle_delta_deg.max(f64::EPSILON);
        // Absorb rounding so an exact multiple does not take one extra step.
        (steps - 1e-9).ceil().max(1.0) as u32
    }

    /// Smallest whole number of turns after which both the radius and the
    /// direction repeat exactly.
    pub fn period_turns(&self) -> u32 {
        self.d
    }

    pub fn radius(&self, angle_rad: f64) -> f64 {
        (self.k() * angle_rad).cos()
    }

    /// Point on the curve at an absolute angle, in curve space (unit disc,
    /// y pointing up).
    pub fn point_at(&self, angle_rad: f64) -> Point {
        let radius = self.radius(angle_rad);
        let (sin, cos) = angle_rad.sin_cos();
        Point::new(radius * cos, radius * sin)
    }

    /// Point for a generator state. Only the phase within the curve's period
    /// is fed to the trigonometry, so long runs keep full precision.
    pub fn point_for(&self, state: &GeneratorState) -> Point {
        let turn_in_period = state.turns % u64::from(self.period_turns());
        let radius = self.radius(turn_in_period as f64 * TAU + state.phase);
        let (sin, cos) = state.phase.sin_cos();
        Point::new(radius * cos, radius * sin)
    }

    /// Advances `state` by `angle_delta_deg` and returns the new state with
    /// the point generated at it.
    pub fn advance(&self, state: GeneratorState, angle_delta_deg: f64) -> (GeneratorState, Point) {
        let next = state.advanced(angle_delta_deg.to_radians());
        (next, self.point_for(&next))
    }
}

/// Accumulated generator angle, kept as whole turns plus a phase in `[0, 2π)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeneratorState {
    turns: u64,
    phase: f64,
}

impl GeneratorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Angle within the current turn, in radians.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Total accumulated angle in radians.
    pub fn unwrapped(&self) -> f64 {
        self.turns as f64 * TAU + self.phase
    }

    pub fn unwrapped_degrees(&self) -> f64 {
        self.unwrapped().to_degrees()
    }

    fn advanced(self, delta_rad: f64) -> Self {
        let mut turns = self.turns;
        let mut phase = self.phase + delta_rad;
        while phase >= TAU {
            phase -= TAU;
            turns += 1;
        }
        Self { turns, phase }
    }
}
