//! Turn value types
//!
//! A turn is one maximal stretch of rotation in a single direction, bounded by
//! a direction reversal or by a completed full spin.

use serde::Serialize;

/// Degrees in one full spin
pub const FULL_SPIN: f32 = 360.0;

/// Direction of motion within a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Positive deltas
    Clockwise,
    /// Negative deltas
    CounterClockwise,
}

impl Direction {
    /// Strict sign of a delta.
    ///
    /// Zero (of either sign) and NaN have no direction.
    pub fn of(delta: f32) -> Option<Self> {
        if delta > 0.0 {
            Some(Direction::Clockwise)
        } else if delta < 0.0 {
            Some(Direction::CounterClockwise)
        } else {
            None
        }
    }

    /// `1.0` for clockwise, `-1.0` for counter-clockwise
    pub fn signum(self) -> f32 {
        match self {
            Direction::Clockwise => 1.0,
            Direction::CounterClockwise => -1.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Clockwise => write!(f, "cw"),
            Direction::CounterClockwise => write!(f, "ccw"),
        }
    }
}

/// One contiguous single-direction stretch of spinning
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Turn {
    /// Playback time at which the turn began (`-inf` for the first turn)
    pub start_time: f64,
    /// `None` only for the initial turn of an untouched accumulator
    pub direction: Option<Direction>,
    /// Signed angle within this turn, `|angle| <= 360`
    pub angle: f32,
}

impl Turn {
    /// Placeholder turn of a fresh accumulator
    pub fn initial() -> Self {
        Self {
            start_time: f64::NEG_INFINITY,
            direction: None,
            angle: 0.0,
        }
    }

    pub(crate) fn new(start_time: f64, direction: Direction, angle: f32) -> Self {
        Self {
            start_time,
            direction: Some(direction),
            angle,
        }
    }

    /// Magnitude of the angle turned
    pub fn rotation(&self) -> f32 {
        self.angle.abs()
    }

    /// Whether this turn banked a full spin.
    ///
    /// Exact comparison: rollover clamps the angle to exactly `±360`.
    pub fn is_complete_spin(&self) -> bool {
        self.rotation() == FULL_SPIN
    }
}

impl Default for Turn {
    fn default() -> Self {
        Self::initial()
    }
}
