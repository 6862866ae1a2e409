//! Seek-safe rotation accumulator
//!
//! Scores a spinner from a stream of signed angular deltas. Rotation counts
//! toward the total only as a new high-water mark within the current run of
//! turns, and every completed full spin in one direction is banked for good.
//!
//! The accumulator keeps a stack of closed turns so that previously applied
//! deltas can be retracted when playback seeks backward, reconstructing the
//! exact total of the earlier instant without replaying from the start.
//!
//! ## Call pattern
//! - `apply(time, delta)` once per frame while playback advances
//! - `retract(time, -delta)` once per frame while the cursor moves back over
//!   that frame, with `time` being the instant the cursor moves back to

use tracing::{trace, warn};

use super::turn::{Direction, Turn, FULL_SPIN};

/// Full spins one `apply` banks as separate turns before folding the rest.
///
/// Beyond this the whole remainder closes a single complete-spin turn, so the
/// total stays exact but `completed_spins` and later retracts only see the
/// banked turns.
pub const MAX_ROLLOVERS_PER_DELTA: usize = 4096;

/// Bidirectional rotation accumulator for one spinner
#[derive(Debug, Clone)]
pub struct SpinAccumulator {
    /// Closed turns, most recent last
    turns: Vec<Turn>,
    /// The open turn
    current: Turn,
    /// Number of complete-spin turns in `turns`
    completed_spins: usize,
    /// Largest rotation reached since the last completed spin
    current_max_rotation: f32,
    total_rotation: f32,
}

impl SpinAccumulator {
    /// Create an empty accumulator with no rotation
    pub fn new() -> Self {
        Self {
            turns: Vec::new(),
            current: Turn::initial(),
            completed_spins: 0,
            current_max_rotation: 0.0,
            total_rotation: 0.0,
        }
    }

    /// Total credited rotation in degrees
    pub fn total_rotation(&self) -> f32 {
        self.total_rotation
    }

    /// Full spins banked in the closed turn stack
    pub fn completed_spins(&self) -> usize {
        self.completed_spins
    }

    /// The turn currently in progress
    pub fn current_turn(&self) -> &Turn {
        &self.current
    }

    /// Closed turns, oldest first
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// High-water mark since the last completed spin
    pub fn current_max_rotation(&self) -> f32 {
        self.current_max_rotation
    }

    /// Drop all history and return to the freshly constructed state
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Integrate a delta observed while playback moves forward.
    ///
    /// `time` should not be earlier than the previous `apply`; this is not
    /// enforced. A zero delta is a no-op.
    pub fn apply(&mut self, time: f64, delta: f32) {
        debug_assert!(delta.is_finite(), "non-finite spin delta {delta}");
        if !delta.is_finite() {
            return;
        }
        let Some(direction) = Direction::of(delta) else {
            return;
        };

        match self.current.direction {
            None => {
                self.current = Turn::new(f64::NEG_INFINITY, direction, self.current.angle);
            }
            Some(current) if current != direction => {
                trace!(time, from = %current, to = %direction, "spin direction reversed");
                // A reversal is measured from the point of reversal.
                self.begin_turn(Turn::new(time, direction, self.current.angle));
            }
            Some(_) => {}
        }

        self.current.angle += delta;

        let mut rotation = self.current.rotation();
        self.total_rotation += (rotation - self.current_max_rotation).max(0.0);

        let mut rollovers = 0usize;
        while rotation >= FULL_SPIN {
            rollovers += 1;
            if rollovers > MAX_ROLLOVERS_PER_DELTA {
                // Fold the rest into one last turn; subtracting one spin at a
                // time stops making progress once f32 spacing exceeds 360.
                warn!(
                    time,
                    delta,
                    banked = MAX_ROLLOVERS_PER_DELTA,
                    "spin delta too large to bank turn by turn"
                );
                rotation %= FULL_SPIN;
            } else {
                rotation -= FULL_SPIN;
            }

            // Clamp so the closed turn compares exactly equal to a full spin.
            self.current.angle = FULL_SPIN * direction.signum();
            self.begin_turn(Turn::new(time, direction, rotation * direction.signum()));
            self.current_max_rotation = 0.0;

            trace!(
                time,
                completed = self.completed_spins,
                leftover = rotation,
                "full spin banked"
            );
        }

        self.current_max_rotation = self.current_max_rotation.max(rotation);
    }

    /// Undo a delta while playback seeks backward to `time`.
    ///
    /// `delta` is the motion seen while moving back, i.e. the negation of the
    /// delta that was applied for the frame being undone. Turns that began
    /// after `time` are popped and the delta is rebased onto each re-entered
    /// turn on the way. The total is then recomputed from the stack.
    pub fn retract(&mut self, time: f64, delta: f32) {
        debug_assert!(delta.is_finite(), "non-finite spin delta {delta}");
        if delta == 0.0 || !delta.is_finite() {
            return;
        }

        // Rebase in f64 so crossing several turns rounds only once.
        let mut delta = f64::from(delta);
        let mut crossed = 0usize;

        while time < self.current.start_time {
            debug_assert!(
                !self.turns.is_empty(),
                "retracted past the first turn (time {time})"
            );
            let Some(next) = self.turns.pop() else {
                break;
            };

            if next.is_complete_spin() {
                // The exited turn started counting from the rollover point,
                // so its whole angle lies beyond the banked spin.
                self.completed_spins = self.completed_spins.saturating_sub(1);
                delta += f64::from(self.current.angle);
            } else {
                // The exited turn was seeded with the re-entered turn's angle.
                delta += f64::from(self.current.angle) - f64::from(next.angle);
            }

            self.current = next;
            crossed += 1;
        }

        self.current.angle = (f64::from(self.current.angle) + delta) as f32;
        self.recompute_total();

        if crossed > 0 {
            trace!(
                time,
                crossed,
                total = self.total_rotation,
                "retracted across turn boundaries"
            );
        }
    }

    /// Close the current turn and open `next`
    fn begin_turn(&mut self, next: Turn) {
        let closed = std::mem::replace(&mut self.current, next);
        if closed.is_complete_spin() {
            self.completed_spins += 1;
        }
        self.turns.push(closed);
    }

    /// Rebuild the high-water mark and total from the turn stack.
    ///
    /// Only turns above the most recent complete spin still count toward the
    /// high-water mark.
    fn recompute_total(&mut self) {
        let live_max = self
            .turns
            .iter()
            .rev()
            .take_while(|turn| !turn.is_complete_spin())
            .map(Turn::rotation)
            .fold(self.current.rotation(), f32::max);

        self.current_max_rotation = live_max;
        self.total_rotation = FULL_SPIN * self.completed_spins as f32 + live_max;
    }
}

impl Default for SpinAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
