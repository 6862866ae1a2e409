//! Spinner rotation scoring
//!
//! [`SpinAccumulator`] turns a stream of signed angular deltas into a total
//! rotation value that stays reproducible when playback seeks backward.

pub mod accumulator;
pub mod turn;

pub use accumulator::{SpinAccumulator, MAX_ROLLOVERS_PER_DELTA};
pub use turn::{Direction, Turn, FULL_SPIN};
