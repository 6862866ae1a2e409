//! Spin Tally - seek-safe spinner rotation scoring
//!
//! The [`spin::SpinAccumulator`] credits rotation from a stream of signed
//! angular deltas and can retract those deltas again when playback seeks
//! backward. [`replay::SpinReplay`] drives an accumulator over recorded
//! frames, and [`trace`] reads and writes those recordings.

pub mod replay;
pub mod spin;
pub mod trace;

pub use replay::{Frame, ReplayError, SpinReplay, DEFAULT_VERIFY_TOLERANCE};
pub use spin::{Direction, SpinAccumulator, Turn, FULL_SPIN};
pub use trace::{SpinTrace, TraceError, TraceFormat};
