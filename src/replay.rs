//! Replay harness for spin scoring
//!
//! Owns a recorded sequence of input frames and a [`SpinAccumulator`], and
//! keeps the two in step while the playback cursor moves in either direction:
//! frames are applied when the cursor passes them going forward and retracted
//! when it passes them going backward.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::spin::SpinAccumulator;

/// One input sample: the angular delta observed at a playback instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Playback time
    pub time: f64,
    /// Signed angular delta in degrees
    pub delta: f32,
}

impl Frame {
    pub fn new(time: f64, delta: f32) -> Self {
        Self { time, delta }
    }
}

/// Errors raised by the replay harness
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    #[error("frame {index} has a non-finite time or delta")]
    NonFinite { index: usize },

    #[error("frame {index} at time {time} is not after the previous frame at {previous}")]
    OutOfOrder { index: usize, time: f64, previous: f64 },

    #[error("incremental total {incremental} diverged from rescored total {rescored} by more than {allowed}")]
    Diverged {
        incremental: f32,
        rescored: f32,
        allowed: f32,
    },
}

/// Absolute slack in degrees that [`SpinReplay::verify`] allows
pub const DEFAULT_VERIFY_TOLERANCE: f32 = 0.05;

/// Check that frames are finite and strictly increasing in time
pub fn validate_frames(frames: &[Frame]) -> Result<(), ReplayError> {
    let mut previous: Option<f64> = None;

    for (index, frame) in frames.iter().enumerate() {
        if !frame.time.is_finite() || !frame.delta.is_finite() {
            return Err(ReplayError::NonFinite { index });
        }
        if let Some(previous) = previous {
            if frame.time <= previous {
                return Err(ReplayError::OutOfOrder {
                    index,
                    time: frame.time,
                    previous,
                });
            }
        }
        previous = Some(frame.time);
    }

    Ok(())
}

/// Recorded frames plus an accumulator positioned at a playback cursor
#[derive(Debug, Clone)]
pub struct SpinReplay {
    frames: Vec<Frame>,
    /// Number of frames currently applied
    cursor: usize,
    accumulator: SpinAccumulator,
}

impl SpinReplay {
    /// Create a replay over recorded frames, positioned before the first one
    pub fn new(frames: Vec<Frame>) -> Result<Self, ReplayError> {
        validate_frames(&frames)?;
        Ok(Self {
            frames,
            cursor: 0,
            accumulator: SpinAccumulator::new(),
        })
    }

    /// Create a replay with nothing recorded yet
    pub fn empty() -> Self {
        Self {
            frames: Vec::new(),
            cursor: 0,
            accumulator: SpinAccumulator::new(),
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn accumulator(&self) -> &SpinAccumulator {
        &self.accumulator
    }

    pub fn total_rotation(&self) -> f32 {
        self.accumulator.total_rotation()
    }

    /// Time of the last applied frame, if any
    pub fn current_time(&self) -> Option<f64> {
        self.cursor.checked_sub(1).map(|i| self.frames[i].time)
    }

    /// Whether every recorded frame is applied
    pub fn at_end(&self) -> bool {
        self.cursor == self.frames.len()
    }

    /// Record and apply a live frame.
    ///
    /// Frames after the cursor are discarded first, so recording over a
    /// rewound replay starts a fresh take from that point.
    pub fn record(&mut self, frame: Frame) -> Result<(), ReplayError> {
        if !frame.time.is_finite() || !frame.delta.is_finite() {
            return Err(ReplayError::NonFinite { index: self.cursor });
        }
        if let Some(previous) = self.current_time() {
            if frame.time <= previous {
                return Err(ReplayError::OutOfOrder {
                    index: self.cursor,
                    time: frame.time,
                    previous,
                });
            }
        }

        if !self.at_end() {
            debug!(
                dropped = self.frames.len() - self.cursor,
                "Recording over rewound replay"
            );
            self.frames.truncate(self.cursor);
        }

        self.frames.push(frame);
        self.step_forward();
        Ok(())
    }

    /// Apply the next frame. Returns false at the end of the recording.
    pub fn step_forward(&mut self) -> bool {
        let Some(frame) = self.frames.get(self.cursor).copied() else {
            return false;
        };

        self.accumulator.apply(frame.time, frame.delta);
        self.cursor += 1;

        trace!(
            time = frame.time,
            delta = frame.delta,
            total = self.accumulator.total_rotation(),
            "Applied frame"
        );
        true
    }

    /// Retract the last applied frame. Returns false before the first frame.
    pub fn step_backward(&mut self) -> bool {
        let Some(index) = self.cursor.checked_sub(1) else {
            return false;
        };
        let frame = self.frames[index];

        if index == 0 {
            // Nothing is applied before the first frame.
            self.accumulator.reset();
        } else {
            // The cursor lands on the previous frame's instant.
            let previous_time = self.frames[index - 1].time;
            self.accumulator.retract(previous_time, -frame.delta);
        }
        self.cursor = index;

        trace!(
            time = frame.time,
            delta = frame.delta,
            total = self.accumulator.total_rotation(),
            "Retracted frame"
        );
        true
    }

    /// Move the cursor so that exactly the frames at or before `time` are
    /// applied. Returns the number of frames crossed.
    pub fn seek(&mut self, time: f64) -> usize {
        if time.is_nan() {
            return 0;
        }
        let target = self.frames.partition_point(|frame| frame.time <= time);
        self.seek_to_cursor(target)
    }

    /// Retract every applied frame
    pub fn rewind(&mut self) -> usize {
        self.seek_to_cursor(0)
    }

    /// Apply every recorded frame
    pub fn fast_forward(&mut self) -> usize {
        self.seek_to_cursor(self.frames.len())
    }

    fn seek_to_cursor(&mut self, target: usize) -> usize {
        let from = self.cursor;

        while self.cursor < target && self.step_forward() {}
        while self.cursor > target && self.step_backward() {}

        let crossed = from.abs_diff(self.cursor);
        if crossed > 0 {
            debug!(
                from,
                to = self.cursor,
                total = self.accumulator.total_rotation(),
                "Seek complete"
            );
        }
        crossed
    }

    /// Score the currently applied frames from scratch
    pub fn rescore_from_scratch(&self) -> f32 {
        let mut fresh = SpinAccumulator::new();
        for frame in &self.frames[..self.cursor] {
            fresh.apply(frame.time, frame.delta);
        }
        fresh.total_rotation()
    }

    /// Check the incremental total against a from-scratch rescore within
    /// [`DEFAULT_VERIFY_TOLERANCE`]
    pub fn verify(&self) -> Result<(), ReplayError> {
        self.verify_within(DEFAULT_VERIFY_TOLERANCE)
    }

    /// Check the incremental total against a from-scratch rescore.
    ///
    /// Retracting a fractional delta does not round back to the exact value
    /// it was applied from, so the totals may drift apart slightly. Allowed
    /// drift is `tolerance` degrees plus the rounding of summing one f32
    /// increment per applied frame.
    pub fn verify_within(&self, tolerance: f32) -> Result<(), ReplayError> {
        let incremental = self.total_rotation();
        let rescored = self.rescore_from_scratch();
        let allowed = tolerance + f32::EPSILON * rescored.abs() * self.cursor as f32;

        if (incremental - rescored).abs() <= allowed {
            Ok(())
        } else {
            Err(ReplayError::Diverged {
                incremental,
                rescored,
                allowed,
            })
        }
    }
}

impl Default for SpinReplay {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn frames(raw: &[(f64, f32)]) -> Vec<Frame> {
        raw.iter().map(|&(time, delta)| Frame::new(time, delta)).collect()
    }

    #[test]
    fn test_rejects_out_of_order_frames() {
        let err = SpinReplay::new(frames(&[(10.0, 1.0), (10.0, 2.0)])).unwrap_err();
        assert_eq!(
            err,
            ReplayError::OutOfOrder {
                index: 1,
                time: 10.0,
                previous: 10.0
            }
        );
    }

    #[test]
    fn test_rejects_non_finite_frames() {
        let err = SpinReplay::new(frames(&[(0.0, 1.0), (1.0, f32::NAN)])).unwrap_err();
        assert_eq!(err, ReplayError::NonFinite { index: 1 });

        let err = SpinReplay::new(frames(&[(f64::INFINITY, 1.0)])).unwrap_err();
        assert_eq!(err, ReplayError::NonFinite { index: 0 });
    }

    #[test]
    fn test_seek_both_directions() {
        let mut replay =
            SpinReplay::new(frames(&[(500.0, 200.0), (1000.0, 200.0), (1500.0, -100.0)])).unwrap();

        assert_eq!(replay.seek(1000.0), 2);
        assert_eq!(replay.total_rotation(), 400.0);
        assert_eq!(replay.current_time(), Some(1000.0));

        assert_eq!(replay.seek(2000.0), 1);
        assert!(replay.at_end());
        // 40 past the banked spin, then back through to 60 the other way
        assert_eq!(replay.total_rotation(), 420.0);

        assert_eq!(replay.seek(700.0), 2);
        assert_eq!(replay.total_rotation(), 200.0);

        assert_eq!(replay.rewind(), 1);
        assert_eq!(replay.total_rotation(), 0.0);
        assert_eq!(replay.current_time(), None);

        assert_eq!(replay.fast_forward(), 3);
        assert_eq!(replay.total_rotation(), 420.0);
        replay.verify().unwrap();
    }

    #[test]
    fn test_seek_nan_is_noop() {
        let mut replay = SpinReplay::new(frames(&[(1.0, 10.0)])).unwrap();
        replay.fast_forward();
        assert_eq!(replay.seek(f64::NAN), 0);
        assert_eq!(replay.cursor(), 1);
    }

    #[test]
    fn test_step_limits() {
        let mut replay = SpinReplay::empty();
        assert!(!replay.step_forward());
        assert!(!replay.step_backward());

        replay.record(Frame::new(0.0, 15.0)).unwrap();
        assert!(replay.step_backward());
        assert!(!replay.step_backward());
        assert!(replay.step_forward());
        assert!(!replay.step_forward());
    }

    #[test]
    fn test_record_over_rewound_replay() {
        let mut replay = SpinReplay::empty();
        replay.record(Frame::new(100.0, 90.0)).unwrap();
        replay.record(Frame::new(200.0, 90.0)).unwrap();
        replay.record(Frame::new(300.0, 90.0)).unwrap();
        assert_eq!(replay.total_rotation(), 270.0);

        replay.seek(150.0);
        replay.record(Frame::new(250.0, -30.0)).unwrap();

        assert_eq!(replay.frames().len(), 2);
        assert!(replay.at_end());
        assert_eq!(replay.total_rotation(), 90.0);
        replay.verify().unwrap();
    }

    #[test]
    fn test_record_rejects_stale_time() {
        let mut replay = SpinReplay::empty();
        replay.record(Frame::new(100.0, 1.0)).unwrap();

        let err = replay.record(Frame::new(100.0, 1.0)).unwrap_err();
        assert!(matches!(err, ReplayError::OutOfOrder { index: 1, .. }));

        let err = replay.record(Frame::new(200.0, f32::INFINITY)).unwrap_err();
        assert_eq!(err, ReplayError::NonFinite { index: 1 });
        assert_eq!(replay.frames().len(), 1);
    }

    #[test]
    fn test_rewound_replay_accepts_earlier_time() {
        let mut replay = SpinReplay::empty();
        replay.record(Frame::new(100.0, 10.0)).unwrap();
        replay.record(Frame::new(200.0, 10.0)).unwrap();
        replay.rewind();

        replay.record(Frame::new(50.0, -400.0)).unwrap();
        assert_eq!(replay.frames(), &[Frame::new(50.0, -400.0)]);
        assert_eq!(replay.total_rotation(), 400.0);
        replay.verify().unwrap();
    }

    #[test]
    fn test_fractional_trace_verifies_after_seeks() {
        let raw: Vec<(f64, f32)> = (0..20)
            .map(|i| {
                let delta = if i % 3 == 2 { -47.3 } else { 61.7 + i as f32 * 0.13 };
                ((i + 1) as f64 * 16.0, delta)
            })
            .collect();
        let mut replay = SpinReplay::new(frames(&raw)).unwrap();

        for target in [320.0, 48.0, 200.0, 0.0, 1000.0, 100.0] {
            replay.seek(target);
            replay.verify().unwrap();
        }

        // Rewinding fully lands on the exact starting state
        replay.rewind();
        assert_eq!(replay.total_rotation(), 0.0);
        assert_eq!(replay.accumulator().current_turn().angle, 0.0);
        assert!(replay.accumulator().turns().is_empty());
    }

    #[test]
    fn test_verify_reports_allowed_drift() {
        let mut replay = SpinReplay::new(frames(&[(1.0, 10.5), (2.0, -3.25)])).unwrap();
        replay.fast_forward();
        replay.verify_within(0.0).unwrap();

        let err = ReplayError::Diverged {
            incremental: 10.0,
            rescored: 11.0,
            allowed: 0.05,
        };
        assert!(err.to_string().contains("by more than 0.05"));
    }

    proptest! {
        #[test]
        fn prop_fractional_seeks_match_rescore(
            deltas in prop::collection::vec(-80.0f32..120.0, 1..48),
            targets in prop::collection::vec(0usize..64, 1..16),
        ) {
            let frames: Vec<Frame> = deltas
                .iter()
                .enumerate()
                .map(|(i, &delta)| Frame::new((i + 1) as f64 * 10.0, delta))
                .collect();
            let mut replay = SpinReplay::new(frames).unwrap();

            for target in targets {
                replay.seek(target as f64 * 10.0);
                prop_assert!(replay.verify().is_ok(), "{:?}", replay.verify());
            }

            replay.rewind();
            prop_assert_eq!(replay.total_rotation(), 0.0);
        }

        #[test]
        fn prop_random_seeks_match_rescore(
            deltas in prop::collection::vec((-720i32..=720).prop_map(|d| d as f32), 1..48),
            targets in prop::collection::vec(0usize..64, 1..16),
        ) {
            let frames: Vec<Frame> = deltas
                .iter()
                .enumerate()
                .map(|(i, &delta)| Frame::new((i + 1) as f64 * 10.0, delta))
                .collect();
            let mut replay = SpinReplay::new(frames).unwrap();

            for target in targets {
                replay.seek(target as f64 * 10.0);
                prop_assert_eq!(replay.cursor(), target.min(deltas.len()));
                prop_assert!(replay.verify_within(0.0).is_ok());
            }
        }
    }
}
