//! Motion detection from successive attitudes.
//!
//! The classifier compares every new attitude with the previous one. If any
//! axis moved by more than the threshold the device is flagged as moving and
//! a quiet-period timer is (re)armed. The device goes back to stationary only
//! when that timer fires without a qualifying delta in between.
//!
//! # Architecture
//! - Two states, `Stationary` (initial) and `Moving`
//! - O(1) per attitude, no history beyond the previous attitude
//! - The timeout is a single re-armable one-shot (see [`crate::timer`]); the
//!   host delivers the callback, the classifier never polls
//!
//! Azimuth deltas wrap around 0/360. Pitch and roll deltas are plain absolute
//! differences, so a roll crossing ±180° reads as a large delta.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::timer::{DeadlineTimer, TimerHandle, TimerRequest};
use crate::types::{Attitude, MotionState, MotionTransition};

/// Smallest angle between two headings in degrees, in [0, 180].
pub fn circular_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).abs().rem_euclid(360.0);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// Configuration for motion classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Per-axis angular change that counts as movement (degrees).
    /// A delta must be strictly greater than this.
    pub threshold_deg: f32,

    /// Quiet period after the last qualifying delta before the device is
    /// considered stationary again (milliseconds).
    pub timeout_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            threshold_deg: 2.0,
            timeout_ms: 1000,
        }
    }
}

/// Per-axis change between two attitudes, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularDelta {
    /// Circular distance, [0, 180].
    pub azimuth: f32,
    /// Absolute difference, no wraparound.
    pub pitch: f32,
    /// Absolute difference, no wraparound.
    pub roll: f32,
}

impl AngularDelta {
    pub fn between(previous: &Attitude, current: &Attitude) -> Self {
        Self {
            azimuth: circular_distance(current.azimuth, previous.azimuth),
            pitch: (current.pitch - previous.pitch).abs(),
            roll: (current.roll - previous.roll).abs(),
        }
    }

    /// True if any axis moved strictly more than `threshold`.
    pub fn exceeds(&self, threshold: f32) -> bool {
        self.azimuth > threshold || self.pitch > threshold || self.roll > threshold
    }

    /// Largest of the three axis deltas.
    pub fn max(&self) -> f32 {
        self.azimuth.max(self.pitch).max(self.roll)
    }
}

/// Result of feeding one attitude to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionUpdate {
    /// Delta against the previous attitude; `None` for the first attitude.
    pub delta: Option<AngularDelta>,
    /// Set when this attitude moved the state to `Moving`.
    pub transition: Option<MotionTransition>,
    /// Set when the quiet-period timer was (re)armed. The host must schedule
    /// a single callback for it and drop any earlier one.
    pub timer: Option<TimerRequest>,
}

/// Debounced moving/stationary state machine.
pub struct MotionClassifier {
    config: MotionConfig,
    state: MotionState,
    reference: Option<Attitude>,
    timer: DeadlineTimer,
    last_movement_ms: Option<u64>,
    transition_count: u32,
}

impl MotionClassifier {
    /// Creates a new classifier in the `Stationary` state.
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            state: MotionState::Stationary,
            reference: None,
            timer: DeadlineTimer::new(),
            last_movement_ms: None,
            transition_count: 0,
        }
    }

    pub fn default_classifier() -> Self {
        Self::new(MotionConfig::default())
    }

    /// Feed the latest unrounded attitude observed at `now_ms`.
    ///
    /// The first attitude only becomes the reference. After that, every
    /// attitude is compared with the one before it and then replaces it,
    /// whether or not a transition happened.
    pub fn observe(&mut self, attitude: &Attitude, now_ms: u64) -> MotionUpdate {
        let previous = self.reference.replace(*attitude);
        let delta = match previous {
            Some(previous) => AngularDelta::between(&previous, attitude),
            None => return MotionUpdate::default(),
        };

        let mut update = MotionUpdate {
            delta: Some(delta),
            ..MotionUpdate::default()
        };

        if !delta.exceeds(self.config.threshold_deg) {
            return update;
        }

        debug!(
            azimuth = delta.azimuth,
            pitch = delta.pitch,
            roll = delta.roll,
            "qualifying angular delta"
        );
        self.last_movement_ms = Some(now_ms);
        if self.state == MotionState::Stationary {
            update.transition = Some(self.enter(MotionState::Moving, now_ms));
        }
        update.timer = Some(self.timer.arm(now_ms, self.config.timeout_ms));
        update
    }

    /// Deliver the quiet-period callback for `handle`.
    ///
    /// Returns the `Moving -> Stationary` transition if the handle is the
    /// live one and its deadline has passed. Stale handles are ignored.
    pub fn on_timeout(&mut self, handle: TimerHandle, now_ms: u64) -> Option<MotionTransition> {
        if !self.timer.fire(handle, now_ms) {
            debug!(handle = handle.id(), now_ms, "ignoring stale or early motion timeout");
            return None;
        }
        if self.state == MotionState::Moving {
            Some(self.enter(MotionState::Stationary, now_ms))
        } else {
            None
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Timestamp of the last qualifying delta.
    pub fn last_movement_ms(&self) -> Option<u64> {
        self.last_movement_ms
    }

    /// Deadline of the pending quiet-period timer.
    pub fn pending_deadline(&self) -> Option<u64> {
        self.timer.deadline()
    }

    pub fn pending_timer(&self) -> Option<TimerRequest> {
        self.timer.pending()
    }

    /// The attitude the next one will be compared against.
    pub fn reference(&self) -> Option<Attitude> {
        self.reference
    }

    pub fn transition_count(&self) -> u32 {
        self.transition_count
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Stop classifying: cancel the pending timeout and forget all state.
    ///
    /// After this no callback delivered by the host can produce a transition.
    pub fn shutdown(&mut self) {
        self.timer.cancel();
        self.state = MotionState::Stationary;
        self.reference = None;
        self.last_movement_ms = None;
    }

    fn enter(&mut self, state: MotionState, now_ms: u64) -> MotionTransition {
        self.state = state;
        self.transition_count += 1;
        info!(state = ?state, timestamp_ms = now_ms, "motion state changed");
        MotionTransition {
            state,
            timestamp_ms: now_ms,
        }
    }
}

impl Default for MotionClassifier {
    fn default() -> Self {
        Self::default_classifier()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(azimuth: f32) -> Attitude {
        Attitude::new(azimuth, 0.0, 0.0)
    }

    #[test]
    fn test_circular_distance() {
        assert_eq!(circular_distance(350.0, 10.0), 20.0);
        assert_eq!(circular_distance(10.0, 350.0), 20.0);
        assert_eq!(circular_distance(0.0, 180.0), 180.0);
        assert_eq!(circular_distance(359.0, 1.0), 2.0);
        assert_eq!(circular_distance(45.0, 45.0), 0.0);
        assert_eq!(circular_distance(90.0, 270.0), 180.0);
    }

    #[test]
    fn test_angular_delta_no_roll_wraparound() {
        let a = Attitude::new(0.0, 0.0, 179.0);
        let b = Attitude::new(0.0, 0.0, -179.0);
        let delta = AngularDelta::between(&a, &b);
        assert_eq!(delta.roll, 358.0);
        assert!(delta.exceeds(2.0));
    }

    #[test]
    fn test_threshold_is_strict() {
        let delta = AngularDelta {
            azimuth: 2.0,
            pitch: 0.0,
            roll: 0.0,
        };
        assert!(!delta.exceeds(2.0));
        assert!(delta.exceeds(1.99));
        assert_eq!(delta.max(), 2.0);
    }

    #[test]
    fn test_first_attitude_only_seeds_reference() {
        let mut classifier = MotionClassifier::default_classifier();
        let update = classifier.observe(&Attitude::new(120.0, 45.0, -30.0), 0);
        assert_eq!(update, MotionUpdate::default());
        assert_eq!(classifier.state(), MotionState::Stationary);
        assert!(classifier.reference().is_some());
    }

    #[test]
    fn test_sequence_moves_at_large_delta_and_settles_after_timeout() {
        let mut classifier = MotionClassifier::default_classifier();
        let deltas = [0.0, 1.0, 0.0, 5.0, 0.0, 0.0, 0.0];
        let mut azimuth = 10.0;
        classifier.observe(&heading(azimuth), 0);

        let mut moved_at = None;
        let mut request = None;
        for (i, d) in deltas.iter().enumerate() {
            azimuth += d;
            let now = (i as u64 + 1) * 100;
            let update = classifier.observe(&heading(azimuth), now);
            if let Some(t) = update.transition {
                assert!(moved_at.is_none(), "only one transition expected");
                assert_eq!(t.state, MotionState::Moving);
                moved_at = Some(now);
            }
            if update.timer.is_some() {
                request = update.timer;
            }
        }

        assert_eq!(moved_at, Some(400), "must move exactly at the delta=5 event");
        let request = request.expect("timer armed");
        assert_eq!(request.deadline_ms, 1400);
        assert_eq!(classifier.last_movement_ms(), Some(400));

        assert!(classifier.on_timeout(request.handle, 1399).is_none());
        let settled = classifier.on_timeout(request.handle, 1400).expect("transition");
        assert_eq!(settled.state, MotionState::Stationary);
        assert_eq!(settled.timestamp_ms, 1400);
        assert_eq!(classifier.state(), MotionState::Stationary);
        assert_eq!(classifier.transition_count(), 2);
    }

    #[test]
    fn test_qualifying_delta_resets_quiet_period() {
        let mut classifier = MotionClassifier::default_classifier();
        classifier.observe(&heading(0.0), 0);
        let first = classifier.observe(&heading(10.0), 100).timer.unwrap();
        let second = classifier.observe(&heading(20.0), 600).timer.unwrap();

        // Still moving; only one transition so far.
        assert_eq!(classifier.transition_count(), 1);
        assert_eq!(classifier.pending_deadline(), Some(1600));

        // The old callback is stale.
        assert!(classifier.on_timeout(first.handle, 1100).is_none());
        assert_eq!(classifier.state(), MotionState::Moving);

        let t = classifier.on_timeout(second.handle, 1600).unwrap();
        assert_eq!(t.state, MotionState::Stationary);
    }

    #[test]
    fn test_identical_attitudes_never_move() {
        let mut classifier = MotionClassifier::default_classifier();
        let attitude = Attitude::new(200.0, -12.5, 33.0);
        for i in 0..50 {
            let update = classifier.observe(&attitude, i * 20);
            assert!(update.transition.is_none());
            assert!(update.timer.is_none());
        }
        assert_eq!(classifier.state(), MotionState::Stationary);
    }

    #[test]
    fn test_wraparound_small_change_is_not_motion() {
        let mut classifier = MotionClassifier::default_classifier();
        classifier.observe(&heading(359.0), 0);
        let update = classifier.observe(&heading(1.0), 20);
        assert!((update.delta.unwrap().azimuth - 2.0).abs() < 1e-4);
        assert!(update.transition.is_none());
    }

    #[test]
    fn test_pitch_triggers_motion() {
        let mut classifier = MotionClassifier::default_classifier();
        classifier.observe(&Attitude::new(0.0, 0.0, 0.0), 0);
        let update = classifier.observe(&Attitude::new(0.0, 2.5, 0.0), 20);
        assert_eq!(update.transition.unwrap().state, MotionState::Moving);
    }

    #[test]
    fn test_reference_follows_every_sample() {
        let mut classifier = MotionClassifier::default_classifier();
        // Slow drift of 1.5 degrees per sample never exceeds the threshold
        // because each sample is compared to its predecessor.
        for i in 0..20 {
            let update = classifier.observe(&heading(i as f32 * 1.5), i as u64 * 20);
            assert!(update.transition.is_none());
        }
        assert_eq!(classifier.state(), MotionState::Stationary);
    }

    #[test]
    fn test_shutdown_cancels_timer() {
        let mut classifier = MotionClassifier::default_classifier();
        classifier.observe(&heading(0.0), 0);
        let request = classifier.observe(&heading(30.0), 10).timer.unwrap();
        classifier.shutdown();

        assert_eq!(classifier.pending_deadline(), None);
        assert!(classifier.on_timeout(request.handle, 5000).is_none());
        assert_eq!(classifier.state(), MotionState::Stationary);
        assert!(classifier.reference().is_none());
    }

    #[test]
    fn test_custom_threshold_and_timeout() {
        let mut classifier = MotionClassifier::new(MotionConfig {
            threshold_deg: 10.0,
            timeout_ms: 250,
        });
        classifier.observe(&heading(0.0), 0);
        assert!(classifier.observe(&heading(8.0), 10).transition.is_none());
        let update = classifier.observe(&heading(20.0), 20);
        assert!(update.transition.is_some());
        assert_eq!(update.timer.unwrap().deadline_ms, 270);
    }
}
