//! Compass dial rotation for heading display.
//!
//! The dial image is a mirrored compass face: to show heading `h` it is
//! rotated by `-h`. Each new heading produces a short rotation from the
//! current dial angle to the new one, which the presentation layer animates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rotation::normalize_degrees;
use crate::types::{Attitude, CompassDirection};

/// Duration of one dial rotation step.
pub const DIAL_ROTATION_MS: u64 = 210;

/// How the dial travels from its current angle to the new target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DialPolicy {
    /// Rotate straight to `-azimuth`. Crossing north can spin the dial
    /// almost a full turn the long way round.
    Naive,
    /// Rotate to the angle congruent to `-azimuth` nearest the current one,
    /// never more than 180° per step.
    #[default]
    ShortestPath,
}

/// One animation step of the dial, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialRotation {
    pub from: f32,
    pub to: f32,
    pub duration_ms: u64,
}

impl DialRotation {
    /// Signed sweep of this step.
    pub fn sweep(&self) -> f32 {
        self.to - self.from
    }

    /// Dial angle `elapsed_ms` into the step, linear and clamped.
    pub fn angle_at(&self, elapsed_ms: u64) -> f32 {
        if self.duration_ms == 0 || elapsed_ms >= self.duration_ms {
            return self.to;
        }
        let t = elapsed_ms as f32 / self.duration_ms as f32;
        self.from + self.sweep() * t
    }
}

/// Tracks the displayed dial angle across heading updates.
#[derive(Debug, Clone)]
pub struct CompassDial {
    policy: DialPolicy,
    round: bool,
    current: f32,
}

impl CompassDial {
    pub fn new(policy: DialPolicy, round: bool) -> Self {
        Self {
            policy,
            round,
            current: 0.0,
        }
    }

    /// Current dial angle, degrees.
    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn policy(&self) -> DialPolicy {
        self.policy
    }

    /// Move the dial to show `azimuth`.
    pub fn rotate_to(&mut self, azimuth: f32) -> DialRotation {
        let azimuth = if self.round {
            normalize_degrees(azimuth.round())
        } else {
            normalize_degrees(azimuth)
        };

        let from = self.current;
        let to = match self.policy {
            DialPolicy::Naive => -azimuth,
            DialPolicy::ShortestPath => {
                let mut step = (-azimuth - from).rem_euclid(360.0);
                if step > 180.0 {
                    step -= 360.0;
                }
                from + step
            }
        };

        // Keep the stored angle bounded; only its value mod 360 is visible.
        self.current = to % 360.0;
        DialRotation {
            from,
            to,
            duration_ms: DIAL_ROTATION_MS,
        }
    }

    /// Snap back to north without animating.
    pub fn reset(&mut self) {
        self.current = 0.0;
    }
}

impl Default for CompassDial {
    fn default() -> Self {
        Self::new(DialPolicy::default(), true)
    }
}

/// Heading text for the compass and movement screens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingReadout {
    pub degrees: f32,
    pub direction: CompassDirection,
}

impl HeadingReadout {
    pub fn from_attitude(attitude: &Attitude, round: bool) -> Self {
        let shown = if round { attitude.rounded() } else { *attitude };
        Self {
            degrees: shown.azimuth,
            direction: shown.direction(),
        }
    }
}

impl fmt::Display for HeadingReadout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Heading: {:.0} degrees ({})",
            self.degrees,
            self.direction.label()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::circular_distance;

    #[test]
    fn test_naive_policy_takes_long_way_at_north() {
        let mut dial = CompassDial::new(DialPolicy::Naive, true);
        dial.rotate_to(359.0);
        let step = dial.rotate_to(1.0);
        assert_eq!(step.from, -359.0);
        assert_eq!(step.to, -1.0);
        assert_eq!(step.sweep(), 358.0);
    }

    #[test]
    fn test_shortest_path_crosses_north_directly() {
        let mut dial = CompassDial::new(DialPolicy::ShortestPath, true);
        dial.rotate_to(359.0);
        let step = dial.rotate_to(1.0);
        assert!((step.sweep() + 2.0).abs() < 1e-4, "sweep = {}", step.sweep());
    }

    #[test]
    fn test_shortest_path_never_exceeds_half_turn() {
        let mut dial = CompassDial::new(DialPolicy::ShortestPath, false);
        let headings = [0.0, 170.0, 350.0, 10.0, 190.0, 5.0, 355.0, 180.0, 0.0];
        for h in headings {
            let step = dial.rotate_to(h);
            assert!(step.sweep().abs() <= 180.0 + 1e-3, "sweep {} for {}", step.sweep(), h);
            // The dial ends up showing the heading.
            assert!(circular_distance(normalize_degrees(-step.to), h) < 1e-3);
        }
    }

    #[test]
    fn test_rounding_applied_before_rotation() {
        let mut dial = CompassDial::new(DialPolicy::Naive, true);
        let step = dial.rotate_to(44.6);
        assert_eq!(step.to, -45.0);

        let mut unrounded = CompassDial::new(DialPolicy::Naive, false);
        let step = unrounded.rotate_to(44.6);
        assert!((step.to + 44.6).abs() < 1e-4);
    }

    #[test]
    fn test_angle_at_interpolates() {
        let step = DialRotation {
            from: 0.0,
            to: -90.0,
            duration_ms: DIAL_ROTATION_MS,
        };
        assert_eq!(step.angle_at(0), 0.0);
        assert!((step.angle_at(105) + 45.0).abs() < 1e-3);
        assert_eq!(step.angle_at(210), -90.0);
        assert_eq!(step.angle_at(10_000), -90.0);
    }

    #[test]
    fn test_readout() {
        let readout = HeadingReadout::from_attitude(&Attitude::new(89.6, 0.0, 0.0), true);
        assert_eq!(readout.degrees, 90.0);
        assert_eq!(readout.direction, CompassDirection::E);
        assert_eq!(readout.to_string(), "Heading: 90 degrees (E)");
    }

    #[test]
    fn test_reset() {
        let mut dial = CompassDial::default();
        dial.rotate_to(120.0);
        dial.reset();
        assert_eq!(dial.current(), 0.0);
    }
}
