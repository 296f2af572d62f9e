//! Simulated readings for sensors the device does not have.
//!
//! When a sensor is missing the session switches, once, to simulated input
//! so the screen still has something to render. The switch is permanent for
//! the session; availability is never re-checked per sample.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::readings::ScalarKind;
use crate::rotation::normalize_degrees;
use crate::types::SensorKind;

/// Interval between simulated readings.
pub const SIMULATED_INTERVAL_MS: u64 = 1000;

/// Max heading change per simulated step (degrees).
const HEADING_STEP_DEG: f32 = 3.0;

/// Share of proximity readings that report an object right in front.
const PROXIMITY_NEAR_PROBABILITY: f64 = 0.2;

/// Input mode chosen for one sensor at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackMode {
    Live,
    Simulated(SensorKind),
}

impl FallbackMode {
    /// Decide the mode for `kind` from a one-time availability check.
    pub fn for_sensor(kind: SensorKind, available: bool) -> Self {
        if available {
            FallbackMode::Live
        } else {
            info!(sensor = ?kind, "sensor not available, showing simulated data");
            FallbackMode::Simulated(kind)
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, FallbackMode::Simulated(_))
    }

    /// Status line for the screen.
    pub fn status(&self) -> String {
        match self {
            FallbackMode::Live => "Using device sensor".to_string(),
            FallbackMode::Simulated(kind) => {
                format!("{kind:?} sensor not available. Showing simulated data.")
            }
        }
    }
}

/// Pseudo-random source of plausible readings.
pub struct SimulatedSensor {
    rng: StdRng,
    heading: f32,
}

impl SimulatedSensor {
    /// Deterministic sequence for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            heading: 0.0,
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            heading: 0.0,
        }
    }

    /// Seeded when `seed` is set, otherwise from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::from_entropy(),
        }
    }

    /// Ambient temperature in [20, 30) °C.
    pub fn temperature(&mut self) -> f32 {
        20.0 + self.rng.gen::<f32>() * 10.0
    }

    /// Relative humidity in [30, 70) %.
    pub fn humidity(&mut self) -> f32 {
        30.0 + self.rng.gen::<f32>() * 40.0
    }

    /// 0 with 20 % probability (object detected), otherwise uniform in [0, max_range).
    pub fn proximity(&mut self, max_range: f32) -> f32 {
        if self.rng.gen_bool(PROXIMITY_NEAR_PROBABILITY) {
            0.0
        } else {
            self.rng.gen::<f32>() * max_range
        }
    }

    /// Next reading for a scalar sensor.
    pub fn reading(&mut self, kind: ScalarKind) -> f32 {
        match kind {
            ScalarKind::Temperature => self.temperature(),
            ScalarKind::Humidity => self.humidity(),
            ScalarKind::Proximity { max_range } => self.proximity(max_range),
        }
    }

    /// Heading random walk, feeds the direct-azimuth path.
    pub fn azimuth(&mut self) -> f32 {
        let step = self.rng.gen_range(-HEADING_STEP_DEG..=HEADING_STEP_DEG);
        self.heading = normalize_degrees(self.heading + step);
        self.heading
    }
}
