//! In-memory display window for scalar sensors.
//!
//! Temperature, humidity and proximity are shown as a scrolling chart of the
//! most recent readings plus the current/min/max values. Only the visible
//! window is kept; nothing is persisted.

use std::collections::VecDeque;

use tracing::warn;

use crate::error::SensingError;
use crate::types::SensorKind;

/// A scalar sensor and its display parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarKind {
    /// Ambient temperature, °C.
    Temperature,
    /// Relative humidity, %.
    Humidity,
    /// Distance to the nearest object, cm. `max_range` comes from the sensor.
    Proximity { max_range: f32 },
}

impl ScalarKind {
    /// Proximity with the range assumed when the hardware is absent.
    pub const DEFAULT_PROXIMITY: ScalarKind = ScalarKind::Proximity { max_range: 10.0 };

    pub fn sensor(&self) -> SensorKind {
        match self {
            ScalarKind::Temperature => SensorKind::Temperature,
            ScalarKind::Humidity => SensorKind::Humidity,
            ScalarKind::Proximity { .. } => SensorKind::Proximity,
        }
    }

    /// Inclusive range of values accepted as real readings.
    pub fn plausible_range(&self) -> (f32, f32) {
        match self {
            ScalarKind::Temperature => (-300.0, 300.0),
            ScalarKind::Humidity => (0.0, 100.0),
            ScalarKind::Proximity { max_range } => (0.0, *max_range),
        }
    }

    /// Chart axis range.
    pub fn display_range(&self) -> (f32, f32) {
        match self {
            ScalarKind::Temperature => (-50.0, 100.0),
            ScalarKind::Humidity => (0.0, 100.0),
            ScalarKind::Proximity { max_range } => (0.0, *max_range),
        }
    }

    /// Number of readings kept visible.
    pub fn window_capacity(&self) -> usize {
        match self {
            ScalarKind::Temperature | ScalarKind::Humidity => 50,
            ScalarKind::Proximity { .. } => 20,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            ScalarKind::Temperature => "°C",
            ScalarKind::Humidity => "%",
            ScalarKind::Proximity { .. } => "cm",
        }
    }
}

/// Bounded window of recent readings with running extremes.
#[derive(Debug, Clone)]
pub struct ReadingWindow {
    kind: ScalarKind,
    values: VecDeque<f32>,
    min: Option<f32>,
    max: Option<f32>,
    rejected: u32,
}

impl ReadingWindow {
    pub fn new(kind: ScalarKind) -> Self {
        Self {
            kind,
            values: VecDeque::with_capacity(kind.window_capacity()),
            min: None,
            max: None,
            rejected: 0,
        }
    }

    /// Add a reading. Implausible values are rejected and not stored.
    ///
    /// Min and max cover every accepted reading since the last `clear`,
    /// including ones that have scrolled out of the window.
    pub fn push(&mut self, value: f32) -> Result<(), SensingError> {
        let (lo, hi) = self.kind.plausible_range();
        if !value.is_finite() || value < lo || value > hi {
            self.rejected += 1;
            warn!(kind = ?self.kind.sensor(), value, "ignoring implausible reading");
            return Err(SensingError::ImplausibleReading {
                kind: self.kind.sensor(),
                value,
            });
        }

        if self.values.len() == self.kind.window_capacity() {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        Ok(())
    }

    pub fn latest(&self) -> Option<f32> {
        self.values.back().copied()
    }

    pub fn min(&self) -> Option<f32> {
        self.min
    }

    pub fn max(&self) -> Option<f32> {
        self.max
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Visible readings, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().copied()
    }

    /// Forget all readings, e.g. when the screen is shown again.
    pub fn clear(&mut self) {
        self.values.clear();
        self.min = None;
        self.max = None;
        self.rejected = 0;
    }

    /// "Current: 21.5°C (Min: 20.1°C, Max: 29.8°C)"
    pub fn summary(&self) -> Option<String> {
        let unit = self.kind.unit();
        let (latest, min, max) = (self.latest()?, self.min?, self.max?);
        Some(format!(
            "Current: {latest:.1}{unit} (Min: {min:.1}{unit}, Max: {max:.1}{unit})"
        ))
    }
}
