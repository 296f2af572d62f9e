//! Core data types for the attitude sensing engine.
//!
//! Raw samples come in, attitudes and motion transitions go out. Everything
//! the presentation layer needs to render is expressed as one of the types
//! in this module; nothing crosses the boundary as a bare tuple.

use serde::{Deserialize, Serialize};

use crate::rotation::normalize_degrees;

/// Three-axis raw sensor reading.
///
/// Accelerometer readings are in m/s², magnetometer readings in µT.
/// Device frame: x to the right of the screen, y towards the top, z out of
/// the screen.
pub type Vector3 = nalgebra::Vector3<f32>;

/// Kind of physical sensor a sample or reading originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Accelerometer,
    Magnetometer,
    /// Platform orientation sensor that reports azimuth directly.
    Orientation,
    Temperature,
    Humidity,
    Proximity,
}

/// A single tagged sample delivered by the host platform.
///
/// Samples for different sensors arrive independently and at their own rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorSample {
    /// Gravity + linear acceleration, m/s².
    Accelerometer(Vector3),
    /// Geomagnetic field, µT.
    Magnetometer(Vector3),
    /// Azimuth in degrees from a direct orientation sensor.
    Azimuth(f32),
}

impl SensorSample {
    /// Sensor that produced this sample.
    pub fn kind(&self) -> SensorKind {
        match self {
            SensorSample::Accelerometer(_) => SensorKind::Accelerometer,
            SensorSample::Magnetometer(_) => SensorKind::Magnetometer,
            SensorSample::Azimuth(_) => SensorKind::Orientation,
        }
    }

    pub fn accelerometer(x: f32, y: f32, z: f32) -> Self {
        SensorSample::Accelerometer(Vector3::new(x, y, z))
    }

    pub fn magnetometer(x: f32, y: f32, z: f32) -> Self {
        SensorSample::Magnetometer(Vector3::new(x, y, z))
    }
}

/// Device attitude in degrees.
///
/// Azimuth is always in [0, 360). Pitch and roll keep the native ranges of
/// the rotation-matrix decomposition: pitch in [-90, 90], roll in (-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Attitude {
    /// Heading clockwise from magnetic north.
    pub azimuth: f32,
    /// Rotation about the lateral (x) axis, nose up/down.
    pub pitch: f32,
    /// Rotation about the forward (y) axis, tilt left/right.
    pub roll: f32,
}

impl Attitude {
    /// Build an attitude from degree values, normalizing the azimuth.
    pub fn new(azimuth: f32, pitch: f32, roll: f32) -> Self {
        Self {
            azimuth: normalize_degrees(azimuth),
            pitch,
            roll,
        }
    }

    /// Build an attitude from the raw radian output of a decomposition.
    pub fn from_radians(azimuth: f32, pitch: f32, roll: f32) -> Self {
        Self::new(azimuth.to_degrees(), pitch.to_degrees(), roll.to_degrees())
    }

    /// Round every angle to the nearest whole degree.
    ///
    /// Display only. The motion classifier works on unrounded values.
    pub fn rounded(&self) -> Self {
        Self {
            azimuth: normalize_degrees(self.azimuth.round()),
            pitch: self.pitch.round(),
            roll: self.roll.round(),
        }
    }

    /// Compass octant of the azimuth.
    pub fn direction(&self) -> CompassDirection {
        CompassDirection::from_azimuth(self.azimuth)
    }
}

/// Debounced motion state of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionState {
    #[default]
    Stationary,
    Moving,
}

impl MotionState {
    pub fn is_moving(&self) -> bool {
        matches!(self, MotionState::Moving)
    }

    /// Short human-readable status line.
    pub fn description(&self) -> &'static str {
        match self {
            MotionState::Stationary => "Device is stationary",
            MotionState::Moving => "Device is moving",
        }
    }
}

/// A change of [`MotionState`], the only motion output the core emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionTransition {
    /// State entered.
    pub state: MotionState,
    /// Host timestamp (ms) at which the transition fired.
    pub timestamp_ms: u64,
}

/// One of the eight compass octants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompassDirection {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl CompassDirection {
    /// Classify an azimuth in degrees.
    ///
    /// North covers [337.5, 360) and [0, 22.5); every other octant is a
    /// 45° band, lower bound inclusive.
    pub fn from_azimuth(azimuth: f32) -> Self {
        let a = normalize_degrees(azimuth);
        if a >= 337.5 || a < 22.5 {
            CompassDirection::N
        } else if a < 67.5 {
            CompassDirection::NE
        } else if a < 112.5 {
            CompassDirection::E
        } else if a < 157.5 {
            CompassDirection::SE
        } else if a < 202.5 {
            CompassDirection::S
        } else if a < 247.5 {
            CompassDirection::SW
        } else if a < 292.5 {
            CompassDirection::W
        } else {
            CompassDirection::NW
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompassDirection::N => "N",
            CompassDirection::NE => "NE",
            CompassDirection::E => "E",
            CompassDirection::SE => "SE",
            CompassDirection::S => "S",
            CompassDirection::SW => "SW",
            CompassDirection::W => "W",
            CompassDirection::NW => "NW",
        }
    }

    /// Stable numeric code for the C boundary (N = 0, clockwise).
    pub fn code(&self) -> i32 {
        match self {
            CompassDirection::N => 0,
            CompassDirection::NE => 1,
            CompassDirection::E => 2,
            CompassDirection::SE => 3,
            CompassDirection::S => 4,
            CompassDirection::SW => 5,
            CompassDirection::W => 6,
            CompassDirection::NW => 7,
        }
    }
}

/// Which orientation-related sensors the device exposes.
///
/// Checked once by the host when the session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorAvailability {
    pub accelerometer: bool,
    pub magnetometer: bool,
    /// Raw orientation sensor reporting azimuth directly.
    pub orientation: bool,
}

impl SensorAvailability {
    /// Accelerometer and magnetometer only, the common case on modern phones.
    pub fn fused() -> Self {
        Self {
            accelerometer: true,
            magnetometer: true,
            orientation: false,
        }
    }

    pub fn all() -> Self {
        Self {
            accelerometer: true,
            magnetometer: true,
            orientation: true,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
