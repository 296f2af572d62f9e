//! Error taxonomy for the sensing core.
//!
//! Nothing in here is fatal. Every failure degrades to "no update this
//! cycle" or to a one-time mode switch chosen at session start.

use crate::types::SensorKind;

/// Errors produced by the attitude and motion core.
#[derive(Debug, thiserror::Error)]
pub enum SensingError {
    /// Gravity and geomagnetic vectors could not be turned into a rotation
    /// matrix (free fall, zero field, or the two vectors are parallel).
    #[error("rotation matrix decomposition failed: degenerate gravity/field vectors")]
    DecompositionFailure,

    /// A required sensor is missing on this device.
    #[error("sensor unavailable: {0:?}")]
    SensorUnavailable(SensorKind),

    /// The sample does not belong to the orientation source selected at startup.
    #[error("unexpected {got:?} sample for {expected} orientation source")]
    SampleKindMismatch {
        expected: &'static str,
        got: SensorKind,
    },

    /// A sample carrying a non-finite value.
    #[error("invalid {kind:?} sample: {value}")]
    InvalidSample { kind: SensorKind, value: f32 },

    /// A scalar reading outside the physically plausible range for its sensor.
    #[error("implausible {kind:?} reading: {value}")]
    ImplausibleReading { kind: SensorKind, value: f32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// The background sensing task has already stopped.
    #[error("sensing session is closed")]
    SessionClosed,
}

impl SensingError {
    /// Whether the caller should simply skip this update and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SensingError::DecompositionFailure
                | SensingError::SampleKindMismatch { .. }
                | SensingError::InvalidSample { .. }
                | SensingError::ImplausibleReading { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(SensingError::DecompositionFailure.is_recoverable());
        assert!(SensingError::ImplausibleReading {
            kind: SensorKind::Temperature,
            value: 500.0
        }
        .is_recoverable());
        assert!(SensingError::InvalidSample {
            kind: SensorKind::Orientation,
            value: f32::NAN
        }
        .is_recoverable());
        assert!(!SensingError::SensorUnavailable(SensorKind::Magnetometer).is_recoverable());
        assert!(!SensingError::SessionClosed.is_recoverable());
    }

    #[test]
    fn test_display_messages() {
        let err = SensingError::SampleKindMismatch {
            expected: "direct",
            got: SensorKind::Accelerometer,
        };
        assert_eq!(
            err.to_string(),
            "unexpected Accelerometer sample for direct orientation source"
        );
    }
}
