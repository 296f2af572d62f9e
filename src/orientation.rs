//! Orientation Estimation from accelerometer + magnetometer.
//!
//! This module turns raw sensor samples into a device [`Attitude`]. Two
//! input forms are supported, picked once when the session starts:
//!
//! - **Fused**: the latest accelerometer and magnetometer vectors are kept
//!   (each new sample overwrites the previous one of its kind, no smoothing)
//!   and an attitude is recomputed through the gravity + field rotation
//!   matrix every time either vector changes.
//! - **Direct**: a platform orientation sensor already reports azimuth in
//!   degrees; no fusion step is needed.
//!
//! Fusion failures (free fall, zero or vertical field) are recoverable: the
//! update is skipped and the last good attitude stays in place.

use tracing::{debug, info};

use crate::error::SensingError;
use crate::rotation::{decompose, rotation_matrix};
use crate::types::{Attitude, SensorAvailability, SensorKind, SensorSample, Vector3};

/// Where attitudes come from for the lifetime of a sensing session.
#[derive(Debug, Clone, PartialEq)]
pub enum OrientationSource {
    /// Accelerometer + magnetometer fusion, holding the latest vector of each kind.
    Fused {
        accel: Option<Vector3>,
        mag: Option<Vector3>,
    },
    /// Platform orientation sensor supplying azimuth directly.
    Direct,
}

impl OrientationSource {
    /// Fresh fused source with no samples buffered.
    pub fn fused() -> Self {
        OrientationSource::Fused {
            accel: None,
            mag: None,
        }
    }

    /// Choose a source from what the device offers.
    ///
    /// A raw orientation sensor wins when present. Otherwise both the
    /// accelerometer and the magnetometer are required.
    pub fn select(availability: SensorAvailability) -> Result<Self, SensingError> {
        if availability.orientation {
            return Ok(OrientationSource::Direct);
        }
        if !availability.accelerometer {
            return Err(SensingError::SensorUnavailable(SensorKind::Accelerometer));
        }
        if !availability.magnetometer {
            return Err(SensingError::SensorUnavailable(SensorKind::Magnetometer));
        }
        Ok(OrientationSource::fused())
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrientationSource::Fused { .. } => "fused",
            OrientationSource::Direct => "direct",
        }
    }

    /// True once every sample kind this source needs has been seen.
    pub fn is_primed(&self) -> bool {
        match self {
            OrientationSource::Fused { accel, mag } => accel.is_some() && mag.is_some(),
            OrientationSource::Direct => true,
        }
    }

    fn clear(&mut self) {
        if let OrientationSource::Fused { accel, mag } = self {
            *accel = None;
            *mag = None;
        }
    }
}

/// Attitude estimator owning the per-session sample state.
pub struct OrientationEstimator {
    source: OrientationSource,
    last_attitude: Option<Attitude>,
    fusion_count: u64,
    failure_count: u64,
}

impl OrientationEstimator {
    /// Create an estimator for the given source.
    pub fn new(source: OrientationSource) -> Self {
        info!(source = source.name(), "orientation source selected");
        Self {
            source,
            last_attitude: None,
            fusion_count: 0,
            failure_count: 0,
        }
    }

    /// Create an estimator by probing sensor availability once.
    pub fn from_availability(availability: SensorAvailability) -> Result<Self, SensingError> {
        OrientationSource::select(availability).map(Self::new)
    }

    /// Feed one sample.
    ///
    /// - `Ok(Some(attitude))`: a new attitude was computed.
    /// - `Ok(None)`: cold start, not every required sample kind has arrived yet.
    /// - `Err(DecompositionFailure)`: degenerate vectors, skip this update.
    /// - `Err(InvalidSample)`: non-finite direct azimuth, skip this update.
    /// - `Err(SampleKindMismatch)`: the sample does not belong to this source.
    pub fn update(&mut self, sample: &SensorSample) -> Result<Option<Attitude>, SensingError> {
        let fused = match (&mut self.source, sample) {
            (OrientationSource::Direct, SensorSample::Azimuth(degrees)) => {
                if degrees.is_finite() {
                    Some(Ok(Attitude::new(*degrees, 0.0, 0.0)))
                } else {
                    Some(Err(SensingError::InvalidSample {
                        kind: SensorKind::Orientation,
                        value: *degrees,
                    }))
                }
            }
            (OrientationSource::Fused { accel, mag }, SensorSample::Accelerometer(v)) => {
                *accel = Some(*v);
                Self::fuse(accel, mag)
            }
            (OrientationSource::Fused { accel, mag }, SensorSample::Magnetometer(v)) => {
                *mag = Some(*v);
                Self::fuse(accel, mag)
            }
            (source, sample) => {
                return Err(SensingError::SampleKindMismatch {
                    expected: source.name(),
                    got: sample.kind(),
                });
            }
        };

        let attitude = match fused {
            None => return Ok(None),
            Some(Ok(attitude)) => attitude,
            Some(Err(err)) => {
                self.failure_count += 1;
                debug!(failures = self.failure_count, %err, "skipping update");
                return Err(err);
            }
        };

        self.fusion_count += 1;
        self.last_attitude = Some(attitude);
        Ok(Some(attitude))
    }

    /// Most recent successfully computed attitude.
    pub fn last_attitude(&self) -> Option<Attitude> {
        self.last_attitude
    }

    pub fn source(&self) -> &OrientationSource {
        &self.source
    }

    /// Number of attitudes emitted.
    pub fn fusion_count(&self) -> u64 {
        self.fusion_count
    }

    /// Number of updates skipped because of degenerate input.
    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }

    /// Drop buffered samples and the last attitude. The source kind is kept.
    pub fn reset(&mut self) {
        self.source.clear();
        self.last_attitude = None;
        self.fusion_count = 0;
        self.failure_count = 0;
    }

    // =========================================================================
    // PRIVATE METHODS
    // =========================================================================

    /// `None` while cold; otherwise the fusion result.
    fn fuse(
        accel: &Option<Vector3>,
        mag: &Option<Vector3>,
    ) -> Option<Result<Attitude, SensingError>> {
        let (a, m) = match (accel, mag) {
            (Some(a), Some(m)) => (a, m),
            _ => return None,
        };
        Some(
            rotation_matrix(a, m)
                .map(|r| {
                    let [azimuth, pitch, roll] = decompose(&r);
                    Attitude::from_radians(azimuth, pitch, roll)
                })
                .ok_or(SensingError::DecompositionFailure),
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
