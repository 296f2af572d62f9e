//! Rotation matrix from gravity and geomagnetic field.
//!
//! The device attitude is recovered from two simultaneous vector
//! observations: gravity (accelerometer) fixes "down", the geomagnetic field
//! (magnetometer) fixes "north" once its vertical component is projected out.
//!
//! The world frame is East-North-Up. The returned matrix R maps world
//! coordinates to device coordinates when applied to world axes, i.e. its
//! rows are the world East, North and Up axes expressed in the device frame:
//!
//! ```text
//!     | Hx  Hy  Hz |   H = E x A   (east)
//! R = | Mx  My  Mz |   M = A x H   (north)
//!     | Ax  Ay  Az |   A = gravity (up)
//! ```

use nalgebra::Matrix3;

use crate::types::Vector3;

/// Standard gravity, m/s².
pub const STANDARD_GRAVITY: f32 = 9.806_65;

/// Below this squared acceleration the device is considered in free fall.
const FREE_FALL_GRAVITY_SQUARED: f32 = 0.01 * STANDARD_GRAVITY * STANDARD_GRAVITY;

/// Minimum magnitude of E x A. Smaller values mean no usable field, or a
/// field (nearly) parallel to gravity.
const MIN_EAST_NORM: f32 = 0.1;

/// Compute the world-to-device rotation matrix.
///
/// Returns `None` when the input vectors are degenerate: acceleration close
/// to zero (free fall), magnetic field close to zero, or field parallel to
/// gravity (device at a magnetic pole).
pub fn rotation_matrix(gravity: &Vector3, geomagnetic: &Vector3) -> Option<Matrix3<f32>> {
    let normsq_a = gravity.norm_squared();
    if !normsq_a.is_finite() || normsq_a < FREE_FALL_GRAVITY_SQUARED {
        return None;
    }

    let h = geomagnetic.cross(gravity);
    let norm_h = h.norm();
    if !norm_h.is_finite() || norm_h < MIN_EAST_NORM {
        return None;
    }

    let h = h / norm_h;
    let a = gravity / normsq_a.sqrt();
    let m = a.cross(&h);

    Some(Matrix3::new(
        h.x, h.y, h.z, //
        m.x, m.y, m.z, //
        a.x, a.y, a.z,
    ))
}

/// Decompose a rotation matrix into `[azimuth, pitch, roll]` radians.
///
/// - azimuth: rotation about -z, (-π, π], 0 = magnetic north
/// - pitch: rotation about x, [-π/2, π/2]
/// - roll: rotation about y, (-π, π]
pub fn decompose(r: &Matrix3<f32>) -> [f32; 3] {
    let azimuth = r[(0, 1)].atan2(r[(1, 1)]);
    // Clamp so accumulated rounding never pushes asin out of its domain.
    let pitch = (-r[(2, 1)]).clamp(-1.0, 1.0).asin();
    let roll = (-r[(2, 0)]).atan2(r[(2, 2)]);
    [azimuth, pitch, roll]
}

/// Map any finite angle in degrees into [0, 360).
pub fn normalize_degrees(degrees: f32) -> f32 {
    let d = degrees.rem_euclid(360.0);
    // -1e-6 + 360.0 rounds to exactly 360.0 in f32
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

// ============================================================================
// TESTS
// ============================================================================
