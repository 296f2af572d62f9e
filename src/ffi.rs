//! C FFI Bindings for mobile hosts
//!
//! Exposes the sensing core to iOS/Android through a C ABI. The host owns
//! the sensor callbacks and the timer primitive:
//!
//! - Push each sample with the host timestamp; read the filled output.
//! - When the output carries a timer request (`timer_handle != 0`), cancel
//!   any previously scheduled callback and schedule one for
//!   `timer_deadline_ms` that calls `attitude_core_timeout_fired`.
//! - Call `attitude_core_shutdown` when the consuming view goes away, then
//!   `attitude_core_destroy`.
//!
//! Memory Safety:
//! - The core instance must be freed with `attitude_core_destroy()`
//! - NULL checks are performed on all inputs
//!
//! Thread Safety:
//! - The core is NOT thread-safe. Call it from the sensor delivery thread only.

use std::os::raw::c_char;
use std::ptr;

use crate::compass::DialPolicy;
use crate::config::SensingConfig;
use crate::error::SensingError;
use crate::orientation::OrientationSource;
use crate::session::{CoreOutput, SensingCore};
use crate::timer::TimerHandle;
use crate::types::{MotionState, MotionTransition, SensorAvailability, SensorSample};

// ============================================================================
// OPAQUE HANDLE TYPES
// ============================================================================

/// Opaque handle to the attitude sensing core.
pub struct AttitudeCore {
    core: SensingCore,
}

/// Result status codes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttitudeStatus {
    /// Operation succeeded.
    Ok = 0,
    /// Null pointer provided.
    NullPointer = 1,
    /// Invalid parameter value.
    InvalidParameter = 2,
    /// Sample skipped (degenerate vectors or wrong sample kind). Not fatal.
    Skipped = 3,
    /// Core was shut down.
    Closed = 4,
}

impl From<&SensingError> for AttitudeStatus {
    fn from(err: &SensingError) -> Self {
        match err {
            SensingError::SessionClosed => AttitudeStatus::Closed,
            SensingError::InvalidSample { .. } => AttitudeStatus::InvalidParameter,
            e if e.is_recoverable() => AttitudeStatus::Skipped,
            _ => AttitudeStatus::InvalidParameter,
        }
    }
}

/// Configuration for the core.
#[repr(C)]
#[derive(Debug, Clone)]
pub struct AttitudeConfig {
    /// Motion threshold in degrees (0 = default 2.0).
    pub threshold_deg: f32,
    /// Quiet period before reporting stationary (0 = default 1000).
    pub timeout_ms: u64,
    /// Round display heading to whole degrees (0 or 1).
    pub round_display: i32,
    /// Dial policy (0 = shortest path, 1 = naive).
    pub dial_policy: i32,
    /// Device has an accelerometer (0 or 1).
    pub has_accelerometer: i32,
    /// Device has a magnetometer (0 or 1).
    pub has_magnetometer: i32,
    /// Device has a raw orientation sensor (0 or 1).
    pub has_orientation: i32,
}

/// Output from a single sample or timeout.
#[repr(C)]
#[derive(Debug, Clone)]
pub struct AttitudeOutput {
    /// A new attitude was computed (0 or 1). Angles are 0 otherwise.
    pub attitude_valid: i32,
    /// Azimuth in degrees, [0, 360).
    pub azimuth_deg: f32,
    /// Pitch in degrees, [-90, 90].
    pub pitch_deg: f32,
    /// Roll in degrees, (-180, 180].
    pub roll_deg: f32,
    /// Heading to show (rounded if configured).
    pub display_heading_deg: f32,
    /// Compass octant (0=N, 1=NE, ... 7=NW; -1 if no attitude).
    pub octant: i32,
    /// Dial animation start angle in degrees.
    pub dial_from_deg: f32,
    /// Dial animation end angle in degrees.
    pub dial_to_deg: f32,
    /// Dial animation duration in ms (0 if no rotation).
    pub dial_duration_ms: u32,
    /// Motion state after this call (0=Stationary, 1=Moving).
    pub motion_state: i32,
    /// The motion state changed during this call (0 or 1).
    pub transition: i32,
    /// Timer to schedule, 0 if none. Replaces any earlier request.
    pub timer_handle: u64,
    /// Host timestamp at which to call `attitude_core_timeout_fired`.
    pub timer_deadline_ms: u64,
}

impl AttitudeOutput {
    fn empty() -> Self {
        Self {
            attitude_valid: 0,
            azimuth_deg: 0.0,
            pitch_deg: 0.0,
            roll_deg: 0.0,
            display_heading_deg: 0.0,
            octant: -1,
            dial_from_deg: 0.0,
            dial_to_deg: 0.0,
            dial_duration_ms: 0,
            motion_state: 0,
            transition: 0,
            timer_handle: 0,
            timer_deadline_ms: 0,
        }
    }

    fn fill(&mut self, out: &CoreOutput, state: MotionState) {
        *self = Self::empty();
        if let Some(attitude) = out.attitude {
            self.attitude_valid = 1;
            self.azimuth_deg = attitude.azimuth;
            self.pitch_deg = attitude.pitch;
            self.roll_deg = attitude.roll;
        }
        if let Some(heading) = out.heading {
            self.display_heading_deg = heading.degrees;
            self.octant = heading.direction.code();
        }
        if let Some(dial) = out.dial {
            self.dial_from_deg = dial.from;
            self.dial_to_deg = dial.to;
            self.dial_duration_ms = dial.duration_ms as u32;
        }
        if let Some(request) = out.motion.timer {
            self.timer_handle = request.handle.id();
            self.timer_deadline_ms = request.deadline_ms;
        }
        self.set_motion(state, out.motion.transition);
    }

    fn set_motion(&mut self, state: MotionState, transition: Option<MotionTransition>) {
        self.motion_state = motion_state_code(state);
        self.transition = i32::from(transition.is_some());
    }
}

impl Default for AttitudeOutput {
    fn default() -> Self {
        Self::empty()
    }
}

fn motion_state_code(state: MotionState) -> i32 {
    match state {
        MotionState::Stationary => 0,
        MotionState::Moving => 1,
    }
}

fn sensing_config(config: &AttitudeConfig) -> SensingConfig {
    let mut sensing = SensingConfig::default();
    if config.threshold_deg != 0.0 {
        sensing.motion.threshold_deg = config.threshold_deg;
    }
    if config.timeout_ms != 0 {
        sensing.motion.timeout_ms = config.timeout_ms;
    }
    sensing.display.round = config.round_display != 0;
    sensing.display.dial_policy = match config.dial_policy {
        1 => DialPolicy::Naive,
        _ => DialPolicy::ShortestPath,
    };
    sensing
}

// ============================================================================
// CORE LIFECYCLE
// ============================================================================

/// Create a new attitude core.
///
/// # Safety
/// - `config` must be a valid pointer to AttitudeConfig.
/// - The returned pointer must be freed with `attitude_core_destroy()`.
///
/// # Returns
/// - Pointer to AttitudeCore on success.
/// - NULL if the config is invalid or the required sensors are missing.
#[no_mangle]
pub unsafe extern "C" fn attitude_core_create(config: *const AttitudeConfig) -> *mut AttitudeCore {
    if config.is_null() {
        return ptr::null_mut();
    }

    let config = &*config;
    let availability = SensorAvailability {
        accelerometer: config.has_accelerometer != 0,
        magnetometer: config.has_magnetometer != 0,
        orientation: config.has_orientation != 0,
    };

    match SensingCore::from_availability(availability, &sensing_config(config)) {
        Ok(core) => Box::into_raw(Box::new(AttitudeCore { core })),
        Err(e) => {
            tracing::warn!(%e, "attitude core not created");
            ptr::null_mut()
        }
    }
}

/// Destroy an attitude core.
///
/// # Safety
/// - `core` must be a valid pointer from `attitude_core_create()`.
/// - Must not be called more than once for the same pointer.
#[no_mangle]
pub unsafe extern "C" fn attitude_core_destroy(core: *mut AttitudeCore) {
    if !core.is_null() {
        drop(Box::from_raw(core));
    }
}

/// Stop the core. Any outstanding timer request becomes stale and all later
/// samples return `Closed`. The host should also cancel its scheduled callback.
///
/// # Safety
/// - `core` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn attitude_core_shutdown(core: *mut AttitudeCore) -> AttitudeStatus {
    if core.is_null() {
        return AttitudeStatus::NullPointer;
    }
    (*core).core.shutdown();
    AttitudeStatus::Ok
}

// ============================================================================
// SAMPLE PROCESSING
// ============================================================================

unsafe fn push(
    core: *mut AttitudeCore,
    sample: SensorSample,
    now_ms: u64,
    output: *mut AttitudeOutput,
) -> AttitudeStatus {
    if core.is_null() || output.is_null() {
        return AttitudeStatus::NullPointer;
    }

    let core = &mut (*core).core;
    let output = &mut *output;

    match core.process(&sample, now_ms) {
        Ok(out) => {
            output.fill(&out, core.motion_state());
            AttitudeStatus::Ok
        }
        Err(e) => {
            output.fill(&CoreOutput::default(), core.motion_state());
            AttitudeStatus::from(&e)
        }
    }
}

/// Push an accelerometer sample (m/s², device frame).
///
/// # Safety
/// - `core` must be a valid pointer.
/// - `output` must be a valid pointer to receive results.
#[no_mangle]
pub unsafe extern "C" fn attitude_core_push_accelerometer(
    core: *mut AttitudeCore,
    now_ms: u64,
    x: f32,
    y: f32,
    z: f32,
    output: *mut AttitudeOutput,
) -> AttitudeStatus {
    push(core, SensorSample::accelerometer(x, y, z), now_ms, output)
}

/// Push a magnetometer sample (µT, device frame).
///
/// # Safety
/// - `core` must be a valid pointer.
/// - `output` must be a valid pointer to receive results.
#[no_mangle]
pub unsafe extern "C" fn attitude_core_push_magnetometer(
    core: *mut AttitudeCore,
    now_ms: u64,
    x: f32,
    y: f32,
    z: f32,
    output: *mut AttitudeOutput,
) -> AttitudeStatus {
    push(core, SensorSample::magnetometer(x, y, z), now_ms, output)
}

/// Push an azimuth reading from a raw orientation sensor (degrees).
/// Non-finite values return `InvalidParameter` and leave the core untouched.
///
/// # Safety
/// - `core` must be a valid pointer.
/// - `output` must be a valid pointer to receive results.
#[no_mangle]
pub unsafe extern "C" fn attitude_core_push_azimuth(
    core: *mut AttitudeCore,
    now_ms: u64,
    azimuth_deg: f32,
    output: *mut AttitudeOutput,
) -> AttitudeStatus {
    push(core, SensorSample::Azimuth(azimuth_deg), now_ms, output)
}

/// Deliver a scheduled timer callback.
///
/// Stale handles (superseded by a later request) are ignored and report no
/// transition. Only `motion_state` and `transition` are meaningful in the
/// output.
///
/// # Safety
/// - `core` must be a valid pointer.
/// - `output` must be a valid pointer to receive results.
#[no_mangle]
pub unsafe extern "C" fn attitude_core_timeout_fired(
    core: *mut AttitudeCore,
    timer_handle: u64,
    now_ms: u64,
    output: *mut AttitudeOutput,
) -> AttitudeStatus {
    if core.is_null() || output.is_null() {
        return AttitudeStatus::NullPointer;
    }

    let core = &mut (*core).core;
    let output = &mut *output;
    if core.is_closed() {
        *output = AttitudeOutput::empty();
        return AttitudeStatus::Closed;
    }

    let transition = core.timeout_fired(TimerHandle::from_id(timer_handle), now_ms);
    *output = AttitudeOutput::empty();
    output.set_motion(core.motion_state(), transition);
    AttitudeStatus::Ok
}

// ============================================================================
// STATUS QUERIES
// ============================================================================

/// Get the current motion state (0=Stationary, 1=Moving, -1 on NULL).
#[no_mangle]
pub unsafe extern "C" fn attitude_core_motion_state(core: *const AttitudeCore) -> i32 {
    if core.is_null() {
        return -1;
    }
    motion_state_code((*core).core.motion_state())
}

/// Get the orientation source (0=fused, 1=direct, -1 on NULL).
#[no_mangle]
pub unsafe extern "C" fn attitude_core_source(core: *const AttitudeCore) -> i32 {
    if core.is_null() {
        return -1;
    }
    match (*core).core.source() {
        OrientationSource::Direct => 1,
        OrientationSource::Fused { .. } => 0,
    }
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Get the library version string.
///
/// # Returns
/// - Static string, do NOT free.
#[no_mangle]
pub extern "C" fn attitude_core_version() -> *const c_char {
    static VERSION: &[u8] =
        concat!("attitude-sensing/", env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

// ============================================================================
// TESTS
// ============================================================================
