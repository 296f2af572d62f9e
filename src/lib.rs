//! Attitude Sensing Library
//!
//! A small on-device core that turns raw accelerometer and magnetometer
//! samples into a device attitude (azimuth, pitch, roll), smooths the
//! heading for a compass display and classifies the device as moving or
//! stationary with a debounced quiet-period timeout.
//!
//! # Design Philosophy
//!
//! - **Single owner**: all per-session state lives in one [`SensingCore`];
//!   nothing is global.
//! - **Degrade, never crash**: degenerate sensor input skips one update,
//!   missing sensors switch the session to another source once.
//! - **One timer**: the motion timeout is a single re-armed deadline, never
//!   a polling loop.
//! - **O(1) per sample**: no buffering beyond the last vector of each kind.
//!
//! # Example
//!
//! ```ignore
//! use attitude_sensing::{OrientationSource, SensingConfig, SensingCore, SensorSample};
//!
//! let mut core = SensingCore::new(OrientationSource::fused(), &SensingConfig::default());
//! core.process(&SensorSample::accelerometer(0.0, 0.0, 9.81), 0)?;
//! let out = core.process(&SensorSample::magnetometer(0.0, 22.0, -42.0), 20)?;
//! if let Some(heading) = out.heading {
//!     println!("{heading}");
//! }
//! ```

pub mod compass;
pub mod config;
pub mod error;
pub mod ffi;
pub mod motion;
pub mod orientation;
pub mod readings;
pub mod rotation;
pub mod session;
pub mod simulated;
pub mod timer;
pub mod types;


// Re-export commonly used types
pub use compass::{CompassDial, DialPolicy, DialRotation, HeadingReadout};
pub use config::{DisplayConfig, SensingConfig};
pub use error::SensingError;
pub use motion::{circular_distance, AngularDelta, MotionClassifier, MotionConfig, MotionUpdate};
pub use orientation::{OrientationEstimator, OrientationSource};
pub use readings::{ReadingWindow, ScalarKind};
pub use session::{CoreOutput, SensingCore, SensingSession, TRANSITION_BUFFER};
pub use simulated::{FallbackMode, SimulatedSensor, SIMULATED_INTERVAL_MS};
pub use timer::{DeadlineTimer, TimerHandle, TimerRequest};
pub use types::{
    Attitude, CompassDirection, MotionState, MotionTransition, SensorAvailability, SensorKind,
    SensorSample, Vector3,
};
