//! Sensing session: the single owner of estimator, classifier and dial.
//!
//! [`SensingCore`] is the synchronous form for hosts that own their clock
//! and timer primitive (the C boundary uses it). [`SensingSession`] runs a
//! core on a tokio task and drives the motion timeout with one re-armed
//! `Sleep`.
//!
//! Transitions reach a session's consumer two ways: the latest state is
//! always readable from a `watch`, and each edge is queued on a bounded
//! channel of [`TRANSITION_BUFFER`] entries. Once the queue is full, new
//! edges are dropped until the consumer drains it; the task never blocks on
//! it.

use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::compass::{CompassDial, DialRotation, HeadingReadout};
use crate::config::SensingConfig;
use crate::error::SensingError;
use crate::motion::{MotionClassifier, MotionUpdate};
use crate::orientation::{OrientationEstimator, OrientationSource};
use crate::timer::{TimerHandle, TimerRequest};
use crate::types::{Attitude, MotionState, MotionTransition, SensorAvailability, SensorSample};

/// Transitions queued for [`SensingSession::next_transition`] before new
/// ones are dropped.
pub const TRANSITION_BUFFER: usize = 64;

/// Everything produced by one sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoreOutput {
    /// Unrounded attitude; `None` during cold start.
    pub attitude: Option<Attitude>,
    /// Display heading, rounded if configured.
    pub heading: Option<HeadingReadout>,
    /// Dial animation step for the new heading.
    pub dial: Option<DialRotation>,
    /// Motion classifier result for the new attitude.
    pub motion: MotionUpdate,
}

/// Synchronous sensing pipeline.
pub struct SensingCore {
    estimator: OrientationEstimator,
    classifier: MotionClassifier,
    dial: CompassDial,
    round: bool,
    closed: bool,
}

impl SensingCore {
    pub fn new(source: OrientationSource, config: &SensingConfig) -> Self {
        Self {
            estimator: OrientationEstimator::new(source),
            classifier: MotionClassifier::new(config.motion),
            dial: CompassDial::new(config.display.dial_policy, config.display.round),
            round: config.display.round,
            closed: false,
        }
    }

    /// Check availability once and build the matching pipeline.
    pub fn from_availability(
        availability: SensorAvailability,
        config: &SensingConfig,
    ) -> Result<Self, SensingError> {
        config.validate()?;
        let source = OrientationSource::select(availability)?;
        Ok(Self::new(source, config))
    }

    /// Run one sample through estimator, classifier and dial.
    ///
    /// Degenerate input surfaces as `DecompositionFailure`; the caller skips
    /// it and the previous attitude stays current.
    pub fn process(
        &mut self,
        sample: &SensorSample,
        now_ms: u64,
    ) -> Result<CoreOutput, SensingError> {
        if self.closed {
            return Err(SensingError::SessionClosed);
        }
        let attitude = match self.estimator.update(sample)? {
            Some(attitude) => attitude,
            None => return Ok(CoreOutput::default()),
        };

        Ok(CoreOutput {
            attitude: Some(attitude),
            heading: Some(HeadingReadout::from_attitude(&attitude, self.round)),
            dial: Some(self.dial.rotate_to(attitude.azimuth)),
            motion: self.classifier.observe(&attitude, now_ms),
        })
    }

    /// Host callback for a timer request returned by `process`.
    pub fn timeout_fired(&mut self, handle: TimerHandle, now_ms: u64) -> Option<MotionTransition> {
        if self.closed {
            return None;
        }
        self.classifier.on_timeout(handle, now_ms)
    }

    /// Stop the pipeline. Pending timeouts are cancelled and later samples
    /// are refused with `SessionClosed`.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.classifier.shutdown();
        self.estimator.reset();
        self.dial.reset();
        info!("sensing core shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn motion_state(&self) -> MotionState {
        self.classifier.state()
    }

    pub fn last_attitude(&self) -> Option<Attitude> {
        self.estimator.last_attitude()
    }

    /// Timer the host should currently have scheduled, if any.
    pub fn pending_timer(&self) -> Option<TimerRequest> {
        self.classifier.pending_timer()
    }

    pub fn source(&self) -> &OrientationSource {
        self.estimator.source()
    }
}

/// A [`SensingCore`] running on its own tokio task.
pub struct SensingSession {
    sample_tx: mpsc::UnboundedSender<SensorSample>,
    attitude_rx: watch::Receiver<Option<Attitude>>,
    state_rx: watch::Receiver<MotionState>,
    transition_rx: mpsc::Receiver<MotionTransition>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SensingSession {
    /// Spawn the session task. Must be called within a tokio runtime.
    pub fn spawn(core: SensingCore) -> Self {
        let (sample_tx, sample_rx) = mpsc::unbounded_channel();
        let (attitude_tx, attitude_rx) = watch::channel(None);
        let (state_tx, state_rx) = watch::channel(core.motion_state());
        let (transition_tx, transition_rx) = mpsc::channel(TRANSITION_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        info!(source = core.source().name(), "starting sensing session");
        let task = tokio::spawn(session_loop(
            core,
            sample_rx,
            attitude_tx,
            Transitions {
                state: state_tx,
                queue: transition_tx,
            },
            shutdown_rx,
        ));

        Self {
            sample_tx,
            attitude_rx,
            state_rx,
            transition_rx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Check availability, build a core and spawn it.
    pub fn start(
        availability: SensorAvailability,
        config: &SensingConfig,
    ) -> Result<Self, SensingError> {
        SensingCore::from_availability(availability, config).map(Self::spawn)
    }

    /// Deliver a sample. Safe to call from the sensor callback context.
    pub fn push(&self, sample: SensorSample) -> Result<(), SensingError> {
        self.sample_tx
            .send(sample)
            .map_err(|_| SensingError::SessionClosed)
    }

    /// Latest attitude (non-blocking).
    pub fn attitude(&self) -> Option<Attitude> {
        *self.attitude_rx.borrow()
    }

    /// Receiver that is notified on every new attitude.
    pub fn watch_attitude(&self) -> watch::Receiver<Option<Attitude>> {
        self.attitude_rx.clone()
    }

    /// Current motion state. Always up to date, whether or not the
    /// transition queue is drained.
    pub fn motion_state(&self) -> MotionState {
        *self.state_rx.borrow()
    }

    /// Receiver that is notified on every motion transition.
    pub fn watch_motion_state(&self) -> watch::Receiver<MotionState> {
        self.state_rx.clone()
    }

    /// Wait for the next queued motion transition. `None` once the task has
    /// stopped and the queue is empty.
    ///
    /// Callers that use the queue should drain it; at most
    /// [`TRANSITION_BUFFER`] undelivered transitions are kept and later ones
    /// are dropped. Poll-only callers can use [`Self::motion_state`] instead.
    pub async fn next_transition(&mut self) -> Option<MotionTransition> {
        self.transition_rx.recv().await
    }

    pub fn try_next_transition(&mut self) -> Option<MotionTransition> {
        self.transition_rx.try_recv().ok()
    }

    /// Stop the task and wait for it. The pending timeout is cancelled, so no
    /// transition is delivered after this returns.
    pub async fn shutdown(mut self) -> Result<(), SensingError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match self.task.take() {
            Some(task) => task.await.map_err(|e| {
                warn!(?e, "sensing task did not exit cleanly");
                SensingError::SessionClosed
            }),
            None => Ok(()),
        }
    }
}

impl Drop for SensingSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Outbound side of the motion transitions.
struct Transitions {
    state: watch::Sender<MotionState>,
    queue: mpsc::Sender<MotionTransition>,
}

impl Transitions {
    fn publish(&self, transition: MotionTransition) {
        self.state.send_replace(transition.state);
        match self.queue.try_send(transition) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(dropped)) => {
                debug!(state = ?dropped.state, "transition queue full, dropping")
            }
        }
    }
}

async fn session_loop(
    mut core: SensingCore,
    mut sample_rx: mpsc::UnboundedReceiver<SensorSample>,
    attitude_tx: watch::Sender<Option<Attitude>>,
    transitions: Transitions,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let start = Instant::now();
    let now_ms = || start.elapsed().as_millis() as u64;

    // Single quiet-period timer, only polled while a request is pending.
    let timeout = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(timeout);
    let mut pending: Option<TimerRequest> = None;

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            sample = sample_rx.recv() => {
                let Some(sample) = sample else { break };
                match core.process(&sample, now_ms()) {
                    Ok(output) => {
                        if let Some(attitude) = output.attitude {
                            attitude_tx.send_replace(Some(attitude));
                        }
                        if let Some(transition) = output.motion.transition {
                            transitions.publish(transition);
                        }
                        if let Some(request) = output.motion.timer {
                            timeout
                                .as_mut()
                                .reset(start + Duration::from_millis(request.deadline_ms));
                            pending = Some(request);
                        }
                    }
                    Err(e) if e.is_recoverable() => debug!(%e, "skipping sample"),
                    Err(e) => warn!(%e, "dropping sample"),
                }
            }
            () = &mut timeout, if pending.is_some() => {
                if let Some(request) = pending.take() {
                    if let Some(transition) = core.timeout_fired(request.handle, now_ms()) {
                        transitions.publish(transition);
                    }
                }
            }
        }
    }

    core.shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compass::DialPolicy;
    use crate::types::CompassDirection;

    fn direct_core() -> SensingCore {
        SensingCore::new(OrientationSource::Direct, &SensingConfig::default())
    }

    #[test]
    fn test_core_cold_start_and_fusion() {
        let mut core = SensingCore::new(OrientationSource::fused(), &SensingConfig::default());
        let out = core
            .process(&SensorSample::accelerometer(0.0, 0.0, 9.81), 0)
            .unwrap();
        assert_eq!(out, CoreOutput::default());

        let out = core
            .process(&SensorSample::magnetometer(0.0, 22.0, -42.0), 10)
            .unwrap();
        let attitude = out.attitude.unwrap();
        assert!(attitude.azimuth.abs() < 0.5 || attitude.azimuth > 359.5);
        assert_eq!(out.heading.unwrap().direction, CompassDirection::N);
        assert!(out.dial.is_some());
        // First attitude only seeds the classifier.
        assert_eq!(out.motion.transition, None);
    }

    #[test]
    fn test_core_motion_round_trip() {
        let mut core = direct_core();
        core.process(&SensorSample::Azimuth(0.0), 0).unwrap();
        let out = core.process(&SensorSample::Azimuth(15.0), 100).unwrap();
        let transition = out.motion.transition.unwrap();
        assert_eq!(transition.state, MotionState::Moving);
        let request = out.motion.timer.unwrap();
        assert_eq!(request.deadline_ms, 1100);

        assert_eq!(core.timeout_fired(request.handle, 900), None);
        let settled = core.timeout_fired(request.handle, 1100).unwrap();
        assert_eq!(settled.state, MotionState::Stationary);
        assert_eq!(core.motion_state(), MotionState::Stationary);
    }

    #[test]
    fn test_core_shutdown_cancels_timeout() {
        let mut core = direct_core();
        core.process(&SensorSample::Azimuth(0.0), 0).unwrap();
        let request = core
            .process(&SensorSample::Azimuth(90.0), 50)
            .unwrap()
            .motion
            .timer
            .unwrap();

        core.shutdown();
        assert!(core.is_closed());
        assert_eq!(core.pending_timer(), None);
        assert_eq!(core.timeout_fired(request.handle, 10_000), None);
        assert!(matches!(
            core.process(&SensorSample::Azimuth(10.0), 2000),
            Err(SensingError::SessionClosed)
        ));
    }

    #[test]
    fn test_core_degenerate_sample_keeps_attitude() {
        let mut core = SensingCore::new(OrientationSource::fused(), &SensingConfig::default());
        core.process(&SensorSample::accelerometer(0.0, 0.0, 9.81), 0).unwrap();
        core.process(&SensorSample::magnetometer(0.0, 22.0, -42.0), 0).unwrap();
        let before = core.last_attitude();

        let err = core
            .process(&SensorSample::accelerometer(0.0, 0.0, 0.0), 20)
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(core.last_attitude(), before);
    }

    #[test]
    fn test_core_from_availability() {
        let config = SensingConfig::default();
        let core = SensingCore::from_availability(SensorAvailability::fused(), &config).unwrap();
        assert_eq!(core.source().name(), "fused");

        let none = SensorAvailability::default();
        assert!(matches!(
            SensingCore::from_availability(none, &config),
            Err(SensingError::SensorUnavailable(_))
        ));
    }

    #[test]
    fn test_core_uses_dial_policy() {
        let mut config = SensingConfig::default();
        config.display.dial_policy = DialPolicy::Naive;
        let mut core = SensingCore::new(OrientationSource::Direct, &config);
        core.process(&SensorSample::Azimuth(359.0), 0).unwrap();
        let dial = core.process(&SensorSample::Azimuth(1.0), 10).unwrap().dial.unwrap();
        assert_eq!(dial.sweep(), 358.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_publishes_attitude() {
        let session = SensingSession::spawn(direct_core());
        let mut attitudes = session.watch_attitude();
        assert_eq!(session.attitude(), None);

        session.push(SensorSample::Azimuth(123.0)).unwrap();
        attitudes.changed().await.unwrap();
        assert_eq!(session.attitude().map(|a| a.azimuth), Some(123.0));

        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_settles_after_quiet_period() {
        let mut session = SensingSession::spawn(direct_core());

        session.push(SensorSample::Azimuth(0.0)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.push(SensorSample::Azimuth(10.0)).unwrap();

        let moving = session.next_transition().await.unwrap();
        assert_eq!(moving.state, MotionState::Moving);

        let stationary = session.next_transition().await.unwrap();
        assert_eq!(stationary.state, MotionState::Stationary);
        assert_eq!(stationary.timestamp_ms - moving.timestamp_ms, 1000);

        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_rearms_on_each_movement() {
        let mut session = SensingSession::spawn(direct_core());

        session.push(SensorSample::Azimuth(0.0)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.push(SensorSample::Azimuth(10.0)).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        session.push(SensorSample::Azimuth(20.0)).unwrap();

        let moving = session.next_transition().await.unwrap();
        assert_eq!(moving.state, MotionState::Moving);
        let stationary = session.next_transition().await.unwrap();
        assert_eq!(stationary.state, MotionState::Stationary);
        assert_eq!(stationary.timestamp_ms - moving.timestamp_ms, 1500);

        // Below-threshold jitter does not re-enter Moving.
        session.push(SensorSample::Azimuth(21.0)).unwrap();
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(session.try_next_transition(), None);

        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_shutdown_stops_task() {
        let mut session = SensingSession::spawn(direct_core());
        let mut attitudes = session.watch_attitude();

        session.push(SensorSample::Azimuth(0.0)).unwrap();
        session.push(SensorSample::Azimuth(45.0)).unwrap();
        let moving = session.next_transition().await.unwrap();
        assert_eq!(moving.state, MotionState::Moving);
        attitudes.borrow_and_update();

        // Timeout still pending when the session goes away.
        session.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert!(attitudes.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_undrained_transitions_are_bounded() {
        let mut session = SensingSession::spawn(direct_core());
        let mut states = session.watch_motion_state();

        session.push(SensorSample::Azimuth(0.0)).unwrap();
        for i in 1..=100u32 {
            session.push(SensorSample::Azimuth((i * 90 % 360) as f32)).unwrap();
            tokio::time::sleep(Duration::from_millis(2000)).await;
        }

        // 200 edges happened; the state is current regardless of the queue.
        assert_eq!(session.motion_state(), MotionState::Stationary);
        assert_eq!(*states.borrow_and_update(), MotionState::Stationary);

        let mut queued = Vec::new();
        while let Some(transition) = session.try_next_transition() {
            queued.push(transition);
        }
        assert_eq!(queued.len(), TRANSITION_BUFFER);
        assert_eq!(queued[0].state, MotionState::Moving);
        assert_eq!(queued[1].state, MotionState::Stationary);

        // Draining frees the queue for new edges.
        session.push(SensorSample::Azimuth(90.0)).unwrap();
        let moving = session.next_transition().await.unwrap();
        assert_eq!(moving.state, MotionState::Moving);
        states.changed().await.unwrap();
        assert_eq!(*states.borrow(), MotionState::Moving);

        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_task() {
        let session = SensingSession::spawn(direct_core());
        let mut attitudes = session.watch_attitude();
        drop(session);
        assert!(attitudes.changed().await.is_err());
    }
}
