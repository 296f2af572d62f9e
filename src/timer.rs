//! Single-shot, re-armable deadline.
//!
//! The motion timeout needs "call me back in N ms, and forget the previous
//! request". The host owns the actual scheduling primitive (a platform
//! handler, a tokio sleep, a UI timer); this type owns the bookkeeping so
//! that exactly one request is live at any time.
//!
//! Each arming bumps a generation counter. A callback carrying an older
//! [`TimerHandle`] is stale and is ignored.

/// Identifies one arming of a [`DeadlineTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Raw generation number, for passing across the C boundary.
    pub fn id(&self) -> u64 {
        self.0
    }

    pub fn from_id(id: u64) -> Self {
        TimerHandle(id)
    }
}

/// Request for the host to invoke the timeout callback once at `deadline_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRequest {
    pub handle: TimerHandle,
    pub deadline_ms: u64,
}

/// A single addressable one-shot timer.
#[derive(Debug, Default)]
pub struct DeadlineTimer {
    generation: u64,
    armed: Option<TimerRequest>,
}

impl DeadlineTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer, cancelling any previous arming.
    pub fn arm(&mut self, now_ms: u64, delay_ms: u64) -> TimerRequest {
        self.generation = self.generation.wrapping_add(1);
        let request = TimerRequest {
            handle: TimerHandle(self.generation),
            deadline_ms: now_ms.saturating_add(delay_ms),
        };
        self.armed = Some(request);
        request
    }

    /// Cancel the pending arming, if any.
    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Deadline of the live arming.
    pub fn deadline(&self) -> Option<u64> {
        self.armed.map(|r| r.deadline_ms)
    }

    pub fn pending(&self) -> Option<TimerRequest> {
        self.armed
    }

    /// Consume a callback.
    ///
    /// Returns true only for the live handle once its deadline has passed;
    /// the timer is then disarmed. Stale or early callbacks return false
    /// and leave the timer untouched.
    pub fn fire(&mut self, handle: TimerHandle, now_ms: u64) -> bool {
        match self.armed {
            Some(request) if request.handle == handle && now_ms >= request.deadline_ms => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_and_fire() {
        let mut timer = DeadlineTimer::new();
        let request = timer.arm(100, 1000);
        assert_eq!(request.deadline_ms, 1100);
        assert!(timer.is_armed());

        assert!(!timer.fire(request.handle, 1099), "early callback must not fire");
        assert!(timer.is_armed());
        assert!(timer.fire(request.handle, 1100));
        assert!(!timer.is_armed());
        // Already consumed.
        assert!(!timer.fire(request.handle, 2000));
    }

    #[test]
    fn test_rearm_invalidates_previous_handle() {
        let mut timer = DeadlineTimer::new();
        let first = timer.arm(0, 1000);
        let second = timer.arm(500, 1000);
        assert_ne!(first.handle, second.handle);
        assert_eq!(timer.deadline(), Some(1500));

        assert!(!timer.fire(first.handle, 1000));
        assert!(timer.fire(second.handle, 1500));
    }

    #[test]
    fn test_cancel() {
        let mut timer = DeadlineTimer::new();
        let request = timer.arm(0, 10);
        timer.cancel();
        assert!(!timer.fire(request.handle, 10));
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn test_deadline_saturates() {
        let mut timer = DeadlineTimer::new();
        let request = timer.arm(u64::MAX - 5, 1000);
        assert_eq!(request.deadline_ms, u64::MAX);
    }

    #[test]
    fn test_handle_id_roundtrip() {
        let mut timer = DeadlineTimer::new();
        let request = timer.arm(0, 1);
        let handle = TimerHandle::from_id(request.handle.id());
        assert!(timer.fire(handle, 1));
    }
}
