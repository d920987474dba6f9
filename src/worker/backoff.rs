//! Exponential backoff expressed as a pure function of the attempt index.

use std::time::Duration;

/// Delay schedule `floor * 2^attempt`, clamped to `[floor, cap]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub floor: Duration,
    pub cap: Duration,
}

impl BackoffPolicy {
    /// Schedule applied while (re)opening a socket.
    pub const CONNECT: Self = Self::new(Duration::from_millis(250), Duration::from_millis(5000));
    /// Schedule applied after a failed send.
    pub const SEND: Self = Self::new(Duration::from_millis(50), Duration::from_millis(2000));

    pub const fn new(floor: Duration, cap: Duration) -> Self {
        Self { floor, cap }
    }

    /// Delay to wait before retry number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.floor.saturating_mul(factor).min(self.cap).max(self.floor)
    }
}

/// Tracks the attempt index for one [`BackoffPolicy`].
#[derive(Clone, Debug)]
pub struct BackoffState {
    policy: BackoffPolicy,
    attempt: u32,
}

impl BackoffState {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Delay the next retry would wait.
    pub fn current(&self) -> Duration {
        self.policy.delay_for(self.attempt)
    }

    /// Return the delay for this failure and advance the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current();
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Return to the floor after a success.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
