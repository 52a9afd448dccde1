//! Keep-alive scheduling.
//!
//! Time is a [`Duration`] since an arbitrary, monotonic epoch chosen by the
//! [`Clock`]. The scheduler only compares timestamps; whatever drives it (a
//! poll loop, a timer interrupt) lives outside.

use core::time::Duration;

/// A monotonic time source.
pub trait Clock {
    /// Time elapsed since the clock's epoch.
    fn now(&self) -> Duration;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// [`Clock`] backed by [`std::time::Instant`].
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    epoch: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// A clock whose epoch is now.
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Decides when a liveness ping is owed.
///
/// [`KeepAlive::due`] turns true once `interval` has passed since the last
/// recorded activity. An interval of zero disables keep-alive entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    interval: Duration,
    last_activity: Duration,
}

impl KeepAlive {
    /// A scheduler with the given interval whose window starts at `now`.
    pub fn new(interval: Duration, now: Duration) -> Self {
        Self {
            interval,
            last_activity: now,
        }
    }

    /// A scheduler for a keep-alive expressed in whole seconds.
    pub fn from_secs(seconds: u16, now: Duration) -> Self {
        Self::new(Duration::from_secs(seconds.into()), now)
    }

    /// Restart the window at `now`.
    pub fn record_activity(&mut self, now: Duration) {
        self.last_activity = now;
    }

    /// Whether a ping must be sent at `now`.
    pub fn due(&self, now: Duration) -> bool {
        !self.interval.is_zero() && now.saturating_sub(self.last_activity) >= self.interval
    }

    /// Time until [`KeepAlive::due`] turns true, `None` when disabled.
    pub fn remaining(&self, now: Duration) -> Option<Duration> {
        if self.interval.is_zero() {
            return None;
        }
        Some((self.last_activity + self.interval).saturating_sub(now))
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When activity was last recorded.
    pub fn last_activity(&self) -> Duration {
        self.last_activity
    }
}
