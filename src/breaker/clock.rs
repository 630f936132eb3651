//! Time source abstraction
//!
//! The breaker, the unstable service and the consumer all read time (and
//! sleep) through [`Clock`], so a [`ManualClock`] can drive a whole scenario
//! deterministically without real waiting.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Monotonic time source
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;

    /// Block the caller for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant::now`] and [`std::thread::sleep`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when told to
///
/// `sleep` advances the clock instead of blocking, so a loop that sleeps
/// between calls runs instantly while still observing elapsed time.
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed += duration;
    }

    /// Time advanced since the clock was created
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_is_frozen() {
        let clock = ManualClock::new();
        let first = clock.now();
        let second = clock.now();
        assert_eq!(first, second);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advance_and_sleep() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.advance(Duration::from_secs(2));
        clock.sleep(Duration::from_millis(500));

        assert_eq!(clock.now() - start, Duration::from_millis(2500));
        assert_eq!(clock.elapsed(), Duration::from_millis(2500));
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let start = clock.now();
        clock.sleep(Duration::from_millis(5));
        assert!(clock.now() >= start + Duration::from_millis(5));
    }
}
