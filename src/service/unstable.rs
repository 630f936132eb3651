//! Erratic upstream service used to exercise the circuit breaker
//!
//! The service answers `stop_after` calls, breaks on the next one and keeps
//! failing for `stop_during`. The first call strictly after that window
//! restores it and the cycle starts over.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

use super::Service;
use crate::breaker::{Clock, SystemClock};

/// Unstable service error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnstableError {
    #[error("500 Internal Server Error (from UnstableService, just broken)")]
    JustBroken,

    #[error("500 Internal Server Error (from UnstableService, still broken)")]
    StillBroken,
}

/// Configuration for the unstable service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnstableConfig {
    /// Number of calls answered before breaking
    pub stop_after: u32,

    /// How long the service stays broken
    pub stop_during: Duration,
}

impl Default for UnstableConfig {
    fn default() -> Self {
        Self {
            stop_after: 4,
            stop_during: Duration::from_secs(12),
        }
    }
}

#[derive(Debug, Default)]
struct UnstableState {
    calls: u32,
    broken_until: Option<Instant>,
}

/// Service that replies for a while, then breaks for a while
pub struct UnstableService {
    config: UnstableConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<UnstableState>,
}

impl UnstableService {
    pub fn new(config: UnstableConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            state: Mutex::new(UnstableState::default()),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &UnstableConfig {
        &self.config
    }
}

impl Service for UnstableService {
    type Response = String;
    type Error = UnstableError;

    fn query(&self) -> Result<String, UnstableError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();

        if state.calls > self.config.stop_after {
            match state.broken_until {
                Some(until) if now <= until => {
                    debug!(source = "unstable service", "still broken");
                    return Err(UnstableError::StillBroken);
                }
                _ => {
                    state.calls = 0;
                    debug!(source = "unstable service", "service restored");
                }
            }
        }

        state.calls = state.calls.saturating_add(1);

        if state.calls > self.config.stop_after {
            state.broken_until = Some(now + self.config.stop_during);
            debug!(
                source = "unstable service",
                broken_for_ms = self.config.stop_during.as_millis() as u64,
                "too many calls"
            );
            return Err(UnstableError::JustBroken);
        }

        Ok(format!("Pong! (nb of call without an error: {})", state.calls))
    }
}

impl fmt::Debug for UnstableService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnstableService")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::ManualClock;

    fn service(stop_after: u32, stop_during: Duration) -> (UnstableService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let service = UnstableService::new(UnstableConfig {
            stop_after,
            stop_during,
        })
        .with_clock(clock.clone());
        (service, clock)
    }

    #[test]
    fn test_answers_until_stop_after() {
        let (service, _clock) = service(3, Duration::from_secs(10));

        assert_eq!(service.query().unwrap(), "Pong! (nb of call without an error: 1)");
        assert_eq!(service.query().unwrap(), "Pong! (nb of call without an error: 2)");
        assert_eq!(service.query().unwrap(), "Pong! (nb of call without an error: 3)");
        assert_eq!(service.query(), Err(UnstableError::JustBroken));
        assert_eq!(service.query(), Err(UnstableError::StillBroken));
    }

    #[test]
    fn test_restores_strictly_after_window() {
        let (service, clock) = service(1, Duration::from_secs(10));
        service.query().unwrap();
        assert_eq!(service.query(), Err(UnstableError::JustBroken));

        clock.advance(Duration::from_secs(10));
        assert_eq!(service.query(), Err(UnstableError::StillBroken));

        clock.advance(Duration::from_millis(1));
        assert_eq!(service.query().unwrap(), "Pong! (nb of call without an error: 1)");

        // The cycle starts over.
        assert_eq!(service.query(), Err(UnstableError::JustBroken));
    }

    #[test]
    fn test_zero_stop_after_breaks_immediately() {
        let (service, _clock) = service(0, Duration::from_secs(1));
        assert_eq!(service.query(), Err(UnstableError::JustBroken));
    }

    #[test]
    fn test_call_count_saturates() {
        let (service, _clock) = service(u32::MAX, Duration::from_secs(1));
        service.state.lock().unwrap().calls = u32::MAX;

        assert_eq!(
            service.query().unwrap(),
            "Pong! (nb of call without an error: 4294967295)"
        );
    }
}
