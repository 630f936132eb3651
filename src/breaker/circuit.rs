//! Circuit breaker implementation for fault tolerance
//!
//! The breaker wraps a [`Service`] and is itself a [`Service`]. Its state is
//! never stored as a tag; it is derived on every call from two values, the
//! number of consecutive errors and the instant of the last forwarded call:
//! - Closed: fewer consecutive errors than the threshold, calls are forwarded
//! - Open: threshold reached and the cooldown has not elapsed since the last
//!   attempt, calls are rejected without touching the service
//! - Probe: threshold reached and the cooldown has elapsed, the next call is
//!   forwarded to test recovery
//!
//! A successful call resets the error count. A failed probe counts like any
//! other failure and re-arms the cooldown from its own timestamp.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::clock::{Clock, SystemClock};
use super::error::{BreakerError, ConfigError};
use super::events::{BreakerEvent, BreakerListener, TracingListener};
use crate::service::Service;

const DEFAULT_NAME: &str = "circuit-breaker";

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub error_threshold: u32,

    /// How long to stay open after the last attempt before probing
    pub cooldown: Duration,
}

impl CircuitBreakerConfig {
    /// Check the configuration invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.error_threshold == 0 {
            return Err(ConfigError::InvalidThreshold(self.error_threshold));
        }
        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            error_threshold: 3,
            cooldown: Duration::from_secs(5),
        }
    }
}

/// Circuit breaker states, derived from the counters at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - requests are forwarded
    Closed,

    /// Service has failed - requests are rejected
    Open {
        /// Time left before a probe is allowed
        retry_in: Duration,
    },

    /// Cooldown elapsed - the next request tests recovery
    Probe,
}

impl CircuitState {
    /// Check if the circuit forwards requests
    pub fn is_request_allowed(&self) -> bool {
        !matches!(self, CircuitState::Open { .. })
    }

    /// Get a human-readable state name
    pub fn name(&self) -> &str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open { .. } => "Open",
            CircuitState::Probe => "Probe",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Circuit breaker statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitStats {
    /// Current state
    pub state: CircuitState,

    /// Current consecutive error count
    pub consecutive_errors: u32,

    /// Calls made to the breaker, forwarded or not
    pub total_calls: u64,

    /// Calls forwarded to the service
    pub forwarded: u64,

    /// Forwarded calls that succeeded
    pub successes: u64,

    /// Forwarded calls that failed
    pub failures: u64,

    /// Calls rejected while open
    pub rejections: u64,

    /// Number of times the circuit has opened
    pub open_count: u64,

    /// Instant the last forwarded call returned
    pub last_attempt_at: Option<Instant>,
}

/// Mutable breaker state, always accessed under one lock
#[derive(Debug, Default)]
struct CircuitInner {
    consecutive_errors: u32,
    last_attempt_at: Option<Instant>,
    total_calls: u64,
    forwarded: u64,
    successes: u64,
    failures: u64,
    rejections: u64,
    open_count: u64,
}

impl CircuitInner {
    fn state_at(&self, now: Instant, config: &CircuitBreakerConfig) -> CircuitState {
        if self.consecutive_errors < config.error_threshold {
            return CircuitState::Closed;
        }

        match self.last_attempt_at {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                if elapsed < config.cooldown {
                    CircuitState::Open {
                        retry_in: config.cooldown - elapsed,
                    }
                } else {
                    CircuitState::Probe
                }
            }
            // Only reachable through a threshold reached with no recorded
            // attempt, which the breaker never produces on its own.
            None => CircuitState::Probe,
        }
    }
}

/// Circuit breaker wrapping a single service
///
/// The lock is held across state evaluation, the forwarded call and the
/// transition, so concurrent callers can never both pass a probe. A hanging
/// service therefore blocks every caller of this breaker.
pub struct CircuitBreaker<S> {
    name: String,
    config: CircuitBreakerConfig,
    service: S,
    clock: Arc<dyn Clock>,
    listener: Arc<dyn BreakerListener>,
    inner: Mutex<CircuitInner>,
}

impl<S> CircuitBreaker<S> {
    /// Create a new circuit breaker around `service`
    pub fn new(config: CircuitBreakerConfig, service: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            name: DEFAULT_NAME.to_string(),
            config,
            service,
            clock: Arc::new(SystemClock),
            listener: Arc::new(TracingListener),
            inner: Mutex::new(CircuitInner::default()),
        })
    }

    /// Name used in log records and passed to the listener
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the event listener
    pub fn with_listener(mut self, listener: Arc<dyn BreakerListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// The wrapped service
    pub fn inner(&self) -> &S {
        &self.service
    }

    /// Current derived state
    pub fn state(&self) -> CircuitState {
        let now = self.clock.now();
        self.lock().state_at(now, &self.config)
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.lock().consecutive_errors
    }

    /// Get a snapshot of the breaker statistics
    pub fn stats(&self) -> CircuitStats {
        let now = self.clock.now();
        let inner = self.lock();
        CircuitStats {
            state: inner.state_at(now, &self.config),
            consecutive_errors: inner.consecutive_errors,
            total_calls: inner.total_calls,
            forwarded: inner.forwarded,
            successes: inner.successes,
            failures: inner.failures,
            rejections: inner.rejections,
            open_count: inner.open_count,
            last_attempt_at: inner.last_attempt_at,
        }
    }

    /// Manually reset the circuit to Closed
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.consecutive_errors = 0;
        inner.last_attempt_at = None;
        drop(inner);
        self.emit(BreakerEvent::Reset);
    }

    // Counters are updated only after the forwarded call returns, so a
    // panic in the service leaves them consistent and the lock is reusable.
    fn lock(&self) -> MutexGuard<'_, CircuitInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: BreakerEvent) {
        self.listener.on_event(&self.name, &event);
    }
}

impl<S: Service> CircuitBreaker<S> {
    /// Forward one call to the service unless the circuit is open
    pub fn call(&self) -> Result<S::Response, BreakerError<S::Error>> {
        let mut events = Vec::with_capacity(2);
        let result = self.call_locked(&mut events);

        // Listeners run unlocked so they can read this breaker.
        for event in events {
            self.emit(event);
        }
        result
    }

    fn call_locked(
        &self,
        events: &mut Vec<BreakerEvent>,
    ) -> Result<S::Response, BreakerError<S::Error>> {
        let mut inner = self.lock();

        let state = inner.state_at(self.clock.now(), &self.config);
        match state {
            CircuitState::Open { retry_in } => {
                inner.total_calls += 1;
                inner.rejections += 1;
                events.push(BreakerEvent::Rejected { retry_in });
                return Err(BreakerError::Open { retry_in });
            }
            CircuitState::Probe => {
                events.push(BreakerEvent::ProbeAllowed {
                    consecutive_errors: inner.consecutive_errors,
                });
            }
            CircuitState::Closed => {}
        }

        let result = self.service.query();
        inner.last_attempt_at = Some(self.clock.now());
        inner.total_calls += 1;
        inner.forwarded += 1;

        match result {
            Ok(response) => {
                inner.successes += 1;
                inner.consecutive_errors = 0;
                if state == CircuitState::Probe {
                    events.push(BreakerEvent::Recovered);
                } else {
                    events.push(BreakerEvent::Succeeded);
                }
                Ok(response)
            }
            Err(err) => {
                inner.failures += 1;
                inner.consecutive_errors = inner.consecutive_errors.saturating_add(1);
                let consecutive_errors = inner.consecutive_errors;

                if consecutive_errors >= self.config.error_threshold {
                    inner.open_count += 1;
                    events.push(BreakerEvent::Opened {
                        consecutive_errors,
                        cooldown: self.config.cooldown,
                    });
                } else {
                    events.push(BreakerEvent::Failed { consecutive_errors });
                }
                Err(BreakerError::Upstream(err))
            }
        }
    }
}

impl<S: Service> Service for CircuitBreaker<S> {
    type Response = S::Response;
    type Error = BreakerError<S::Error>;

    fn query(&self) -> Result<Self::Response, Self::Error> {
        self.call()
    }
}

impl<S> fmt::Debug for CircuitBreaker<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("consecutive_errors", &inner.consecutive_errors)
            .field("last_attempt_at", &inner.last_attempt_at)
            .finish()
    }
}
