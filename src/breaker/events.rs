//! Breaker decision events and their observers
//!
//! The breaker does not log directly. At each decision point it emits a
//! [`BreakerEvent`] to its [`BreakerListener`]; the default
//! [`TracingListener`] turns those into structured `tracing` records.

use std::time::Duration;
use tracing::{debug, info, warn};

/// A decision taken by a circuit breaker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakerEvent {
    /// Call forwarded while closed succeeded
    Succeeded,

    /// Forwarded call failed without opening the circuit
    Failed { consecutive_errors: u32 },

    /// Failure count reached the threshold (or a probe failed)
    Opened {
        consecutive_errors: u32,
        cooldown: Duration,
    },

    /// Call rejected because the circuit is open
    Rejected { retry_in: Duration },

    /// Cooldown elapsed, one call is let through
    ProbeAllowed { consecutive_errors: u32 },

    /// Probe succeeded, circuit closed again
    Recovered,

    /// Circuit manually reset
    Reset,
}

/// Observer of breaker decisions
pub trait BreakerListener: Send + Sync {
    /// Called synchronously on the calling thread, after the breaker has
    /// released its lock
    fn on_event(&self, breaker: &str, event: &BreakerEvent);
}

impl<F> BreakerListener for F
where
    F: Fn(&str, &BreakerEvent) + Send + Sync,
{
    fn on_event(&self, breaker: &str, event: &BreakerEvent) {
        self(breaker, event)
    }
}

/// Default listener, logs every event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl BreakerListener for TracingListener {
    fn on_event(&self, breaker: &str, event: &BreakerEvent) {
        match event {
            BreakerEvent::Succeeded => {
                debug!(breaker = %breaker, "Request succeeded in Closed state");
            }
            BreakerEvent::Failed { consecutive_errors } => {
                debug!(
                    breaker = %breaker,
                    consecutive_errors = consecutive_errors,
                    "Request failed in Closed state"
                );
            }
            BreakerEvent::Opened {
                consecutive_errors,
                cooldown,
            } => {
                warn!(
                    breaker = %breaker,
                    consecutive_errors = consecutive_errors,
                    cooldown_ms = cooldown.as_millis() as u64,
                    "Too many errors, circuit open"
                );
            }
            BreakerEvent::Rejected { retry_in } => {
                debug!(
                    breaker = %breaker,
                    retry_in_ms = retry_in.as_millis() as u64,
                    "Circuit open, call rejected"
                );
            }
            BreakerEvent::ProbeAllowed { consecutive_errors } => {
                info!(
                    breaker = %breaker,
                    consecutive_errors = consecutive_errors,
                    "Cooldown elapsed, probing service"
                );
            }
            BreakerEvent::Recovered => {
                info!(breaker = %breaker, "Probe succeeded, circuit closed");
            }
            BreakerEvent::Reset => {
                info!(breaker = %breaker, "Manually resetting circuit to Closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_listener() {
        let seen = Mutex::new(Vec::new());
        let listener = |name: &str, event: &BreakerEvent| {
            seen.lock().unwrap().push((name.to_string(), event.clone()));
        };

        listener.on_event("db", &BreakerEvent::Recovered);
        listener.on_event(
            "db",
            &BreakerEvent::Rejected {
                retry_in: Duration::from_secs(1),
            },
        );

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("db".to_string(), BreakerEvent::Recovered));
    }

    #[test]
    fn test_tracing_listener_handles_every_event() {
        let events = [
            BreakerEvent::Succeeded,
            BreakerEvent::Failed { consecutive_errors: 1 },
            BreakerEvent::Opened {
                consecutive_errors: 3,
                cooldown: Duration::from_secs(5),
            },
            BreakerEvent::Rejected {
                retry_in: Duration::from_secs(2),
            },
            BreakerEvent::ProbeAllowed { consecutive_errors: 3 },
            BreakerEvent::Recovered,
            BreakerEvent::Reset,
        ];
        for event in &events {
            TracingListener.on_event("test", event);
        }
    }
}
