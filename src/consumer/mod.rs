//! Consumer driving repeated calls against a service
//!
//! The consumer only sees the [`Service`] capability: it never inspects the
//! state of a breaker it may be talking to. Every outcome is logged and
//! counted, and the consumer waits `interval` after each call.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::breaker::{Clock, SystemClock};
use crate::service::Service;

/// Configuration for the consumer loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Number of calls to make before stopping
    pub call_count: u32,

    /// Pause after each call
    pub interval: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            call_count: 20,
            interval: Duration::from_secs(1),
        }
    }
}

/// Outcome counts of a consumer run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeReport {
    pub calls: u32,
    pub succeeded: u32,
    pub failed: u32,
}

pub struct Consumer {
    config: ConsumerConfig,
    clock: Arc<dyn Clock>,
}

impl Consumer {
    pub fn new(config: ConsumerConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source used between calls
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Call `service` `call_count` times, logging every outcome
    pub fn consume<S>(&self, service: &S) -> ConsumeReport
    where
        S: Service + ?Sized,
        S::Response: Display,
        S::Error: Display,
    {
        let mut report = ConsumeReport::default();

        for call in 1..=self.config.call_count {
            match service.query() {
                Ok(response) => {
                    report.succeeded += 1;
                    info!(call = call, "{}", response);
                }
                Err(err) => {
                    report.failed += 1;
                    error!(call = call, error = %err, "call failed");
                }
            }
            report.calls += 1;
            self.clock.sleep(self.config.interval);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::ManualClock;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Fails on odd calls, records the time of each call
    struct Alternating {
        clock: Arc<ManualClock>,
        seen: Mutex<Vec<Instant>>,
    }

    impl Service for Alternating {
        type Response = &'static str;
        type Error = &'static str;

        fn query(&self) -> Result<&'static str, &'static str> {
            let mut seen = self.seen.lock().unwrap();
            seen.push(self.clock.now());
            if seen.len() % 2 == 1 {
                Err("odd")
            } else {
                Ok("even")
            }
        }
    }

    #[test]
    fn test_consume_counts_outcomes_and_waits() {
        let clock = Arc::new(ManualClock::new());
        let start = clock.now();
        let service = Alternating {
            clock: clock.clone(),
            seen: Mutex::new(Vec::new()),
        };
        let consumer = Consumer::new(ConsumerConfig {
            call_count: 5,
            interval: Duration::from_millis(200),
        })
        .with_clock(clock.clone());

        let report = consumer.consume(&service);

        assert_eq!(
            report,
            ConsumeReport {
                calls: 5,
                succeeded: 2,
                failed: 3,
            }
        );

        let seen = service.seen.lock().unwrap();
        assert_eq!(seen[0], start);
        assert_eq!(seen[4] - start, Duration::from_millis(800));
        assert_eq!(clock.elapsed(), Duration::from_millis(1000));
    }

    #[test]
    fn test_zero_calls() {
        let clock = Arc::new(ManualClock::new());
        let service = Alternating {
            clock: clock.clone(),
            seen: Mutex::new(Vec::new()),
        };
        let consumer = Consumer::new(ConsumerConfig {
            call_count: 0,
            interval: Duration::from_secs(1),
        })
        .with_clock(clock.clone());

        assert_eq!(consumer.consume(&service), ConsumeReport::default());
        assert!(service.seen.lock().unwrap().is_empty());
    }
}
