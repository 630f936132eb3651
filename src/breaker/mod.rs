//! Circuit breaker module
//!
//! This module provides:
//! - A circuit breaker decorator for any [`Service`](crate::service::Service)
//! - A clock abstraction so cooldowns can be tested without sleeping
//! - Decision events and listeners for observing the breaker
//!
//! # Example Usage
//!
//! ```rust
//! use stability::breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use stability::service::{Service, UnstableConfig, UnstableService};
//! use std::time::Duration;
//!
//! let upstream = UnstableService::new(UnstableConfig::default());
//! let breaker = CircuitBreaker::new(
//!     CircuitBreakerConfig {
//!         error_threshold: 3,
//!         cooldown: Duration::from_secs(5),
//!     },
//!     upstream,
//! )?;
//!
//! match breaker.query() {
//!     Ok(reply) => println!("{}", reply),
//!     Err(err) if err.is_open() => println!("rejected: {}", err),
//!     Err(err) => println!("upstream failed: {}", err),
//! }
//! # Ok::<(), stability::breaker::ConfigError>(())
//! ```

pub mod circuit;
pub mod clock;
pub mod error;
pub mod events;

pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitState, CircuitStats};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BreakerError, ConfigError};
pub use events::{BreakerEvent, BreakerListener, TracingListener};
