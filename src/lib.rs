//! stability - circuit breaker for failure-prone synchronous dependencies

pub mod breaker;
pub mod cli;
pub mod config;
pub mod consumer;
pub mod service;

pub use breaker::{BreakerError, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::Config;
pub use service::Service;
