//! Circuit breaker error types

use std::time::Duration;

/// Error returned by [`CircuitBreaker::query`](super::CircuitBreaker)
///
/// A rejection is always distinguishable from a failure of the wrapped
/// service: callers can fail over immediately on `Open` and back off on
/// `Upstream`.
#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    /// The circuit is open and the call was not forwarded
    #[error("503 Service Unavailable: circuit breaker is open, retry in {retry_in:?}")]
    Open {
        /// Time left before the breaker lets a probe through
        retry_in: Duration,
    },

    /// The wrapped service was called and failed
    #[error(transparent)]
    Upstream(E),
}

impl<E> BreakerError<E> {
    /// Whether the call was short-circuited
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open { .. })
    }

    /// Borrow the wrapped service's error, if any
    pub fn upstream(&self) -> Option<&E> {
        match self {
            BreakerError::Upstream(err) => Some(err),
            BreakerError::Open { .. } => None,
        }
    }

    /// Take the wrapped service's error, if any
    pub fn into_upstream(self) -> Option<E> {
        match self {
            BreakerError::Upstream(err) => Some(err),
            BreakerError::Open { .. } => None,
        }
    }
}

/// Invalid circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("error threshold must be at least 1, got {0}")]
    InvalidThreshold(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_upstream_is_transparent() {
        let err: BreakerError<Boom> = BreakerError::Upstream(Boom);
        assert_eq!(err.to_string(), "boom");
        assert!(!err.is_open());
        assert!(err.upstream().is_some());
        assert!(err.into_upstream().is_some());
    }

    #[test]
    fn test_open_is_distinct() {
        let err: BreakerError<Boom> = BreakerError::Open {
            retry_in: Duration::from_secs(2),
        };
        assert!(err.is_open());
        assert!(err.upstream().is_none());
        assert!(err.to_string().contains("circuit breaker is open"));
        assert!(err.into_upstream().is_none());
    }

    #[test]
    fn test_config_error_message() {
        assert_eq!(
            ConfigError::InvalidThreshold(0).to_string(),
            "error threshold must be at least 1, got 0"
        );
    }
}
