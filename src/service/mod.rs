//! Service capability shared by dependencies and the decorators wrapping them
//!
//! Every component in this crate answers the same question: "give me a
//! result, or fail". An upstream dependency implements [`Service`], and so
//! does [`CircuitBreaker`](crate::breaker::CircuitBreaker), which is what
//! lets a breaker wrap another breaker transparently.
//!
//! `query` takes `&self` so a service can be shared behind `&S` or `Arc<S>`;
//! implementations keep their mutable state behind interior mutability.

pub mod unstable;

pub use unstable::{UnstableConfig, UnstableError, UnstableService};

use std::sync::Arc;

/// A synchronous operation that either produces a value or fails
pub trait Service {
    /// Value produced on success
    type Response;

    /// Error produced on failure
    type Error;

    /// Perform one call
    fn query(&self) -> Result<Self::Response, Self::Error>;
}

impl<S: Service + ?Sized> Service for &S {
    type Response = S::Response;
    type Error = S::Error;

    fn query(&self) -> Result<Self::Response, Self::Error> {
        (**self).query()
    }
}

impl<S: Service + ?Sized> Service for Box<S> {
    type Response = S::Response;
    type Error = S::Error;

    fn query(&self) -> Result<Self::Response, Self::Error> {
        (**self).query()
    }
}

impl<S: Service + ?Sized> Service for Arc<S> {
    type Response = S::Response;
    type Error = S::Error;

    fn query(&self) -> Result<Self::Response, Self::Error> {
        (**self).query()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counter {
        calls: AtomicU32,
    }

    impl Service for Counter {
        type Response = u32;
        type Error = ();

        fn query(&self) -> Result<u32, ()> {
            Ok(self.calls.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    fn call_twice<S: Service>(service: S) -> Result<S::Response, S::Error> {
        service.query()?;
        service.query()
    }

    #[test]
    fn test_shared_through_arc() {
        let counter = Arc::new(Counter {
            calls: AtomicU32::new(0),
        });

        assert_eq!(call_twice(Arc::clone(&counter)), Ok(2));
        assert_eq!(call_twice(Arc::clone(&counter)), Ok(4));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_borrowed_and_boxed() {
        let counter = Counter {
            calls: AtomicU32::new(0),
        };
        assert_eq!(call_twice(&counter), Ok(2));

        let boxed: Box<dyn Service<Response = u32, Error = ()>> = Box::new(counter);
        assert_eq!(boxed.query(), Ok(3));
    }
}
