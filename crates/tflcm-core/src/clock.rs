//! Time source used by the buffer for "now".
//!
//! The buffer asks its [`Clock`] for the current time when aging out dynamic
//! records, when deciding whether a query looks like log replay, and as the
//! fallback answer of the timestamp introspection calls.  Production code
//! uses [`SystemClock`]; tests and simulators drive a [`MockClock`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tflcm_types::Stamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Stamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Stamp {
        Stamp::now()
    }
}

/// A manually driven clock.  Clones share the same underlying time, so a
/// test can hand one clone to the buffer and keep another to advance it.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tflcm_core::clock::{Clock, MockClock};
/// use tflcm_types::Stamp;
///
/// let clock = MockClock::new(Stamp::new(100, 0));
/// let handle = clock.clone();
/// handle.advance(Duration::from_secs(5));
/// assert_eq!(clock.now(), Stamp::new(105, 0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now: Arc<Mutex<Stamp>>,
}

impl MockClock {
    pub fn new(start: Stamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, stamp: Stamp) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = stamp;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now.saturating_add(by);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Stamp {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_clock_clones_share_time() {
        let clock = MockClock::new(Stamp::new(10, 0));
        let other = clock.clone();
        other.set(Stamp::new(42, 7));
        assert_eq!(clock.now(), Stamp::new(42, 7));
    }

    #[test]
    fn mock_clock_advance_accumulates() {
        let clock = MockClock::new(Stamp::new(0, 0));
        clock.advance(Duration::from_millis(600));
        clock.advance(Duration::from_millis(600));
        assert_eq!(clock.now(), Stamp::new(1, 200_000_000));
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now() > Stamp::new(1_577_836_800, 0));
    }
}
