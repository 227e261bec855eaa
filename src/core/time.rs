//! Clocks measuring how long resolved addresses stay valid.
//!
//! `ArpTable` stamps each mapping with the clock's reading when it is stored
//! and forgets it once the configured expiration has elapsed. Engines use the
//! system clock, while tests drive a `MockClock` by hand so expiry happens
//! exactly when they say.

use std::fmt::Debug;
use std::time::{
    Duration,
    Instant,
};

/// A monotonic source of time for expiring cached state.
pub trait Clock: Clone + Debug {
    fn now(&self) -> Instant;
}

/// Reads the monotonic system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that stands still until advanced.
#[derive(Clone, Debug)]
pub struct MockClock {
    now: Instant,
}

impl Default for MockClock {
    fn default() -> Self {
        MockClock::new()
    }
}

impl MockClock {
    /// Creates a clock frozen at the current system time.
    pub fn new() -> MockClock {
        MockClock {
            now: Instant::now(),
        }
    }

    pub fn advance(&mut self, duration: Duration) {
        self.now += duration;
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.now
    }
}
