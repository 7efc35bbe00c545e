//! Time utilities with a clock abstraction for testability.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Current Unix timestamp in milliseconds
    fn now_millis(&self) -> i64;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Fixed clock implementation for testing (returns a programmed time)
#[derive(Debug)]
pub struct FixedClock {
    fixed_time: AtomicI64,
}

impl FixedClock {
    /// Create a new fixed clock with the given timestamp
    pub fn new(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: AtomicI64::new(fixed_time_millis),
        }
    }

    /// Reprogram the returned timestamp, letting tests advance time
    pub fn set(&self, fixed_time_millis: i64) {
        self.fixed_time.store(fixed_time_millis, Ordering::Relaxed);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.fixed_time.load(Ordering::Relaxed)
    }
}
