// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time.
///
/// Used anywhere the system needs "now" for a policy decision (crash-counter
/// windows, status-age reporting) so tests can control time deterministically.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn unix_seconds(&self) -> i64;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_seconds(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<Instant>>,
    unix_seconds: Arc<Mutex<i64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(Instant::now())),
            unix_seconds: Arc::new(Mutex::new(1_700_000_000)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
        *self.unix_seconds.lock() += duration.as_secs() as i64;
    }

    pub fn set_unix_seconds(&self, secs: i64) {
        *self.unix_seconds.lock() = secs;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }

    fn unix_seconds(&self) -> i64 {
        *self.unix_seconds.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
