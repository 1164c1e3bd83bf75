// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time abstraction so the job loop and refresh loop can be tested without
//! real sleeps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A source of the current time.
///
/// Production code uses [`SystemClock`]; tests use [`FakeClock`] to control
/// elapsed time deterministically (credential-expiry skew checks, refresh
/// interval clamping, heartbeat age in the status bar).
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant, used for timeouts and durations.
    fn now(&self) -> Instant;

    /// Wall-clock time, used for credential `expiresAt` comparisons.
    fn unix_now(&self) -> SystemTime;
}

/// Real-time clock backed by [`Instant::now`] and [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Deterministic clock for tests: starts at a fixed instant and advances
/// only when told to.
#[derive(Debug, Clone)]
pub struct FakeClock {
    base_instant: Instant,
    base_unix_secs: u64,
    offset_ms: Arc<AtomicU64>,
}

impl FakeClock {
    /// Create a fake clock anchored at "now", offset zero.
    pub fn new() -> Self {
        Self {
            base_instant: Instant::now(),
            base_unix_secs: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            offset_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Anchor the fake clock at a specific unix timestamp (seconds).
    pub fn at_unix_secs(unix_secs: u64) -> Self {
        Self {
            base_instant: Instant::now(),
            base_unix_secs: unix_secs,
            offset_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Advance the clock by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.offset_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base_instant + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }

    fn unix_now(&self) -> SystemTime {
        let offset = Duration::from_millis(self.offset_ms.load(Ordering::SeqCst));
        UNIX_EPOCH + Duration::from_secs(self.base_unix_secs) + offset
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
