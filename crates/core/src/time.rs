// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2025 Skiff Developers. All rights reserved.
//  https://github.com/skiff-mq/skiff
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Millisecond clocks used for liveness bookkeeping.
//!
//! - [`MonotonicClock`] is the real-time implementation. Readings are anchored to the
//!   UNIX epoch once at construction and then advanced by [`Instant`] deltas, so they are
//!   human-meaningful in logs but can never go backwards (wall-clock adjustments are ignored).
//! - [`TestClock`] is a static clock whose time is only changed explicitly, for deterministic
//!   expiry tests.

use std::{
    fmt::Debug,
    sync::atomic::{AtomicU64, Ordering},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

/// Represents a source of millisecond timestamps.
pub trait Clock: Debug + Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn timestamp_ms(&self) -> u64;
}

/// Returns the elapsed milliseconds from `earlier_ms` to `now_ms`, saturating at zero.
#[inline]
#[must_use]
pub const fn duration_since_ms(now_ms: u64, earlier_ms: u64) -> u64 {
    now_ms.saturating_sub(earlier_ms)
}

/// Returns the current milliseconds since the UNIX epoch from the system wall clock.
#[must_use]
pub fn unix_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// A real-time clock which never goes backwards.
#[derive(Debug)]
pub struct MonotonicClock {
    anchor_instant: Instant,
    anchor_unix_ms: u64,
}

impl MonotonicClock {
    /// Creates a new [`MonotonicClock`] instance anchored at the current wall-clock time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            anchor_instant: Instant::now(),
            anchor_unix_ms: unix_timestamp_ms(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn timestamp_ms(&self) -> u64 {
        let elapsed_ms = u64::try_from(self.anchor_instant.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.anchor_unix_ms.saturating_add(elapsed_ms)
    }
}

/// A static test clock.
///
/// Stores the current timestamp internally which can be set or advanced from any thread.
#[derive(Debug, Default)]
pub struct TestClock {
    time_ms: AtomicU64,
}

impl TestClock {
    /// Creates a new [`TestClock`] instance starting at `time_ms`.
    #[must_use]
    pub const fn new(time_ms: u64) -> Self {
        Self {
            time_ms: AtomicU64::new(time_ms),
        }
    }

    /// Sets the clock to `time_ms`.
    pub fn set_time_ms(&self, time_ms: u64) {
        self.time_ms.store(time_ms, Ordering::SeqCst);
    }

    /// Advances the clock by `delta_ms` and returns the new time.
    pub fn advance_ms(&self, delta_ms: u64) -> u64 {
        self.time_ms.fetch_add(delta_ms, Ordering::SeqCst) + delta_ms
    }
}

impl Clock for TestClock {
    fn timestamp_ms(&self) -> u64 {
        self.time_ms.load(Ordering::SeqCst)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_unix_timestamp_ms_is_plausible() {
        assert!(unix_timestamp_ms() >= 1_650_000_000_000);
    }

    #[rstest]
    fn test_monotonic_clock_is_monotonic_increasing() {
        let clock = MonotonicClock::new();
        let result1 = clock.timestamp_ms();
        let result2 = clock.timestamp_ms();
        let result3 = clock.timestamp_ms();

        assert!(result2 >= result1);
        assert!(result3 >= result2);
        assert!(result1 >= 1_650_000_000_000);
    }

    #[rstest]
    fn test_test_clock_set_and_advance() {
        let clock = TestClock::new(1_000);
        assert_eq!(clock.timestamp_ms(), 1_000);

        assert_eq!(clock.advance_ms(500), 1_500);
        assert_eq!(clock.timestamp_ms(), 1_500);

        clock.set_time_ms(42);
        assert_eq!(clock.timestamp_ms(), 42);
    }

    #[rstest]
    #[case(10, 5, 5)]
    #[case(5, 10, 0)] // <-- earlier reading is ahead, saturates
    #[case(0, 0, 0)]
    fn test_duration_since_ms(#[case] now: u64, #[case] earlier: u64, #[case] expected: u64) {
        assert_eq!(duration_since_ms(now, earlier), expected);
    }
}
