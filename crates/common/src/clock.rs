// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
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

//! Millisecond wall clocks.
//!
//! Scores in the negative-existence cache and sweep deadlines are UNIX milliseconds. Components
//! take a [`Clock`] so tests can drive time explicitly with [`TestClock`].

use std::{
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

pub const MILLISECONDS_IN_SECOND: u64 = 1_000;
pub const MILLISECONDS_IN_MINUTE: u64 = 60 * MILLISECONDS_IN_SECOND;
pub const MILLISECONDS_IN_DAY: u64 = 24 * 60 * MILLISECONDS_IN_MINUTE;

/// A source of UNIX time in milliseconds.
pub trait Clock: Debug + Send + Sync {
    /// Returns the current UNIX time in milliseconds.
    fn timestamp_ms(&self) -> u64;
}

/// Reads the system real-time clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveClock;

impl LiveClock {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for LiveClock {
    fn timestamp_ms(&self) -> u64 {
        // Pre-epoch system time would be a broken host, report zero rather than wrap
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// A manually driven clock, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct TestClock {
    time_ms: Arc<AtomicU64>,
}

impl TestClock {
    #[must_use]
    pub fn new(time_ms: u64) -> Self {
        Self {
            time_ms: Arc::new(AtomicU64::new(time_ms)),
        }
    }

    pub fn set_time(&self, time_ms: u64) {
        self.time_ms.store(time_ms, Ordering::Relaxed);
    }

    /// Moves the clock forward by `delta_ms` and returns the new time.
    pub fn advance(&self, delta_ms: u64) -> u64 {
        self.time_ms.fetch_add(delta_ms, Ordering::Relaxed) + delta_ms
    }
}

impl Clock for TestClock {
    fn timestamp_ms(&self) -> u64 {
        self.time_ms.load(Ordering::Relaxed)
    }
}

/// Converts whole seconds to milliseconds, saturating on overflow.
#[must_use]
pub const fn secs_to_millis(secs: u64) -> u64 {
    secs.saturating_mul(MILLISECONDS_IN_SECOND)
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_live_clock_is_after_2020() {
        let clock = LiveClock::new();
        assert!(clock.timestamp_ms() > 1_577_836_800_000);
    }

    #[rstest]
    fn test_test_clock_clones_share_time() {
        let clock = TestClock::new(1_000);
        let other = clock.clone();

        assert_eq!(clock.advance(500), 1_500);
        assert_eq!(other.timestamp_ms(), 1_500);

        other.set_time(10);
        assert_eq!(clock.timestamp_ms(), 10);
    }

    #[rstest]
    fn test_constants() {
        assert_eq!(MILLISECONDS_IN_DAY, 86_400_000);
        assert_eq!(secs_to_millis(3), 3_000);
        assert_eq!(secs_to_millis(u64::MAX), u64::MAX);
    }
}
