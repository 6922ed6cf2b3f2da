//! # Circulation Testing
//!
//! Testing utilities for circulation reducers.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - The [`ReducerTest`] Given-When-Then harness
//! - proptest strategies for business dates and overdue day counts
//!
//! ## Example
//!
//! ```ignore
//! use circulation_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(LibraryReducer::new())
//!     .with_env(LibraryEnvironment::new(Arc::new(test_clock())))
//!     .given_state(state)
//!     .when_action(LibraryAction::checkout(isbn, patron_id))
//!     .then_state(|s| assert_eq!(s.history.len(), 1))
//!     .run();
//! ```

use chrono::{DateTime, Days, NaiveDate, Utc};
use circulation_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Days, NaiveDate, Utc};
    use std::sync::{Arc, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use circulation_testing::mocks::FixedClock;
    /// use circulation_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// Create a fixed clock pinned to midnight UTC of `date`
        #[must_use]
        pub fn on(date: NaiveDate) -> Self {
            Self::new(date.and_time(chrono::NaiveTime::MIN).and_utc())
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when a test tells it to
    ///
    /// Clones share the same underlying time, so a test can keep one handle
    /// and advance the date seen by an environment that owns another.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a manual clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock forward by whole days
        pub fn advance_days(&self, days: u64) {
            if let Ok(mut time) = self.time.write() {
                if let Some(next) = time.checked_add_days(Days::new(days)) {
                    *time = next;
                }
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
                .read()
                .map_or_else(|poisoned| *poisoned.into_inner(), |time| *time)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// A manual clock starting at the same instant as [`test_clock`]
    #[must_use]
    pub fn manual_test_clock() -> ManualClock {
        ManualClock::new(test_clock().now())
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use super::{Days, NaiveDate};
    use proptest::prelude::*;

    /// Business dates between 2000-01-01 and roughly 2060
    pub fn business_date() -> impl Strategy<Value = NaiveDate> {
        (0u64..22_000).prop_map(|offset| {
            NaiveDate::from_ymd_opt(2000, 1, 1)
                .and_then(|base| base.checked_add_days(Days::new(offset)))
                .unwrap_or(NaiveDate::MIN)
        })
    }

    /// Days overdue, including early and on-time returns (≤ 0)
    pub fn days_overdue() -> impl Strategy<Value = i64> {
        prop_oneof![
            -30i64..=0,
            1i64..=14,
            15i64..=400,
        ]
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, manual_test_clock, test_clock};
