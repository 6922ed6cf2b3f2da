//! Overdue fine calculation.
//!
//! Fines accrue per day in three tiers:
//!
//! | Days overdue | Rate |
//! |---|---|
//! | 1-7 | $0.25 |
//! | 8-14 | $0.50 |
//! | 15+ | $1.00 |
//!
//! Reference and textbook categories pay double the accrued total. The
//! result is capped ($25.00 by default) after doubling. Everything is
//! computed in whole cents, so the results are exact.

use crate::types::{BookCategory, Money};
use serde::{Deserialize, Serialize};

/// Daily rate for days 1-7
pub const FIRST_WEEK_RATE: Money = Money::from_cents(25);

/// Daily rate for days 8-14
pub const SECOND_WEEK_RATE: Money = Money::from_cents(50);

/// Daily rate from day 15 on
pub const LATE_RATE: Money = Money::from_cents(100);

/// Default ceiling on a single fine
pub const DEFAULT_MAX_FINE: Money = Money::from_cents(2_500);

const WEEK: u64 = 7;

/// Fine rules in force
///
/// The tier rates are fixed. Only the cap can be configured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FineSchedule {
    max_fine: Money,
}

impl FineSchedule {
    /// Creates a schedule with a custom cap
    #[must_use]
    pub const fn with_max_fine(max_fine: Money) -> Self {
        Self { max_fine }
    }

    /// The cap applied after doubling
    #[must_use]
    pub const fn max_fine(&self) -> Money {
        self.max_fine
    }

    /// Fine owed for returning a book of `category` `days_overdue` days late
    ///
    /// Zero when the book is on time or early. Non-decreasing in
    /// `days_overdue` and never above [`FineSchedule::max_fine`].
    #[must_use]
    pub fn fine(&self, days_overdue: i64, category: BookCategory) -> Money {
        let Ok(days) = u64::try_from(days_overdue) else {
            return Money::ZERO;
        };

        let mut cents = accrued(days).cents();
        if category.doubles_fines() {
            cents = cents.saturating_mul(2);
        }

        Money::from_cents(cents).min(self.max_fine)
    }
}

impl Default for FineSchedule {
    fn default() -> Self {
        Self::with_max_fine(DEFAULT_MAX_FINE)
    }
}

/// Tiered total for `days` days late, before doubling and capping
#[must_use]
pub fn accrued(days: u64) -> Money {
    let first = days.min(WEEK);
    let second = days.saturating_sub(WEEK).min(WEEK);
    let late = days.saturating_sub(2 * WEEK);

    let cents = first
        .saturating_mul(FIRST_WEEK_RATE.cents())
        .saturating_add(second.saturating_mul(SECOND_WEEK_RATE.cents()))
        .saturating_add(late.saturating_mul(LATE_RATE.cents()));

    Money::from_cents(cents)
}

/// [`FineSchedule::fine`] under the default schedule
#[must_use]
pub fn calculate_fine(days_overdue: i64, category: BookCategory) -> Money {
    FineSchedule::default().fine(days_overdue, category)
}
