//! Patron-level checkout preconditions.

use crate::types::{CheckoutCode, Money, Patron};

/// Overdue books at which borrowing is refused
pub const MAX_OVERDUE_BOOKS: u32 = 3;

/// Unpaid fines at which borrowing is refused ($10.00)
pub const FINE_THRESHOLD: Money = Money::from_cents(1_000);

/// Checks whether a patron may borrow at all, ignoring any particular book
///
/// First match wins:
///
/// 1. no patron: [`CheckoutCode::PatronMissing`]
/// 2. suspended: [`CheckoutCode::PatronSuspended`]
/// 3. three or more overdue books: [`CheckoutCode::TooManyOverdue`]
/// 4. $10.00 or more in fines: [`CheckoutCode::UnpaidFines`]
/// 5. otherwise [`CheckoutCode::Success`]
#[must_use]
pub fn validate(patron: Option<&Patron>) -> CheckoutCode {
    let Some(patron) = patron else {
        return CheckoutCode::PatronMissing;
    };

    if patron.is_suspended() {
        CheckoutCode::PatronSuspended
    } else if patron.overdue_count() >= MAX_OVERDUE_BOOKS {
        CheckoutCode::TooManyOverdue
    } else if patron.fine_balance() >= FINE_THRESHOLD {
        CheckoutCode::UnpaidFines
    } else {
        CheckoutCode::Success
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::PatronCategory;
    use chrono::NaiveDate;

    fn patron() -> Patron {
        Patron::new(
            "P-10001",
            "Alice Johnson",
            "alice@university.edu",
            PatronCategory::Student,
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
        )
    }

    #[test]
    fn missing_patron() {
        assert_eq!(validate(None), CheckoutCode::PatronMissing);
    }

    #[test]
    fn clean_patron_is_eligible() {
        assert_eq!(validate(Some(&patron())), CheckoutCode::Success);
    }

    #[test]
    fn suspension_beats_every_other_failure() {
        let mut p = patron();
        p.set_suspended(true);
        p.set_overdue_count(5);
        p.add_fine(Money::from_dollars(50));
        assert_eq!(validate(Some(&p)), CheckoutCode::PatronSuspended);
    }

    #[test]
    fn overdue_beats_fines() {
        let mut p = patron();
        p.set_overdue_count(3);
        p.add_fine(Money::from_dollars(50));
        assert_eq!(validate(Some(&p)), CheckoutCode::TooManyOverdue);
    }

    #[test]
    fn thresholds_are_inclusive() {
        let mut p = patron();
        p.set_overdue_count(2);
        p.add_fine(Money::from_cents(999));
        assert_eq!(validate(Some(&p)), CheckoutCode::Success);

        p.add_fine(Money::from_cents(1));
        assert_eq!(validate(Some(&p)), CheckoutCode::UnpaidFines);

        p.set_overdue_count(MAX_OVERDUE_BOOKS);
        assert_eq!(validate(Some(&p)), CheckoutCode::TooManyOverdue);
    }

    #[test]
    fn validation_does_not_mutate() {
        let mut p = patron();
        p.add_fine(Money::from_dollars(12));
        let before = p.clone();
        let _ = validate(Some(&p));
        assert_eq!(p, before);
    }
}
