//! Checkout decision engine.
//!
//! [`checkout`] runs an ordered series of checks and either commits the loan
//! or rejects it without touching anything:
//!
//! 1. patron eligibility ([`crate::eligibility::validate`]); patron failures
//!    win over book failures, even a missing book
//! 2. book missing ([`CheckoutCode::BookMissing`])
//! 3. reference-only ([`CheckoutCode::ReferenceOnly`])
//! 4. already held: renewal, new due date, no copy taken
//!    ([`CheckoutCode::Renewed`])
//! 5. no copy on the shelf ([`CheckoutCode::Unavailable`])
//! 6. limit would be exceeded ([`CheckoutCode::CheckoutLimitReached`])
//! 7. commit: record the loan and take one copy
//! 8. classify: overdue warning, near-limit warning, or plain success
//!
//! "Today" is always passed in; the engine never reads a clock.

use crate::eligibility;
use crate::types::{Book, CheckoutCode, Patron};
use chrono::{Days, NaiveDate};

/// Number of checkouts from the limit at which patrons are warned
pub const NEAR_LIMIT_MARGIN: usize = 2;

/// Due date for a loan starting `today` under `patron`'s loan period
#[must_use]
pub fn due_date_for(patron: &Patron, today: NaiveDate) -> NaiveDate {
    today
        .checked_add_days(Days::new(patron.loan_period_days()))
        .unwrap_or(NaiveDate::MAX)
}

/// Decides and, on success, commits a checkout of `book` by `patron`
///
/// Either reference may be absent (unknown identifiers). Rejections leave
/// both entities exactly as they were.
pub fn checkout(book: Option<&mut Book>, patron: Option<&mut Patron>, today: NaiveDate) -> CheckoutCode {
    let eligibility = eligibility::validate(patron.as_deref());
    if eligibility != CheckoutCode::Success {
        return eligibility;
    }
    let Some(patron) = patron else {
        return CheckoutCode::PatronMissing;
    };

    let Some(book) = book else {
        return CheckoutCode::BookMissing;
    };

    if book.is_reference_only() {
        return CheckoutCode::ReferenceOnly;
    }

    let due = due_date_for(patron, today);

    if patron.holds(book.isbn().as_str()) {
        patron.record_loan(book.isbn().clone(), due);
        return CheckoutCode::Renewed;
    }

    if !book.is_available() {
        return CheckoutCode::Unavailable;
    }

    let max = patron.max_checkouts();
    let prospective = patron.checkout_count() + 1;
    if prospective > max {
        return CheckoutCode::CheckoutLimitReached;
    }

    if !book.lend_copy() {
        return CheckoutCode::Unavailable;
    }
    patron.record_loan(book.isbn().clone(), due);

    classify(patron.overdue_count(), max, prospective)
}

/// Success code for a committed (non-renewal) checkout
fn classify(overdue_count: u32, max: usize, prospective: usize) -> CheckoutCode {
    if matches!(overdue_count, 1 | 2) {
        CheckoutCode::OverdueWarning
    } else if max.saturating_sub(prospective) <= NEAR_LIMIT_MARGIN {
        CheckoutCode::NearLimitWarning
    } else {
        CheckoutCode::Success
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{BookCategory, Isbn, Money, PatronCategory};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn book(isbn: &str, copies: u32) -> Book {
        Book::new(isbn, "Title", "Author", BookCategory::Fiction, copies)
    }

    fn patron(category: PatronCategory) -> Patron {
        Patron::new("P-1", "Name", "name@example.com", category, today())
    }

    fn holding(category: PatronCategory, count: usize) -> Patron {
        let mut p = patron(category);
        for n in 0..count {
            p.record_loan(Isbn::new(format!("held-{n}")), today());
        }
        p
    }

    #[test]
    fn absent_patron_dominates_absent_book() {
        assert_eq!(checkout(None, None, today()), CheckoutCode::PatronMissing);
    }

    #[test]
    fn suspended_patron_dominates_absent_book() {
        let mut p = patron(PatronCategory::Student);
        p.set_suspended(true);
        assert_eq!(checkout(None, Some(&mut p), today()), CheckoutCode::PatronSuspended);
    }

    #[test]
    fn absent_book() {
        let mut p = patron(PatronCategory::Student);
        assert_eq!(checkout(None, Some(&mut p), today()), CheckoutCode::BookMissing);
        assert_eq!(p.checkout_count(), 0);
    }

    #[test]
    fn plain_success_sets_due_date_and_takes_a_copy() {
        let mut b = book("0123456789", 3);
        let mut p = patron(PatronCategory::Faculty);

        let code = checkout(Some(&mut b), Some(&mut p), today());

        assert_eq!(code, CheckoutCode::Success);
        assert_eq!(b.available_copies(), 2);
        assert_eq!(p.due_date("0123456789"), NaiveDate::from_ymd_opt(2025, 3, 2));
    }

    #[test]
    fn reference_book_is_refused_even_with_copies() {
        let mut b = Book::new("0123456789", "Atlas", "Maps", BookCategory::Reference, 5);
        let mut p = patron(PatronCategory::Faculty);

        assert_eq!(checkout(Some(&mut b), Some(&mut p), today()), CheckoutCode::ReferenceOnly);
        assert_eq!(b.available_copies(), 0);
        assert_eq!(p.checkout_count(), 0);
    }

    #[test]
    fn renewal_skips_availability_and_limit() {
        let mut b = book("0123456789", 1);
        let mut p = holding(PatronCategory::Child, 2);
        assert_eq!(
            checkout(Some(&mut b), Some(&mut p), today()),
            CheckoutCode::NearLimitWarning
        );
        assert_eq!(b.available_copies(), 0);
        assert_eq!(p.checkout_count(), 3);

        let later = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let code = checkout(Some(&mut b), Some(&mut p), later);

        assert_eq!(code, CheckoutCode::Renewed);
        assert_eq!(b.available_copies(), 0);
        assert_eq!(p.checkout_count(), 3);
        assert_eq!(p.due_date("0123456789"), NaiveDate::from_ymd_opt(2025, 1, 24));
    }

    #[test]
    fn no_copies_left() {
        let mut b = book("0123456789", 1);
        b.set_available_copies(0);
        let mut p = patron(PatronCategory::Student);

        assert_eq!(checkout(Some(&mut b), Some(&mut p), today()), CheckoutCode::Unavailable);
        assert_eq!(p.checkout_count(), 0);
    }

    #[test]
    fn limit_reached_changes_nothing() {
        let mut b = book("0123456789", 4);
        let mut p = holding(PatronCategory::Student, 10);
        let before = p.clone();

        assert_eq!(
            checkout(Some(&mut b), Some(&mut p), today()),
            CheckoutCode::CheckoutLimitReached
        );
        assert_eq!(p, before);
        assert_eq!(b.available_copies(), 4);
    }

    #[test]
    fn near_limit_boundary_includes_landing_on_limit() {
        let mut b = book("0123456789", 4);
        let mut p = holding(PatronCategory::Student, 9);
        assert_eq!(
            checkout(Some(&mut b), Some(&mut p), today()),
            CheckoutCode::NearLimitWarning
        );

        let mut b = book("0123456789", 4);
        let mut p = holding(PatronCategory::Student, 6);
        assert_eq!(checkout(Some(&mut b), Some(&mut p), today()), CheckoutCode::Success);

        let mut b = book("0123456789", 4);
        let mut p = holding(PatronCategory::Student, 7);
        assert_eq!(
            checkout(Some(&mut b), Some(&mut p), today()),
            CheckoutCode::NearLimitWarning
        );
    }

    #[test]
    fn overdue_warning_wins_over_near_limit() {
        let mut b = book("0123456789", 4);
        let mut p = holding(PatronCategory::Child, 2);
        p.set_overdue_count(2);
        assert_eq!(
            checkout(Some(&mut b), Some(&mut p), today()),
            CheckoutCode::OverdueWarning
        );
        assert_eq!(p.checkout_count(), 3);
    }

    #[test]
    fn ineligible_patron_changes_nothing() {
        let mut b = book("0123456789", 2);
        let mut p = patron(PatronCategory::Student);
        p.add_fine(Money::from_cents(1_250));

        assert_eq!(checkout(Some(&mut b), Some(&mut p), today()), CheckoutCode::UnpaidFines);
        assert_eq!(b.available_copies(), 2);
        assert_eq!(p.checkout_count(), 0);
    }

    #[test]
    fn due_date_saturates_at_calendar_end() {
        let p = patron(PatronCategory::Faculty);
        assert_eq!(due_date_for(&p, NaiveDate::MAX), NaiveDate::MAX);
    }
}
