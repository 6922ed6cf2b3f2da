//! Property tests for the fine calculator and the decision engine.

#![allow(clippy::unwrap_used)]

use circulation_testing::properties::{business_date, days_overdue};
use library_checkout::checkout::checkout;
use library_checkout::fines::DEFAULT_MAX_FINE;
use library_checkout::{
    Book, BookCategory, CheckoutCode, FineSchedule, Money, Patron, PatronCategory, calculate_fine,
};
use proptest::prelude::*;

fn book_category() -> impl Strategy<Value = BookCategory> {
    prop::sample::select(BookCategory::ALL.to_vec())
}

fn patron_category() -> impl Strategy<Value = PatronCategory> {
    prop::sample::select(PatronCategory::ALL.to_vec())
}

/// Patron state that may or may not be eligible
#[derive(Debug, Clone)]
struct PatronSetup {
    category: PatronCategory,
    held: usize,
    suspended: bool,
    overdue: u32,
    fine_cents: u64,
    holds_target: bool,
}

fn patron_setup() -> impl Strategy<Value = PatronSetup> {
    (
        patron_category(),
        0usize..=22,
        prop::bool::weighted(0.15),
        prop_oneof![4 => Just(0u32), 2 => 1u32..=2, 1 => 3u32..=6],
        prop_oneof![3 => 0u64..1_000, 1 => 1_000u64..3_000],
        prop::bool::weighted(0.25),
    )
        .prop_map(|(category, held, suspended, overdue, fine_cents, holds_target)| PatronSetup {
            category,
            held,
            suspended,
            overdue,
            fine_cents,
            holds_target,
        })
}

/// Builds the patron and the target book: loans first, then the flags
fn build(
    setup: &PatronSetup,
    category: BookCategory,
    total: u32,
    available: u32,
    today: chrono::NaiveDate,
) -> (Patron, Book) {
    let mut patron = Patron::new("P-1", "Prop", "prop@example.com", setup.category, today);
    let mut target = Book::new("0123456789", "Target", "Author", category, total);

    let mut fillers = setup.held;
    if setup.holds_target && total > 0 && !target.is_reference_only() {
        checkout(Some(&mut target), Some(&mut patron), today);
        fillers = fillers.saturating_sub(1);
    }
    // loans past the category limit are refused and simply not held
    for n in 0..fillers {
        let mut filler = Book::new(format!("filler-{n}"), "Filler", "Author", BookCategory::Fiction, 1);
        checkout(Some(&mut filler), Some(&mut patron), today);
    }
    target.set_available_copies(available);

    patron.set_suspended(setup.suspended);
    patron.set_overdue_count(setup.overdue);
    patron.add_fine(Money::from_cents(setup.fine_cents));
    (patron, target)
}

proptest! {
    #[test]
    fn fine_is_monotonic_and_capped(days in days_overdue(), category in book_category()) {
        let today = calculate_fine(days, category);
        let tomorrow = calculate_fine(days + 1, category);

        prop_assert!(today <= tomorrow);
        prop_assert!(tomorrow <= DEFAULT_MAX_FINE);
        if days <= 0 {
            prop_assert_eq!(today, Money::ZERO);
        }
    }

    #[test]
    fn doubling_categories_pay_twice_until_the_cap(days in 1i64..=40) {
        let base = calculate_fine(days, BookCategory::Fiction);
        let doubled = calculate_fine(days, BookCategory::Textbook);
        prop_assert_eq!(doubled, Money::from_cents(base.cents() * 2).min(DEFAULT_MAX_FINE));
        prop_assert_eq!(calculate_fine(days, BookCategory::Reference), doubled);
    }

    #[test]
    fn custom_cap_bounds_every_fine(days in days_overdue(), category in book_category(), cap in 0u64..5_000) {
        let schedule = FineSchedule::with_max_fine(Money::from_cents(cap));
        prop_assert!(schedule.fine(days, category) <= Money::from_cents(cap));
    }

    #[test]
    fn rejections_never_mutate(
        setup in patron_setup(),
        category in book_category(),
        total in 0u32..4,
        available in 0u32..4,
        today in business_date(),
    ) {
        let (mut patron, mut book) = build(&setup, category, total, available, today);
        let (patron_before, book_before) = (patron.clone(), book.clone());

        let code = checkout(Some(&mut book), Some(&mut patron), today);

        if code.is_rejection() {
            prop_assert_eq!(&patron, &patron_before);
            prop_assert_eq!(&book, &book_before);
        } else if code == CheckoutCode::Renewed {
            prop_assert_eq!(book.available_copies(), book_before.available_copies());
            prop_assert_eq!(patron.checkout_count(), patron_before.checkout_count());
        } else {
            prop_assert_eq!(book.available_copies() + 1, book_before.available_copies());
            prop_assert_eq!(patron.checkout_count(), patron_before.checkout_count() + 1);
            prop_assert!(patron.checkout_count() <= patron.max_checkouts());
        }
    }

    #[test]
    fn held_books_always_renew_for_eligible_patrons(
        category in patron_category(),
        held in 0usize..20,
        first_day in business_date(),
        gap in 0u64..90,
    ) {
        let setup = PatronSetup {
            category,
            held,
            suspended: false,
            overdue: 0,
            fine_cents: 0,
            holds_target: true,
        };
        let (mut patron, mut book) = build(&setup, BookCategory::Fiction, 1, 0, first_day);
        prop_assume!(patron.holds("0123456789"));

        let later = first_day.checked_add_days(chrono::Days::new(gap)).unwrap();
        let code = checkout(Some(&mut book), Some(&mut patron), later);

        prop_assert_eq!(code, CheckoutCode::Renewed);
        prop_assert_eq!(book.available_copies(), 0);
        prop_assert_eq!(
            patron.due_date("0123456789"),
            later.checked_add_days(chrono::Days::new(category.loan_period_days()))
        );
    }

    #[test]
    fn reference_books_are_never_unavailable(setup in patron_setup(), total in 0u32..10, today in business_date()) {
        let (mut patron, mut book) = build(&setup, BookCategory::Reference, total, total, today);

        let code = checkout(Some(&mut book), Some(&mut patron), today);

        prop_assert_ne!(code, CheckoutCode::Unavailable);
        prop_assert!(code.is_rejection());
        prop_assert_eq!(book.available_copies(), 0);
    }
}
