//! Black-box checkout and return scenarios against the public engine API.

#![allow(clippy::unwrap_used)]

use chrono::{Days, NaiveDate};
use library_checkout::checkout::checkout;
use library_checkout::{
    Book, BookCategory, CheckoutCode, FineSchedule, Inventory, Money, Patron, PatronCategory,
    RETURN_FAILED, ReturnError, calculate_fine, return_book, return_code,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn patron(category: PatronCategory) -> Patron {
    Patron::new("P-1", "Test Patron", "patron@example.com", category, today())
}

fn fiction(isbn: &str, copies: u32) -> Book {
    Book::new(isbn, "Title", "Author", BookCategory::Fiction, copies)
}

/// Lends `count` distinct single-copy books to `patron`
fn lend_many(patron: &mut Patron, count: usize) {
    for n in 0..count {
        let mut book = fiction(&format!("filler-{n}"), 1);
        let code = checkout(Some(&mut book), Some(&mut *patron), today());
        assert!(code.is_success(), "filler checkout {n} failed with {code}");
    }
}

#[test]
fn fine_examples() {
    assert_eq!(calculate_fine(5, BookCategory::Fiction), Money::from_cents(125));
    assert_eq!(calculate_fine(10, BookCategory::Nonfiction), Money::from_cents(325));
    assert_eq!(calculate_fine(20, BookCategory::Textbook), Money::from_cents(2_250));
    assert_eq!(calculate_fine(50, BookCategory::Fiction), Money::from_cents(2_500));
}

#[test]
fn null_everything_is_patron_missing() {
    assert!((checkout(None, None, today()).as_f64() - 3.1).abs() < f64::EPSILON);
}

#[test]
fn suspended_patron_without_book() {
    let mut p = patron(PatronCategory::Public);
    p.set_suspended(true);
    assert_eq!(checkout(None, Some(&mut p), today()), CheckoutCode::PatronSuspended);
}

#[test]
fn student_tenth_book_warns_near_limit() {
    let mut p = patron(PatronCategory::Student);
    lend_many(&mut p, 9);

    let mut book = fiction("0123456789", 2);
    assert_eq!(checkout(Some(&mut book), Some(&mut p), today()), CheckoutCode::NearLimitWarning);
    assert_eq!(p.checkout_count(), 10);
}

#[test]
fn student_eleventh_book_is_refused() {
    let mut p = patron(PatronCategory::Student);
    lend_many(&mut p, 10);
    let before = p.clone();

    let mut book = fiction("0123456789", 2);
    assert_eq!(
        checkout(Some(&mut book), Some(&mut p), today()),
        CheckoutCode::CheckoutLimitReached
    );
    assert_eq!(p, before);
    assert_eq!(book.available_copies(), 2);
}

#[test]
fn child_third_book_warning_depends_on_overdue_count() {
    for (overdue, expected) in [
        (0, CheckoutCode::NearLimitWarning),
        (1, CheckoutCode::OverdueWarning),
        (2, CheckoutCode::OverdueWarning),
    ] {
        let mut p = patron(PatronCategory::Child);
        lend_many(&mut p, 2);
        p.set_overdue_count(overdue);

        let mut book = Book::new("0123456789", "Little Fox", "Green", BookCategory::Children, 4);
        assert_eq!(checkout(Some(&mut book), Some(&mut p), today()), expected, "overdue = {overdue}");
    }
}

#[test]
fn three_overdue_books_block_even_renewal() {
    let mut p = patron(PatronCategory::Faculty);
    let mut book = fiction("0123456789", 2);
    checkout(Some(&mut book), Some(&mut p), today());
    p.set_overdue_count(3);

    assert_eq!(checkout(Some(&mut book), Some(&mut p), today()), CheckoutCode::TooManyOverdue);
}

#[test]
fn reference_book_is_never_lendable() {
    let mut atlas = Book::new("978-0-9999-8888-7", "Atlas", "Maps", BookCategory::Reference, 5);
    assert_eq!(atlas.available_copies(), 0);

    for category in PatronCategory::ALL {
        let mut p = patron(category);
        assert_eq!(checkout(Some(&mut atlas), Some(&mut p), today()), CheckoutCode::ReferenceOnly);
    }
    assert_eq!(atlas.available_copies(), 0);
}

#[test]
fn renewal_at_the_limit_with_no_copies_left() {
    let mut p = patron(PatronCategory::Child);
    lend_many(&mut p, 2);
    let mut book = fiction("0123456789", 1);
    checkout(Some(&mut book), Some(&mut p), today());
    assert_eq!(book.available_copies(), 0);
    assert_eq!(p.checkout_count(), p.max_checkouts());

    let later = today().checked_add_days(Days::new(7)).unwrap();
    assert_eq!(checkout(Some(&mut book), Some(&mut p), later), CheckoutCode::Renewed);
    assert_eq!(book.available_copies(), 0);
    assert_eq!(p.due_date("0123456789"), later.checked_add_days(Days::new(14)));
}

#[test]
fn unavailable_book_changes_nothing() {
    let mut p = patron(PatronCategory::Staff);
    let mut book = fiction("0123456789", 3);
    book.set_available_copies(0);

    assert_eq!(checkout(Some(&mut book), Some(&mut p), today()), CheckoutCode::Unavailable);
    assert_eq!(p.checkout_count(), 0);
}

#[test]
fn return_round_trip_on_same_day() {
    let mut inventory = Inventory::new();
    inventory.add(fiction("0123456789", 3)).unwrap();
    let mut p = patron(PatronCategory::Student);

    let code = checkout(inventory.get_mut("0123456789"), Some(&mut p), today());
    assert_eq!(code, CheckoutCode::Success);

    let result = return_book("0123456789", Some(&mut p), &mut inventory, today(), &FineSchedule::default());
    assert_eq!(result, Ok(Money::ZERO));
    assert!(return_code(&result).abs() < f64::EPSILON);
    assert_eq!(inventory.get("0123456789").unwrap().available_copies(), 3);
    assert_eq!(p.checkout_count(), 0);
}

#[test]
fn late_return_charges_patron_and_can_block_next_checkout() {
    let mut inventory = Inventory::new();
    inventory
        .add(Book::new("9780123456789", "Calculus", "Stewart", BookCategory::Textbook, 1))
        .unwrap();
    inventory.add(fiction("0123456789", 1)).unwrap();
    let mut p = patron(PatronCategory::Public);

    checkout(inventory.get_mut("9780123456789"), Some(&mut p), today());
    // public loan is 21 days; 31 days later the book is 10 days late
    let late = today().checked_add_days(Days::new(31)).unwrap();
    let result = return_book("9780123456789", Some(&mut p), &mut inventory, late, &FineSchedule::default());

    assert_eq!(result, Ok(Money::from_cents(650)));
    assert_eq!(p.fine_balance(), Money::from_cents(650));
    assert_eq!(
        checkout(inventory.get_mut("0123456789"), Some(&mut p), late),
        CheckoutCode::Success
    );

    p.add_fine(Money::from_cents(350));
    let mut other = fiction("1111111111", 1);
    assert_eq!(checkout(Some(&mut other), Some(&mut p), late), CheckoutCode::UnpaidFines);
}

#[test]
fn returning_an_unheld_book_is_the_failure_sentinel() {
    let mut inventory = Inventory::new();
    inventory.add(fiction("0123456789", 3)).unwrap();
    let mut p = patron(PatronCategory::Student);
    let before = inventory.clone();

    let result = return_book("0123456789", Some(&mut p), &mut inventory, today(), &FineSchedule::default());

    assert!(matches!(result, Err(ReturnError::NotCheckedOut { .. })));
    assert!((return_code(&result) - RETURN_FAILED).abs() < f64::EPSILON);
    assert_eq!(inventory, before);
}
