//! Return processing.

use crate::error::ReturnError;
use crate::fines::FineSchedule;
use crate::registry::Inventory;
use crate::types::{Money, Patron};
use chrono::NaiveDate;

/// Numeric result of a failed return
pub const RETURN_FAILED: f64 = -1.0;

/// Takes a book back from a patron, charging any overdue fine
///
/// On success the loan is removed, one copy goes back on the shelf (never
/// above the total), and the fine charged is returned (zero when on time).
///
/// # Errors
///
/// Fails without changing anything when the patron is absent, does not hold
/// `isbn`, or `isbn` is not in `inventory`.
pub fn return_book(
    isbn: &str,
    patron: Option<&mut Patron>,
    inventory: &mut Inventory,
    today: NaiveDate,
    schedule: &FineSchedule,
) -> Result<Money, ReturnError> {
    let Some(patron) = patron else {
        return Err(ReturnError::PatronNotFound);
    };

    let Some(due) = patron.due_date(isbn) else {
        return Err(ReturnError::NotCheckedOut {
            isbn: isbn.to_string(),
            patron_id: patron.id().to_string(),
        });
    };

    let Some(book) = inventory.get_mut(isbn) else {
        return Err(ReturnError::UnknownBook(isbn.to_string()));
    };

    let days_overdue = today.signed_duration_since(due).num_days();
    let fine = schedule.fine(days_overdue, book.category());
    patron.add_fine(fine);

    patron.release_loan(isbn);
    book.restore_copy();

    Ok(fine)
}

/// Numeric form of a return result: the fine in dollars, or [`RETURN_FAILED`]
#[must_use]
pub fn return_code(result: &Result<Money, ReturnError>) -> f64 {
    match result {
        Ok(fine) => fine.as_dollars(),
        Err(_) => RETURN_FAILED,
    }
}
