//! Error types for circulation operations.
//!
//! Checkout rejections are not errors: they are [`crate::CheckoutCode`]
//! values. Errors here cover returns that cannot be processed, registry
//! misuse, bad configuration and a desk that cannot deliver a decision.

use crate::types::RequestId;
use circulation_runtime::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a return could not be processed
///
/// Every variant maps to the `-1.0` failure sentinel of
/// [`crate::returns::return_code`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnError {
    /// No such patron
    #[error("patron not found")]
    PatronNotFound,

    /// The patron does not hold this book
    #[error("book {isbn} is not checked out by patron {patron_id}")]
    NotCheckedOut {
        /// Book the return was attempted for
        isbn: String,
        /// Patron who attempted it
        patron_id: String,
    },

    /// The ISBN is not in the inventory
    #[error("unknown book: {0}")]
    UnknownBook(String),
}

/// Registry misuse (adding books and patrons)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// ISBN is not 10 or 13 digits (hyphens aside)
    #[error("invalid ISBN: {0}")]
    InvalidIsbn(String),

    /// A book with this ISBN is already registered
    #[error("book already registered: {0}")]
    DuplicateBook(String),

    /// A patron with this identifier is already registered
    #[error("patron already registered: {0}")]
    DuplicatePatron(String),

    /// A stored patron holds more books than the category allows
    #[error("patron {patron_id} holds {held} books, limit is {max}")]
    LoanLimitExceeded {
        /// Patron identifier
        patron_id: String,
        /// Books held
        held: usize,
        /// Category limit
        max: usize,
    },
}

/// Invalid configuration value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The business date override is not `YYYY-MM-DD`
    #[error("invalid LIBRARY_BUSINESS_DATE {value:?}: {reason}")]
    InvalidBusinessDate {
        /// The raw value
        value: String,
        /// Parser message
        reason: String,
    },
}

/// A desk request that got no decision back
#[derive(Error, Debug)]
pub enum DeskError {
    /// The store refused the request or no reply arrived in time
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Only checkouts and returns get a decision back
    #[error("action is not a checkout or return request")]
    NotARequest,

    /// The reply for this request was not the kind of decision asked for
    #[error("unexpected reply to request {0}")]
    UnexpectedReply(RequestId),
}
