//! Library circulation: checkout decisions, overdue fines and returns.
//!
//! The heart of the crate is the checkout decision engine
//! ([`checkout::checkout`]): an ordered series of patron and book checks
//! that either commits a loan or rejects it without changing anything.
//! Every result is one of a closed set of [`CheckoutCode`]s, each with a
//! fixed numeric value for interop.
//!
//! ```text
//!   CheckoutBook ──► eligibility::validate ──► book checks ──► commit ──► classify
//!                         │                        │                        │
//!                    3.1 3.0 4.0 4.1         2.1 5.0 0.1 2.0 3.2        1.0 1.1 0.0
//!
//!   ReturnBook ──► return_book ──► FineSchedule::fine ──► Ok(fine) | Err(ReturnError)
//! ```
//!
//! The pure pieces ([`eligibility`], [`fines`]) never see a clock. The
//! engine and return processor take "today" as an argument, and the
//! [`LibraryReducer`] reads it from the injected [`Clock`]. Callers talk to
//! the reducer through a [`CirculationDesk`], which hands each caller the
//! decision for its own request.
//!
//! # Quick Start
//!
//! ```no_run
//! use library_checkout::{
//!     BookCategory, CheckoutCode, CirculationDesk, LibraryAction, LibraryConfig, PatronCategory,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let desk = CirculationDesk::from_config(&LibraryConfig::from_env());
//!
//! desk.send(LibraryAction::AddBook {
//!     isbn: "0123456789".into(),
//!     title: "The Great Adventure".into(),
//!     author: "Jane Doe".into(),
//!     category: BookCategory::Fiction,
//!     total_copies: 5,
//! }).await?;
//! desk.send(LibraryAction::RegisterPatron {
//!     patron_id: "P-10001".into(),
//!     name: "Alice Johnson".into(),
//!     email: "alice@university.edu".into(),
//!     category: PatronCategory::Student,
//! }).await?;
//!
//! let code = desk.checkout("0123456789", "P-10001").await?;
//! assert_eq!(code, CheckoutCode::Success);
//! # Ok(())
//! # }
//! ```

pub mod checkout;
pub mod config;
pub mod desk;
pub mod eligibility;
pub mod error;
pub mod fines;
pub mod isbn;
pub mod metrics;
pub mod reducer;
pub mod registry;
pub mod returns;
pub mod types;

pub use circulation_core::environment::Clock;
pub use config::LibraryConfig;
pub use desk::{CirculationDesk, DeskStore};
pub use error::{ConfigError, DeskError, RegistryError, ReturnError};
pub use fines::{FineSchedule, calculate_fine};
pub use reducer::{LibraryAction, LibraryEnvironment, LibraryReducer, LibraryState, Outcome};
pub use registry::{Inventory, LoanHistory, LoanRecord, PatronRegistry};
pub use returns::{RETURN_FAILED, return_book, return_code};
pub use types::{
    Book, BookCategory, CheckoutCode, Isbn, Money, Patron, PatronCategory, PatronId,
    RequestId,
};
