//! Circulation desk reducer.
//!
//! Turns commands into decisions and events. Checkouts and returns run the
//! decision engine and the return processor directly against the state and
//! record the resulting event in the loan history in the same step. Inside
//! a [`circulation_runtime::Store`] every command runs under the store's
//! write lock, so check-then-act sequences never interleave.
//!
//! The decided event is then published as [`LibraryAction::DecisionPublished`]
//! carrying the command's [`RequestId`], which is how each caller learns its
//! own result (see [`crate::desk::CirculationDesk`]).

use crate::checkout;
use crate::error::{RegistryError, ReturnError};
use crate::fines::FineSchedule;
use crate::isbn;
use crate::metrics;
use crate::registry::{Inventory, LoanHistory, PatronRegistry};
use crate::returns;
use crate::types::{
    Book, BookCategory, CheckoutCode, Isbn, Money, Patron, PatronCategory, PatronId, RequestId,
};
use chrono::NaiveDate;
use circulation_core::{SmallVec, effect::Effect, environment::Clock, reducer::Reducer, smallvec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of one checkout or return
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// A checkout decision
    Checkout(CheckoutCode),
    /// A return: the fine charged, or why it failed
    Return(Result<Money, ReturnError>),
}

impl Outcome {
    /// Numeric interop value: the checkout code, the fine in dollars, or `-1.0`
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Checkout(code) => code.as_f64(),
            Self::Return(result) => returns::return_code(result),
        }
    }
}

/// State of the circulation desk
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryState {
    /// Books by ISBN
    pub inventory: Inventory,
    /// Patrons by identifier
    pub patrons: PatronRegistry,
    /// Loan log
    pub history: LoanHistory,
    /// Last command validation error
    pub last_error: Option<String>,
}

impl LibraryState {
    /// Creates an empty desk
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a book
    #[must_use]
    pub fn book(&self, isbn: &str) -> Option<&Book> {
        self.inventory.get(isbn)
    }

    /// Looks up a patron
    #[must_use]
    pub fn patron(&self, id: &str) -> Option<&Patron> {
        self.patrons.get(id)
    }
}

/// Actions for the circulation desk (commands and events)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LibraryAction {
    // ========== Commands ==========
    /// Command: Add a title to the inventory
    AddBook {
        /// ISBN
        isbn: Isbn,
        /// Title
        title: String,
        /// Author
        author: String,
        /// Category
        category: BookCategory,
        /// Copies owned
        total_copies: u32,
    },

    /// Command: Register a patron (member since today)
    RegisterPatron {
        /// Patron identifier
        patron_id: PatronId,
        /// Full name
        name: String,
        /// Contact email
        email: String,
        /// Category
        category: PatronCategory,
    },

    /// Command: Check out (or renew) a book
    ///
    /// Unknown identifiers are treated as absent book or patron.
    CheckoutBook {
        /// Correlates the published decision with this request
        request_id: RequestId,
        /// Book
        isbn: Isbn,
        /// Borrower
        patron_id: PatronId,
    },

    /// Command: Return a book
    ReturnBook {
        /// Correlates the published result with this request
        request_id: RequestId,
        /// Book
        isbn: Isbn,
        /// Borrower
        patron_id: PatronId,
    },

    /// Command: Charge a fine outside of a return (damage, lost card, ...)
    ChargeFine {
        /// Patron
        patron_id: PatronId,
        /// Charge
        amount: Money,
    },

    /// Command: Pay toward a patron's fines
    PayFine {
        /// Patron
        patron_id: PatronId,
        /// Payment
        amount: Money,
    },

    /// Command: Suspend or reinstate a patron
    SetSuspended {
        /// Patron
        patron_id: PatronId,
        /// New flag
        suspended: bool,
    },

    /// Command: Record a patron's overdue-book count
    SetOverdueCount {
        /// Patron
        patron_id: PatronId,
        /// Books currently overdue
        count: u32,
    },

    /// Command: Override the shelf count of a book
    SetAvailableCopies {
        /// Book
        isbn: Isbn,
        /// Copies on the shelf (clamped to the total)
        copies: u32,
    },

    // ========== Events ==========
    /// Event: A title was added
    BookAdded {
        /// ISBN
        isbn: Isbn,
        /// Title
        title: String,
        /// Author
        author: String,
        /// Category
        category: BookCategory,
        /// Copies owned
        total_copies: u32,
    },

    /// Event: A patron was registered
    PatronRegistered {
        /// Patron identifier
        patron_id: PatronId,
        /// Full name
        name: String,
        /// Contact email
        email: String,
        /// Category
        category: PatronCategory,
        /// Registration date
        member_since: NaiveDate,
    },

    /// Event: A checkout was decided
    CheckoutDecided {
        /// Request that asked for it
        request_id: RequestId,
        /// Book
        isbn: Isbn,
        /// Borrower
        patron_id: PatronId,
        /// Decision
        code: CheckoutCode,
        /// Business date of the decision
        decided_on: NaiveDate,
        /// New due date when the checkout went through
        due_date: Option<NaiveDate>,
    },

    /// Event: A book came back
    BookReturned {
        /// Request that brought it back
        request_id: RequestId,
        /// Book
        isbn: Isbn,
        /// Borrower
        patron_id: PatronId,
        /// Fine charged
        fine: Money,
        /// Business date of the return
        returned_on: NaiveDate,
    },

    /// Event: A return was refused
    ReturnRejected {
        /// Request that was refused
        request_id: RequestId,
        /// Book
        isbn: Isbn,
        /// Borrower
        patron_id: PatronId,
        /// Why
        reason: ReturnError,
    },

    /// Event: A charge was added to a patron's balance
    FineCharged {
        /// Patron
        patron_id: PatronId,
        /// Charge
        amount: Money,
    },

    /// Event: A payment was applied
    FinePaid {
        /// Patron
        patron_id: PatronId,
        /// Payment
        amount: Money,
    },

    /// Event: Suspension flag changed
    SuspensionChanged {
        /// Patron
        patron_id: PatronId,
        /// New flag
        suspended: bool,
    },

    /// Event: Overdue count recorded
    OverdueCountRecorded {
        /// Patron
        patron_id: PatronId,
        /// Books overdue
        count: u32,
    },

    /// Event: Shelf count overridden
    AvailabilityAdjusted {
        /// Book
        isbn: Isbn,
        /// Requested shelf count
        copies: u32,
    },

    /// Event: Command validation failed
    ValidationFailed {
        /// Error message
        error: String,
    },

    /// Event: A checkout or return decision, published to the requester
    ///
    /// The wrapped event was applied when the command ran; the reducer does
    /// not apply it again.
    DecisionPublished {
        /// `CheckoutDecided`, `BookReturned` or `ReturnRejected`
        event: Box<LibraryAction>,
    },
}

impl LibraryAction {
    /// Checkout command with a fresh request id
    #[must_use]
    pub fn checkout(isbn: impl Into<Isbn>, patron_id: impl Into<PatronId>) -> Self {
        Self::CheckoutBook {
            request_id: RequestId::new(),
            isbn: isbn.into(),
            patron_id: patron_id.into(),
        }
    }

    /// Return command with a fresh request id
    #[must_use]
    pub fn return_book(isbn: impl Into<Isbn>, patron_id: impl Into<PatronId>) -> Self {
        Self::ReturnBook {
            request_id: RequestId::new(),
            isbn: isbn.into(),
            patron_id: patron_id.into(),
        }
    }

    /// Correlation id of a checkout or return and of the events answering it
    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::CheckoutBook { request_id, .. }
            | Self::ReturnBook { request_id, .. }
            | Self::CheckoutDecided { request_id, .. }
            | Self::BookReturned { request_id, .. }
            | Self::ReturnRejected { request_id, .. } => Some(*request_id),
            Self::DecisionPublished { event } => event.request_id(),
            _ => None,
        }
    }

    /// The result a decision event carries
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::CheckoutDecided { code, .. } => Some(Outcome::Checkout(*code)),
            Self::BookReturned { fine, .. } => Some(Outcome::Return(Ok(*fine))),
            Self::ReturnRejected { reason, .. } => Some(Outcome::Return(Err(reason.clone()))),
            Self::DecisionPublished { event } => event.outcome(),
            _ => None,
        }
    }

    /// True for commands (requests that may be refused)
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::AddBook { .. }
                | Self::RegisterPatron { .. }
                | Self::CheckoutBook { .. }
                | Self::ReturnBook { .. }
                | Self::ChargeFine { .. }
                | Self::PayFine { .. }
                | Self::SetSuspended { .. }
                | Self::SetOverdueCount { .. }
                | Self::SetAvailableCopies { .. }
        )
    }

    /// True for events (facts already decided)
    #[must_use]
    pub const fn is_event(&self) -> bool {
        !self.is_command()
    }
}

/// Environment dependencies for the circulation desk
#[derive(Clone)]
pub struct LibraryEnvironment {
    /// Source of "today"
    pub clock: Arc<dyn Clock>,
    /// Fine rules
    pub fines: FineSchedule,
}

impl LibraryEnvironment {
    /// Creates an environment with the default fine schedule
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            fines: FineSchedule::default(),
        }
    }

    /// Replaces the fine schedule
    #[must_use]
    pub const fn with_fines(mut self, fines: FineSchedule) -> Self {
        self.fines = fines;
        self
    }
}

/// Reducer for the circulation desk
#[derive(Clone, Debug, Default)]
pub struct LibraryReducer;

impl LibraryReducer {
    /// Creates a new `LibraryReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn validate_add_book(state: &LibraryState, isbn: &Isbn) -> Result<(), String> {
        if !isbn::is_valid(isbn.as_str()) {
            return Err(RegistryError::InvalidIsbn(isbn.to_string()).to_string());
        }
        if state.inventory.contains(isbn.as_str()) {
            return Err(RegistryError::DuplicateBook(isbn.to_string()).to_string());
        }
        Ok(())
    }

    fn validate_register_patron(state: &LibraryState, patron_id: &PatronId) -> Result<(), String> {
        if state.patrons.get(patron_id.as_str()).is_some() {
            return Err(RegistryError::DuplicatePatron(patron_id.to_string()).to_string());
        }
        Ok(())
    }

    fn validate_patron(state: &LibraryState, patron_id: &PatronId) -> Result<(), String> {
        if state.patrons.get(patron_id.as_str()).is_none() {
            return Err(format!("Patron {patron_id} not found"));
        }
        Ok(())
    }

    fn validate_amount(state: &LibraryState, patron_id: &PatronId, amount: Money) -> Result<(), String> {
        Self::validate_patron(state, patron_id)?;
        if amount.is_zero() {
            return Err("Amount must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Runs the decision engine and builds the decision event
    fn handle_checkout(
        state: &mut LibraryState,
        request_id: RequestId,
        isbn: Isbn,
        patron_id: PatronId,
        env: &LibraryEnvironment,
    ) -> LibraryAction {
        let today = env.clock.today();
        let LibraryState {
            inventory, patrons, ..
        } = state;

        let code = checkout::checkout(
            inventory.get_mut(isbn.as_str()),
            patrons.get_mut(patron_id.as_str()),
            today,
        );

        let due_date = if code.is_success() {
            patrons
                .get(patron_id.as_str())
                .and_then(|patron| patron.due_date(isbn.as_str()))
        } else {
            None
        };

        tracing::debug!(%request_id, %isbn, %patron_id, %code, "Checkout decided");
        if code.is_success() {
            tracing::info!(%isbn, %patron_id, code = code.label(), ?due_date, "Checkout committed");
        } else {
            tracing::warn!(%isbn, %patron_id, code = code.label(), "Checkout rejected");
        }
        metrics::record_checkout(code);

        LibraryAction::CheckoutDecided {
            request_id,
            isbn,
            patron_id,
            code,
            decided_on: today,
            due_date,
        }
    }

    /// Runs the return processor and builds the result event
    fn handle_return(
        state: &mut LibraryState,
        request_id: RequestId,
        isbn: Isbn,
        patron_id: PatronId,
        env: &LibraryEnvironment,
    ) -> LibraryAction {
        let today = env.clock.today();
        let LibraryState {
            inventory, patrons, ..
        } = state;

        let result = returns::return_book(
            isbn.as_str(),
            patrons.get_mut(patron_id.as_str()),
            inventory,
            today,
            &env.fines,
        );
        metrics::record_return(&result);

        match result {
            Ok(fine) => {
                tracing::info!(%request_id, %isbn, %patron_id, %fine, "Book returned");
                LibraryAction::BookReturned {
                    request_id,
                    isbn,
                    patron_id,
                    fine,
                    returned_on: today,
                }
            }
            Err(reason) => {
                tracing::warn!(%request_id, %isbn, %patron_id, %reason, "Return rejected");
                LibraryAction::ReturnRejected {
                    request_id,
                    isbn,
                    patron_id,
                    reason,
                }
            }
        }
    }

    /// Applies a decision event and publishes it to the requester
    fn commit_and_publish(
        state: &mut LibraryState,
        event: LibraryAction,
    ) -> SmallVec<[Effect<LibraryAction>; 4]> {
        Self::apply_event(state, &event);
        smallvec![Effect::publish(LibraryAction::DecisionPublished {
            event: Box::new(event),
        })]
    }

    fn reject(state: &mut LibraryState, error: String) {
        tracing::warn!(%error, "Command rejected");
        Self::apply_event(state, &LibraryAction::ValidationFailed { error });
    }

    /// Applies an event to state
    fn apply_event(state: &mut LibraryState, action: &LibraryAction) {
        match action {
            LibraryAction::BookAdded {
                isbn,
                title,
                author,
                category,
                total_copies,
            } => {
                let book = Book::new(isbn.clone(), title.clone(), author.clone(), *category, *total_copies);
                state.last_error = state.inventory.add(book).err().map(|e| e.to_string());
            }
            LibraryAction::PatronRegistered {
                patron_id,
                name,
                email,
                category,
                member_since,
            } => {
                let patron = Patron::new(patron_id.clone(), name.clone(), email.clone(), *category, *member_since);
                state.last_error = state.patrons.register(patron).err().map(|e| e.to_string());
            }
            LibraryAction::CheckoutDecided {
                isbn,
                patron_id,
                code,
                decided_on,
                due_date,
                ..
            } => {
                match (code, due_date) {
                    (CheckoutCode::Renewed, Some(due)) => {
                        state.history.renew(patron_id.as_str(), isbn.as_str(), *due);
                    }
                    (code, Some(due)) if code.is_success() => {
                        state.history.open(patron_id.clone(), isbn.clone(), *decided_on, *due);
                    }
                    _ => {}
                }
                state.last_error = None;
            }
            LibraryAction::BookReturned {
                isbn,
                patron_id,
                returned_on,
                ..
            } => {
                state.history.close(patron_id.as_str(), isbn.as_str(), *returned_on);
                state.last_error = None;
            }
            LibraryAction::ReturnRejected { .. } => {
                state.last_error = None;
            }
            LibraryAction::FineCharged { patron_id, amount } => {
                if let Some(patron) = state.patrons.get_mut(patron_id.as_str()) {
                    patron.add_fine(*amount);
                }
                state.last_error = None;
            }
            LibraryAction::FinePaid { patron_id, amount } => {
                if let Some(patron) = state.patrons.get_mut(patron_id.as_str()) {
                    patron.pay_fine(*amount);
                }
                state.last_error = None;
            }
            LibraryAction::SuspensionChanged {
                patron_id,
                suspended,
            } => {
                if let Some(patron) = state.patrons.get_mut(patron_id.as_str()) {
                    patron.set_suspended(*suspended);
                }
                state.last_error = None;
            }
            LibraryAction::OverdueCountRecorded { patron_id, count } => {
                if let Some(patron) = state.patrons.get_mut(patron_id.as_str()) {
                    patron.set_overdue_count(*count);
                }
                state.last_error = None;
            }
            LibraryAction::AvailabilityAdjusted { isbn, copies } => {
                if let Some(book) = state.inventory.get_mut(isbn.as_str()) {
                    book.set_available_copies(*copies);
                }
                state.last_error = None;
            }
            LibraryAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            }
            // Already applied when the command ran
            LibraryAction::DecisionPublished { .. } => {}
            // Commands are not applied to state
            LibraryAction::AddBook { .. }
            | LibraryAction::RegisterPatron { .. }
            | LibraryAction::CheckoutBook { .. }
            | LibraryAction::ReturnBook { .. }
            | LibraryAction::ChargeFine { .. }
            | LibraryAction::PayFine { .. }
            | LibraryAction::SetSuspended { .. }
            | LibraryAction::SetOverdueCount { .. }
            | LibraryAction::SetAvailableCopies { .. } => {}
        }
    }
}

impl Reducer for LibraryReducer {
    type State = LibraryState;
    type Action = LibraryAction;
    type Environment = LibraryEnvironment;

    #[allow(clippy::too_many_lines)] // one arm per command
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            LibraryAction::AddBook {
                isbn,
                title,
                author,
                category,
                total_copies,
            } => {
                if let Err(error) = Self::validate_add_book(state, &isbn) {
                    Self::reject(state, error);
                    return SmallVec::new();
                }

                tracing::info!(%isbn, %category, total_copies, "Book added");
                Self::apply_event(
                    state,
                    &LibraryAction::BookAdded {
                        isbn,
                        title,
                        author,
                        category,
                        total_copies,
                    },
                );
            }

            LibraryAction::RegisterPatron {
                patron_id,
                name,
                email,
                category,
            } => {
                if let Err(error) = Self::validate_register_patron(state, &patron_id) {
                    Self::reject(state, error);
                    return SmallVec::new();
                }

                tracing::info!(%patron_id, %category, "Patron registered");
                Self::apply_event(
                    state,
                    &LibraryAction::PatronRegistered {
                        patron_id,
                        name,
                        email,
                        category,
                        member_since: env.clock.today(),
                    },
                );
            }

            LibraryAction::CheckoutBook {
                request_id,
                isbn,
                patron_id,
            } => {
                let event = Self::handle_checkout(state, request_id, isbn, patron_id, env);
                return Self::commit_and_publish(state, event);
            }

            LibraryAction::ReturnBook {
                request_id,
                isbn,
                patron_id,
            } => {
                let event = Self::handle_return(state, request_id, isbn, patron_id, env);
                return Self::commit_and_publish(state, event);
            }

            LibraryAction::ChargeFine { patron_id, amount } => {
                if let Err(error) = Self::validate_amount(state, &patron_id, amount) {
                    Self::reject(state, error);
                    return SmallVec::new();
                }

                tracing::info!(%patron_id, %amount, "Fine charged");
                Self::apply_event(state, &LibraryAction::FineCharged { patron_id, amount });
            }

            LibraryAction::PayFine { patron_id, amount } => {
                if let Err(error) = Self::validate_amount(state, &patron_id, amount) {
                    Self::reject(state, error);
                    return SmallVec::new();
                }

                tracing::info!(%patron_id, %amount, "Fine paid");
                Self::apply_event(state, &LibraryAction::FinePaid { patron_id, amount });
            }

            LibraryAction::SetSuspended {
                patron_id,
                suspended,
            } => {
                if let Err(error) = Self::validate_patron(state, &patron_id) {
                    Self::reject(state, error);
                    return SmallVec::new();
                }

                tracing::info!(%patron_id, suspended, "Suspension changed");
                Self::apply_event(
                    state,
                    &LibraryAction::SuspensionChanged {
                        patron_id,
                        suspended,
                    },
                );
            }

            LibraryAction::SetOverdueCount { patron_id, count } => {
                if let Err(error) = Self::validate_patron(state, &patron_id) {
                    Self::reject(state, error);
                    return SmallVec::new();
                }

                tracing::debug!(%patron_id, count, "Overdue count recorded");
                Self::apply_event(state, &LibraryAction::OverdueCountRecorded { patron_id, count });
            }

            LibraryAction::SetAvailableCopies { isbn, copies } => {
                if !state.inventory.contains(isbn.as_str()) {
                    Self::reject(state, format!("Book {isbn} not found"));
                    return SmallVec::new();
                }

                tracing::debug!(%isbn, copies, "Availability adjusted");
                Self::apply_event(state, &LibraryAction::AvailabilityAdjusted { isbn, copies });
            }

            // ========== Events ==========
            LibraryAction::DecisionPublished { event } => {
                tracing::trace!(request_id = ?event.request_id(), "Decision delivered");
            }
            event => Self::apply_event(state, &event),
        }

        SmallVec::new()
    }
}
