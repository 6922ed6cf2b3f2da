//! Request/response front of the circulation store.
//!
//! Every checkout or return goes through
//! [`Store::send_and_wait_for`](circulation_runtime::Store::send_and_wait_for)
//! with a fresh [`RequestId`], and the caller only accepts the
//! [`LibraryAction::DecisionPublished`] carrying that id. Concurrent callers
//! therefore each get their own code, even when they race for the same copy.

use crate::config::LibraryConfig;
use crate::error::{DeskError, ReturnError};
use crate::reducer::{LibraryAction, LibraryEnvironment, LibraryReducer, LibraryState, Outcome};
use crate::types::{CheckoutCode, Isbn, Money, PatronId, RequestId};
use circulation_runtime::Store;
use std::time::Duration;

/// Store running the circulation reducer
pub type DeskStore = Store<LibraryState, LibraryAction, LibraryEnvironment, LibraryReducer>;

/// A circulation desk: the store plus how long callers wait for decisions
#[derive(Clone)]
pub struct CirculationDesk {
    store: DeskStore,
    reply_timeout: Duration,
}

impl CirculationDesk {
    /// Wraps an existing store
    #[must_use]
    pub const fn new(store: DeskStore, reply_timeout: Duration) -> Self {
        Self {
            store,
            reply_timeout,
        }
    }

    /// Builds an empty desk from configuration
    #[must_use]
    pub fn from_config(config: &LibraryConfig) -> Self {
        let env = LibraryEnvironment::new(config.clock()).with_fines(config.fine_schedule());
        let store = Store::with_config(
            LibraryState::new(),
            LibraryReducer::new(),
            env,
            config.store_config(),
        );
        Self::new(store, config.reply_timeout())
    }

    /// Checks out (or renews) a book and returns this caller's decision
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] when the store is shutting down or the decision
    /// does not arrive within the reply timeout.
    pub async fn checkout(
        &self,
        isbn: impl Into<Isbn>,
        patron_id: impl Into<PatronId>,
    ) -> Result<CheckoutCode, DeskError> {
        let action = LibraryAction::checkout(isbn, patron_id);
        let request_id = Self::request_id_of(&action)?;

        match self.submit(action).await? {
            Outcome::Checkout(code) => Ok(code),
            Outcome::Return(_) => Err(DeskError::UnexpectedReply(request_id)),
        }
    }

    /// Returns a book: the fine charged, or why the return failed
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] when the store is shutting down or the result
    /// does not arrive within the reply timeout.
    pub async fn return_book(
        &self,
        isbn: impl Into<Isbn>,
        patron_id: impl Into<PatronId>,
    ) -> Result<Result<Money, ReturnError>, DeskError> {
        let action = LibraryAction::return_book(isbn, patron_id);
        let request_id = Self::request_id_of(&action)?;

        match self.submit(action).await? {
            Outcome::Return(result) => Ok(result),
            Outcome::Checkout(_) => Err(DeskError::UnexpectedReply(request_id)),
        }
    }

    /// Sends a checkout or return and waits for the decision carrying its request id
    ///
    /// # Errors
    ///
    /// [`DeskError::NotARequest`] for actions without a request id,
    /// [`DeskError::Store`] on shutdown or reply timeout.
    pub async fn submit(&self, action: LibraryAction) -> Result<Outcome, DeskError> {
        let request_id = Self::request_id_of(&action)?;
        let reply = self
            .store
            .send_and_wait_for(
                action,
                move |a| {
                    matches!(a, LibraryAction::DecisionPublished { .. })
                        && a.request_id() == Some(request_id)
                },
                self.reply_timeout,
            )
            .await?;

        tracing::trace!(%request_id, "Decision received");
        reply.outcome().ok_or(DeskError::UnexpectedReply(request_id))
    }

    /// Sends a command that has no per-caller result (registration, fines, flags)
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] when the store is shutting down.
    pub async fn send(&self, action: LibraryAction) -> Result<(), DeskError> {
        self.store.send(action).await?;
        Ok(())
    }

    /// Reads desk state via a closure
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&LibraryState) -> T,
    {
        self.store.state(f).await
    }

    /// Stops accepting requests and waits for in-flight replies
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] if replies are still pending at the store's
    /// shutdown timeout.
    pub async fn shutdown(&self) -> Result<(), DeskError> {
        self.store.shutdown_with_default_timeout().await?;
        Ok(())
    }

    fn request_id_of(action: &LibraryAction) -> Result<RequestId, DeskError> {
        match action {
            LibraryAction::CheckoutBook { request_id, .. } | LibraryAction::ReturnBook { request_id, .. } => {
                Ok(*request_id)
            }
            _ => Err(DeskError::NotARequest),
        }
    }
}
