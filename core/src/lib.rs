//! # Circulation Core
//!
//! Core traits and types shared by the library circulation crates.
//!
//! Business rules live in reducers: pure functions that take the current
//! state, one action and an injected environment, mutate the state in place
//! and describe any follow-up work as [`effect::Effect`] values. Nothing in a
//! reducer reads the wall clock or touches I/O; time comes in through
//! [`environment::Clock`].
//!
//! ## Core Concepts
//!
//! - **State**: Owned domain data (inventory, patrons, loan history)
//! - **Action**: Every input to a reducer (commands and the events they produce)
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Description of deferred work, executed by the runtime
//! - **Environment**: Injected dependencies such as the business-date clock
//!
//! ## Example
//!
//! ```ignore
//! use circulation_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! impl Reducer for LibraryReducer {
//!     type State = LibraryState;
//!     type Action = LibraryAction;
//!     type Environment = LibraryEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut LibraryState,
//!         action: LibraryAction,
//!         env: &LibraryEnvironment,
//!     ) -> SmallVec<[Effect<LibraryAction>; 4]> {
//!         // Decide, commit, describe effects
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - the trait that holds business logic
///
/// Reducers are deterministic: given the same state, action and environment
/// they always produce the same new state and the same effect descriptions.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// fn reduce(&self, state: &mut LibraryState, action: LibraryAction, env: &LibraryEnvironment)
    ///     -> SmallVec<[Effect<LibraryAction>; 4]>
    /// {
    ///     match action {
    ///         LibraryAction::CheckoutBook { isbn, patron_id, .. } => {
    ///             let today = env.clock.today();
    ///             // decide and commit
    ///             SmallVec::new()
    ///         }
    ///         _ => SmallVec::new(),
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Implementations must either apply every mutation an action implies
        /// or none of them; a rejected command leaves the state untouched
        /// apart from bookkeeping fields such as a last-error slot.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions
///
/// Effects are values, not execution. The runtime decides when and where
/// they run, publishes any resulting action to subscribers and feeds it
/// back into the reducer.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is published and
        /// fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action: Send + 'static> Effect<Action> {
        /// Publishes an action that is already known
        ///
        /// Used to hand a decided event back to whoever is waiting on it.
        #[must_use]
        pub fn publish(action: Action) -> Self {
            Effect::Future(Box::pin(async move { Some(action) }))
        }
    }

    impl<Action> Effect<Action> {
        /// Returns true for `Effect::None`
        #[must_use]
        pub const fn is_noop(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - dependency injection traits
///
/// The circulation engine never reads the system clock directly. Every
/// date it needs (due dates, days overdue) is derived from the clock
/// injected through the environment so tests can pin "today".
pub mod environment {
    use chrono::{DateTime, NaiveDate, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use circulation_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// assert_eq!(clock.today(), clock.now().date_naive());
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;

        /// Get the current business date
        ///
        /// Due dates and overdue day counts are computed on whole days.
        fn today(&self) -> NaiveDate {
            self.now().date_naive()
        }
    }

    /// Production clock backed by `Utc::now()`
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
        fn now(&self) -> DateTime<Utc> {
            (**self).now()
        }

        fn today(&self) -> NaiveDate {
            (**self).today()
        }
    }
}
