//! # Circulation Runtime
//!
//! The [`Store`](store::Store) owns circulation state and runs a reducer
//! against it, one action at a time.
//!
//! Checkout and return decisions are check-then-act sequences: the engine
//! reads an available-copy count or a patron's loan count and then commits
//! based on what it read. The store makes every such sequence a critical
//! section by holding the state write lock for the whole reducer call, so
//! two clients racing for the last copy of a book are serialized and only
//! one of them can win.
//!
//! Results travel back as actions. A reducer publishes a decided event
//! through an effect; the store broadcasts it to every subscriber and
//! [`Store::send_and_wait_for`](store::Store::send_and_wait_for) picks out
//! the one addressed to its caller.
//!
//! ## Example
//!
//! ```ignore
//! use circulation_runtime::Store;
//!
//! let store = Store::new(LibraryState::default(), LibraryReducer::new(), env);
//!
//! let reply = store
//!     .send_and_wait_for(
//!         LibraryAction::CheckoutBook { request_id, isbn, patron_id },
//!         |a| a.request_id() == Some(request_id) && a.is_event(),
//!         Duration::from_secs(10),
//!     )
//!     .await?;
//! ```

use circulation_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// No matching action arrived in time
        #[error("Timed out waiting for a reply action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Configuration for a [`Store`](store::Store)
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Default timeout used by [`Store::shutdown_with_default_timeout`](store::Store::shutdown_with_default_timeout)
    pub shutdown_timeout: Duration,
    /// Actions buffered per subscriber before slow ones start lagging
    pub broadcast_capacity: usize,
}

impl StoreConfig {
    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
            broadcast_capacity: 256,
        }
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
///
/// Keeps the counter honest even if the effect panics.
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, Duration, Effect, Ordering, Reducer,
        RwLock, StoreConfig, StoreError, broadcast,
    };

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution, with published actions broadcast and fed back
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        config: StoreConfig,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Clone + Send + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                config,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Releases the lock and starts the returned effects
        ///
        /// Concurrent `send()` calls serialize at the reducer: each reducer
        /// call observes every mutation committed by the calls before it.
        /// `send()` returns once effects have been started, not finished.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<(), StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!("Processing action");
            metrics::counter!("store.commands.total").increment(1);

            let effects = {
                let mut state = self.state.write().await;
                tracing::trace!("Acquired write lock on state");

                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            for effect in effects {
                self.execute_effect(effect);
            }

            Ok(())
        }

        /// Send an action and wait for a matching result action
        ///
        /// Designed for request-response callers: subscribes to the action
        /// broadcast, sends the initial action, then returns the first
        /// published action matching `predicate`.
        ///
        /// Only actions produced by effects are broadcast, never the initial
        /// action. Concurrent callers share one channel, so the predicate
        /// should match on a correlation id.
        ///
        /// # Errors
        ///
        /// - [`StoreError::ShutdownInProgress`]: Store is shutting down
        /// - [`StoreError::Timeout`]: No matching action before `timeout`
        /// - [`StoreError::ChannelClosed`]: Action broadcast channel closed
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            // Subscribe BEFORE sending so the reply cannot slip past
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // If the reply was among the skipped, the timeout catches it
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let on_loan = store.state(|s| s.history.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Rejects new actions immediately, then waits for running effects.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout");
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Shut down using the timeout from [`StoreConfig`]
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn shutdown_with_default_timeout(&self) -> Result<(), StoreError> {
            self.shutdown(self.config.shutdown_timeout).await
        }

        /// Execute an effect
        ///
        /// An action produced by a future is broadcast to subscribers first
        /// and then sent back through the reducer. Effect failures are logged
        /// and do not halt the store.
        fn execute_effect(&self, effect: Effect<A>) {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _pending_guard = pending_guard;

                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, publishing");
                            // No receivers is fine: nobody is waiting on this one
                            let _ = store.action_broadcast.send(action.clone());

                            if let Err(error) = store.send(action).await {
                                tracing::debug!(%error, "Published action not fed back");
                            }
                        }
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                config: self.config.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

pub use store::Store;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use circulation_core::environment::Clock;
    use circulation_core::{NaiveDate, SmallVec, smallvec};
    use circulation_testing::{FixedClock, test_clock};

    // A single shelf of copies: enough to exercise serialization and replies
    #[derive(Debug, Clone, Default)]
    struct ShelfState {
        on_shelf: u32,
        lent: u32,
        rejected: u32,
        last_touched: Option<NaiveDate>,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum ShelfAction {
        Restock(u32),
        Lend { ticket: u32 },
        Lent { ticket: u32, granted: bool },
        Return,
        ReturnLater(Duration),
    }

    #[derive(Debug, Clone)]
    struct ShelfEnv {
        clock: FixedClock,
    }

    #[derive(Debug, Clone)]
    struct ShelfReducer;

    impl Reducer for ShelfReducer {
        type State = ShelfState;
        type Action = ShelfAction;
        type Environment = ShelfEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            state.last_touched = Some(env.clock.today());
            match action {
                ShelfAction::Restock(copies) => {
                    state.on_shelf += copies;
                    smallvec![Effect::None]
                },
                ShelfAction::Lend { ticket } => {
                    let granted = state.on_shelf > 0;
                    if granted {
                        state.on_shelf -= 1;
                        state.lent += 1;
                    } else {
                        state.rejected += 1;
                    }
                    smallvec![Effect::publish(ShelfAction::Lent { ticket, granted })]
                },
                ShelfAction::Lent { .. } => SmallVec::new(),
                ShelfAction::Return => {
                    if state.lent > 0 {
                        state.lent -= 1;
                        state.on_shelf += 1;
                    }
                    smallvec![Effect::None]
                },
                ShelfAction::ReturnLater(duration) => smallvec![Effect::Future(Box::pin(async move {
                    tokio::time::sleep(duration).await;
                    Some(ShelfAction::Return)
                }))],
            }
        }
    }

    fn shelf_store(on_shelf: u32) -> Store<ShelfState, ShelfAction, ShelfEnv, ShelfReducer> {
        Store::new(
            ShelfState {
                on_shelf,
                ..ShelfState::default()
            },
            ShelfReducer,
            ShelfEnv {
                clock: test_clock(),
            },
        )
    }

    fn is_reply_to(ticket: u32) -> impl Fn(&ShelfAction) -> bool {
        move |action| matches!(action, ShelfAction::Lent { ticket: t, .. } if *t == ticket)
    }

    #[tokio::test]
    async fn test_send_applies_reducer() {
        let store = shelf_store(2);

        store.send(ShelfAction::Lend { ticket: 1 }).await.unwrap();

        let (on_shelf, lent) = store.state(|s| (s.on_shelf, s.lent)).await;
        assert_eq!(on_shelf, 1);
        assert_eq!(lent, 1);
    }

    #[tokio::test]
    async fn test_reducer_sees_injected_date() {
        let store = shelf_store(1);

        store.send(ShelfAction::Restock(1)).await.unwrap();

        let touched = store.state(|s| s.last_touched).await;
        assert_eq!(touched, Some(test_clock().today()));
    }

    #[tokio::test]
    async fn test_send_and_wait_for_returns_published_reply() {
        let store = shelf_store(1);

        let reply = store
            .send_and_wait_for(ShelfAction::Lend { ticket: 7 }, is_reply_to(7), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(reply, ShelfAction::Lent { ticket: 7, granted: true });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_each_caller_gets_its_own_reply() {
        let store = shelf_store(1);

        let tasks: Vec<_> = (0..16)
            .map(|ticket| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .send_and_wait_for(
                            ShelfAction::Lend { ticket },
                            is_reply_to(ticket),
                            Duration::from_secs(5),
                        )
                        .await
                })
            })
            .collect();

        let mut granted = 0;
        for (ticket, task) in (0..16).zip(tasks) {
            let ShelfAction::Lent { ticket: got, granted: ok } = task.await.unwrap().unwrap() else {
                unreachable!("predicate only accepts Lent");
            };
            assert_eq!(got, ticket);
            granted += u32::from(ok);
        }

        let (on_shelf, lent, rejected) = store.state(|s| (s.on_shelf, s.lent, s.rejected)).await;
        assert_eq!(granted, 1);
        assert_eq!((on_shelf, lent, rejected), (0, 1, 15));
    }

    #[tokio::test]
    async fn test_send_and_wait_for_times_out_without_reply() {
        let store = shelf_store(1);

        let result = store
            .send_and_wait_for(ShelfAction::Restock(1), is_reply_to(1), Duration::from_millis(20))
            .await;

        assert!(matches!(result, Err(StoreError::Timeout)));
        assert_eq!(store.state(|s| s.on_shelf).await, 2);
    }

    #[tokio::test]
    async fn test_future_effect_is_published_and_fed_back() {
        let store = shelf_store(1);
        store.send(ShelfAction::Lend { ticket: 1 }).await.unwrap();

        let published = store
            .send_and_wait_for(
                ShelfAction::ReturnLater(Duration::from_millis(5)),
                |a| matches!(a, ShelfAction::Return),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert_eq!(published, ShelfAction::Return);

        // Broadcast happens before feedback; wait for the reducer to catch up
        tokio::time::timeout(Duration::from_secs(1), async {
            while store.state(|s| s.lent).await > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(store.state(|s| s.on_shelf).await, 1);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_actions() {
        let store = shelf_store(1);

        assert!(store.shutdown(Duration::from_secs(1)).await.is_ok());

        let result = store.send(ShelfAction::Restock(1)).await;
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));

        let on_shelf = store.state(|s| s.on_shelf).await;
        assert_eq!(on_shelf, 1);
    }

    #[tokio::test]
    async fn test_shutdown_times_out_with_slow_effect() {
        let store = Store::with_config(
            ShelfState::default(),
            ShelfReducer,
            ShelfEnv {
                clock: test_clock(),
            },
            StoreConfig::default().with_shutdown_timeout(Duration::from_millis(20)),
        );

        store
            .send(ShelfAction::ReturnLater(Duration::from_secs(5)))
            .await
            .unwrap();

        let result = store.shutdown_with_default_timeout().await;
        assert!(matches!(result, Err(StoreError::ShutdownTimeout(1))));
    }
}
