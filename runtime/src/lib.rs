//! # Endpoint Store Runtime
//!
//! The imperative shell around `endpoint-store-core`.
//!
//! ## Core Components
//!
//! - **Store**: holds application state, runs the reducer, executes effects and
//!   notifies subscribers
//! - **Fetcher**: binds an endpoint to a consumer and drives its fetch lifecycle
//! - **`ReqwestClient`**: the production [`HttpClient`](endpoint_store_core::environment::HttpClient)
//!
//! ## Example
//!
//! ```ignore
//! use endpoint_store_runtime::{EndpointContext, FetcherBuilder, Store};
//!
//! let store = Store::new(AppState::default(), app_reducer(), ());
//! let context = EndpointContext::new(registry, http, clock);
//!
//! let mut events = FetcherBuilder::new("events")
//!     .with_context(context)
//!     .mount(store.clone(), |state: &AppState| state.route.clone())?;
//!
//! let mut evaluation = events.update().await?;
//! if let Some(handle) = evaluation.handle.as_mut() {
//!     handle.wait().await;
//! }
//!
//! let view = events.render(|props: Injected<'_, Vec<Event>>| props.data.len()).await?;
//! ```

use endpoint_store_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Fetch orchestration: binding endpoints to consumers
pub mod fetcher;

/// reqwest-backed HTTP client
pub mod http;

/// Prometheus metrics for observability
pub mod metrics;

pub use fetcher::{
    EndpointContext, Evaluation, FailureView, Fetcher, FetcherBuilder, Injected, Render,
    fetch_record, render_record,
};
pub use http::{HttpConfig, ReqwestClient};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects (typically in-flight fetches) were still running when
        /// the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),
    }
}

pub use error::StoreError;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use endpoint_store_runtime::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default().with_shutdown_timeout(Duration::from_secs(5));
/// assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How long [`Store::shutdown_default`] waits for pending effects
    pub shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Set the shutdown timeout
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
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`], [`Store::run()`] and the fetch orchestrator
/// to allow waiting for effects (for example an in-flight fetch) to complete.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait().await;
/// // All effects from Action::Start are now complete
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new effect handle and the tracking context used while executing effects
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Ensures the effect counter is always decremented, even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Registered state-change listeners
#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Listener)>>,
}

impl Listeners {
    fn add(&self, listener: Listener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    fn remove(&self, id: u64) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(entry, _)| *entry != id);
    }

    fn snapshot(&self) -> Vec<Listener> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect,
        EffectHandle, EffectTracking, Listener, Listeners, Ordering, Reducer, RwLock, StoreConfig,
        StoreError, Weak,
    };

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (state transitions)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    /// 5. Subscribers notified after every reduction
    ///
    /// Cloning a Store yields another handle to the same state.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        listeners: Arc<Listeners>,
        config: StoreConfig,
    }

    /// Registration of a state-change listener
    ///
    /// Dropping the subscription (or calling [`Subscription::unsubscribe`])
    /// removes the listener.
    #[must_use = "dropping a Subscription unsubscribes the listener"]
    pub struct Subscription {
        listeners: Weak<Listeners>,
        id: u64,
    }

    impl Subscription {
        /// Remove the listener
        pub fn unsubscribe(self) {
            drop(self);
        }
    }

    impl Drop for Subscription {
        fn drop(&mut self) {
            if let Some(listeners) = self.listeners.upgrade() {
                listeners.remove(self.id);
            }
        }
    }

    impl std::fmt::Debug for Subscription {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Subscription").field("id", &self.id).finish()
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses [`StoreConfig::default()`].
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
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                listeners: Arc::new(Listeners::default()),
                config,
            }
        }

        /// Number of effects (across all handles) still running
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Rejects new actions, then waits for pending effects (in-flight
        /// fetches included) to complete.
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
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running", pending
                    );
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// [`shutdown`](Self::shutdown) with the configured
        /// [`StoreConfig::shutdown_timeout`]
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown_default(&self) -> Result<(), StoreError> {
            self.shutdown(self.config.shutdown_timeout).await
        }

        /// Send an action to the store (dispatch)
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Releases the lock and notifies subscribers
        /// 4. Executes returned effects asynchronously
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.ensure_running()?;

            let effects = {
                let mut state = self.state.write().await;
                self.reduce_locked(&mut *state, action)
            };

            Ok(self.finish_dispatch(effects))
        }

        /// Decide on an action from the current state and reduce it atomically
        ///
        /// `decide` sees the state under the write lock; if it returns an action,
        /// that action is reduced before the lock is released. No other dispatch
        /// can interleave between the check and the update, which is what keeps
        /// "check the record, then mark it in flight" race-free.
        ///
        /// Returns `decide`'s output alongside the effect handle of the reduced
        /// action (`None` when no action was chosen).
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        pub async fn send_if<F, T>(&self, decide: F) -> Result<(T, Option<EffectHandle>), StoreError>
        where
            F: FnOnce(&S) -> (T, Option<A>),
        {
            self.ensure_running()?;

            let (output, effects) = {
                let mut state = self.state.write().await;
                let (output, action) = decide(&*state);
                let Some(action) = action else {
                    return Ok((output, None));
                };
                (output, self.reduce_locked(&mut *state, action))
            };

            Ok((output, Some(self.finish_dispatch(effects))))
        }

        /// Register a listener called after every reduction
        ///
        /// Listeners run outside the state lock, so they may read state or
        /// dispatch from within (via a spawned task or a cloned store).
        pub fn subscribe<F>(&self, listener: F) -> Subscription
        where
            F: Fn() + Send + Sync + 'static,
        {
            let listener: Listener = Arc::new(listener);
            let id = self.listeners.add(listener);
            Subscription {
                listeners: Arc::downgrade(&self.listeners),
                id,
            }
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let record = store.state(|s| s.endpoints().record("events")).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Execute an effect built outside the reducer
        ///
        /// Actions the effect produces are fed back into the store, exactly like
        /// effects returned by the reducer.
        pub fn run(&self, effect: Effect<A>) -> EffectHandle {
            let (handle, tracking) = EffectHandle::new();
            self.execute_effect_internal(effect, tracking);
            handle
        }

        fn ensure_running(&self) -> Result<(), StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }
            Ok(())
        }

        /// Reduce an action produced by an effect
        ///
        /// Skips the shutdown gate: effects already running when shutdown starts
        /// still write their result, so no record is left in flight.
        async fn feed_back(&self, action: A) {
            let effects = {
                let mut state = self.state.write().await;
                self.reduce_locked(&mut *state, action)
            };
            let _handle = self.finish_dispatch(effects);
        }

        fn reduce_locked(&self, state: &mut S, action: A) -> smallvec_effects::Effects<A> {
            metrics::counter!("store.commands.total").increment(1);

            let span = tracing::debug_span!("reducer_execution");
            let _enter = span.enter();

            let start = std::time::Instant::now();
            let effects = self.reducer.reduce(state, action, &self.environment);
            metrics::histogram!("store.reducer.duration_seconds")
                .record(start.elapsed().as_secs_f64());

            tracing::trace!("Reducer completed, returned {} effects", effects.len());
            effects
        }

        fn finish_dispatch(&self, effects: smallvec_effects::Effects<A>) -> EffectHandle {
            for listener in self.listeners.snapshot() {
                listener();
            }

            let (handle, tracking) = EffectHandle::new();
            for effect in effects {
                self.execute_effect_internal(effect, tracking.clone());
            }
            handle
        }

        /// Execute an effect with tracking
        ///
        /// Uses [`DecrementGuard`] to ensure the effect counter is always
        /// decremented, even if the effect panics.
        ///
        /// # Effect Types
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, feeds the resulting action back if `Some`
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned into spawned tasks
        fn execute_effect_internal(&self, effect: Effect<A>, tracking: EffectTracking) {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                    let tracking_clone = tracking.clone();
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = DecrementGuard(tracking_clone);
                        let _pending_guard = pending_guard;

                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, feeding back");
                            store.feed_back(action).await;
                        }
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                listeners: Arc::clone(&self.listeners),
                config: self.config.clone(),
            }
        }
    }

    mod smallvec_effects {
        use super::Effect;

        pub(super) type Effects<A> = endpoint_store_core::SmallVec<[Effect<A>; 4]>;
    }
}

// Re-export for convenience
pub use store::{Store, Subscription};
