//! # Catalog Runtime
//!
//! Runtime implementation for the cat catalog architecture.
//!
//! This crate provides the [`Store`] that owns a list scope's state and
//! coordinates reducer execution with effect handling.
//!
//! ## Core Components
//!
//! - **Store**: Holds state, runs the reducer one action at a time, executes effects
//! - **Effect Executor**: Spawns effect descriptions on tokio and feeds actions back
//! - **Effect Handles**: Let callers wait until the effects of an action have finished
//!
//! ## Example
//!
//! ```ignore
//! use catalog_runtime::Store;
//!
//! let store = Store::new(ListState::new(20), CatListReducer::new(), environment);
//!
//! // Send an action and wait for the page to arrive
//! let mut handle = store.send(CatListAction::Initialize).await?;
//! handle.wait().await;
//!
//! // Read state
//! let count = store.state(|s| s.cats.len()).await;
//! ```

use catalog_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};

/// Metric names recorded by the Store
pub mod metrics;

use crate::metrics::{
    COMMANDS_TOTAL, EFFECTS_COUNT, EFFECTS_EXECUTED, REDUCER_DURATION, REJECTED_ACTIONS,
};

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
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a matching action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Effect tracking mode - controls how far a handle follows effects
///
/// # Modes
///
/// - **Direct**: Tracks only the effects returned for the sent action
/// - **Cascading**: Also tracks effects returned for actions those effects feed back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    /// Track only immediate effects spawned by this action
    Direct,

    /// Track effects transitively through the feedback loop
    Cascading,
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for effects to complete.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(CatListAction::LoadMore).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // The page request has finished and its result has been reduced
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    mode: TrackingMode,
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new handle and the tracking context that feeds it
    fn new(mode: TrackingMode) -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            mode,
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            mode,
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (_tx, rx) = watch::channel(());

        Self {
            mode: TrackingMode::Direct,
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Tracking mode this handle was created with
    #[must_use]
    pub const fn mode(&self) -> TrackingMode {
        self.mode
    }

    /// Number of tracked effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all tracked effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracking context is gone, nothing can still be running
                break;
            }
        }
    }

    /// Wait for all tracked effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all
    /// effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("mode", &self.mode)
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    mode: TrackingMode,
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    /// Fresh context of the same mode, used for one step of a sequence
    fn child(&self) -> (Self, watch::Receiver<()>) {
        let (tx, rx) = watch::channel(());
        let tracking = Self {
            mode: self.mode,
            counter: Arc::new(AtomicUsize::new(0)),
            notifier: Arc::new(tx),
        };
        (tracking, rx)
    }

    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }

    fn is_idle(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == 0
    }
}

/// Internal: RAII guard that decrements the effect counter on drop
///
/// Keeps the counter honest even if the effect task panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Internal: decrements the store-wide pending counter on drop (shutdown tracking)
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicUsize, COMMANDS_TOTAL, DecrementGuard, Duration, EFFECTS_COUNT,
        EFFECTS_EXECUTED, Effect, EffectHandle, EffectTracking, Ordering, PendingGuard,
        REDUCER_DURATION, REJECTED_ACTIONS, Reducer, RwLock, StoreError, TrackingMode,
    };
    use tokio::sync::broadcast;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; the reducer runs under the write lock)
    /// 2. Reducer (state transitions)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// Actions are processed one at a time to completion, so the reducer
    /// never observes a half-applied transition. Effects run on spawned
    /// tasks and never block the next action.
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
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Every action produced by an effect is broadcast here before it is
        /// fed back, so observers can follow the feedback loop.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Send + Clone + std::fmt::Debug + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// The action broadcast buffers 16 actions; use
        /// [`Store::with_broadcast_capacity`] for slower observers.
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
        }

        /// Create a new Store with a custom action broadcast capacity
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Spawns the returned effects
        ///
        /// Returns after the reducer ran and the effects were started, not
        /// when they finished. The returned handle tracks the direct effects
        /// of this action.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.send_tracked(action, TrackingMode::Direct).await
        }

        /// Send an action and track its whole effect cascade
        ///
        /// Like [`Store::send`], but the handle also waits for effects
        /// returned by actions that this action's effects feed back.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        pub async fn send_cascading(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.send_tracked(action, TrackingMode::Cascading).await
        }

        /// Send an action and wait for a matching action from the feedback loop
        ///
        /// Subscribes to the action broadcast before sending, so a fast
        /// effect cannot slip its result past the subscription.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: no matching action before the timeout
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(
                                skipped,
                                "Action observer lagged, continuing to wait"
                            );
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

        /// Subscribe to every action produced by effects
        ///
        /// Actions sent directly through `send` are not broadcast.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let count = store.state(|s| s.cats.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Borrow the injected environment
        #[must_use]
        pub const fn environment(&self) -> &E {
            &self.environment
        }

        /// Number of effects still running across all handles
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Rejects new actions, then waits for running effects (such as
        /// background cache writes) to finish.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(25);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timed out");
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        async fn send_tracked(
            &self,
            action: A,
            mode: TrackingMode,
        ) -> Result<EffectHandle, StoreError> {
            let (handle, tracking) = EffectHandle::new(mode);
            self.dispatch(action, &tracking).await?;
            Ok(handle)
        }

        /// Run the reducer for one action and start its effects under `tracking`
        async fn dispatch(&self, action: A, tracking: &EffectTracking) -> Result<(), StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!(?action, "Rejected action: store is shutting down");
                metrics::counter!(REJECTED_ACTIONS).increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!(?action, "Processing action");
            metrics::counter!(COMMANDS_TOTAL).increment(1);

            let effects = {
                let mut state = self.state.write().await;

                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!(REDUCER_DURATION).record(start.elapsed().as_secs_f64());

                // Note: Precision loss acceptable for metrics (effect counts < 2^52)
                #[allow(clippy::cast_precision_loss)]
                metrics::histogram!(EFFECTS_COUNT).record(effects.len() as f64);

                effects
            };

            tracing::trace!("Executing {} effects", effects.len());
            for effect in effects {
                self.execute_effect(effect, tracking.clone());
            }

            Ok(())
        }

        /// Feed an effect-produced action back into the store
        async fn feed_back(&self, action: A, tracking: &EffectTracking) {
            let _ = self.action_broadcast.send(action.clone());

            let result = match tracking.mode {
                TrackingMode::Direct => self.send(action).await.map(|_| ()),
                TrackingMode::Cascading => self.dispatch(action, tracking).await,
            };

            if let Err(error) = result {
                tracing::debug!(%error, "Dropped feedback action");
            }
        }

        /// Execute an effect with tracking
        ///
        /// - `None`: No-op
        /// - `Future`: Runs the computation, feeds the resulting action back if `Some`
        /// - `Sequential`: Runs effects in order, each one (and under cascading
        ///   tracking, its feedback) finishing before the next starts
        ///
        /// Effect failures are the effect's own business: a panicking task is
        /// contained by tokio and the guards still release the counters.
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned into tasks
        fn execute_effect(&self, effect: Effect<A>, tracking: EffectTracking) {
            match effect {
                Effect::None => {
                    metrics::counter!(EFFECTS_EXECUTED, "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!(EFFECTS_EXECUTED, "type" => "future").increment(1);
                    tracking.increment();
                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = PendingGuard(Arc::clone(&self.pending_effects));

                    let store = self.clone();
                    let tracking = tracking.clone();

                    tokio::spawn(async move {
                        let _guard = DecrementGuard(tracking.clone());
                        let _pending_guard = pending_guard;

                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            store.feed_back(action, &tracking).await;
                        }
                    });
                },
                Effect::Sequential(effects) => {
                    metrics::counter!(EFFECTS_EXECUTED, "type" => "sequential").increment(1);
                    tracking.increment();
                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = PendingGuard(Arc::clone(&self.pending_effects));

                    let store = self.clone();
                    let tracking = tracking.clone();

                    tokio::spawn(async move {
                        let _guard = DecrementGuard(tracking.clone());
                        let _pending_guard = pending_guard;

                        for effect in effects {
                            let (step, mut step_done) = tracking.child();
                            store.execute_effect(effect, step.clone());

                            while !step.is_idle() {
                                if step_done.changed().await.is_err() {
                                    break;
                                }
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
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use catalog_core::{SmallVec, async_effect, smallvec};

    #[derive(Debug, Clone, Default)]
    struct TestState {
        value: i32,
        log: Vec<&'static str>,
    }

    #[derive(Debug, Clone)]
    enum TestAction {
        Increment,
        ProduceEffect,
        ProduceChain,
        ChainStep(&'static str),
        SlowNoop,
    }

    #[derive(Debug, Clone)]
    struct TestEnv;

    #[derive(Debug, Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    SmallVec::new()
                },
                TestAction::ProduceEffect => {
                    smallvec![async_effect! { Some(TestAction::Increment) }]
                },
                TestAction::ProduceChain => smallvec![Effect::chain(vec![
                    async_effect! {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Some(TestAction::ChainStep("first"))
                    },
                    async_effect! { Some(TestAction::ChainStep("second")) },
                ])],
                TestAction::ChainStep(label) => {
                    state.log.push(label);
                    SmallVec::new()
                },
                TestAction::SlowNoop => smallvec![async_effect! {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    None
                }],
            }
        }
    }

    fn store() -> Store<TestState, TestAction, TestEnv, TestReducer> {
        Store::new(TestState::default(), TestReducer, TestEnv)
    }

    #[tokio::test]
    async fn test_send_runs_reducer_synchronously() {
        let store = store();

        let _ = store.send(TestAction::Increment).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_future_effect_feeds_back() {
        let store = store();

        let mut handle = store.send(TestAction::ProduceEffect).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_sequential_effects_keep_order() {
        let store = store();

        let mut handle = store.send_cascading(TestAction::ProduceChain).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

        assert_eq!(store.state(|s| s.log.clone()).await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_completed_handle_does_not_block() {
        let mut handle = EffectHandle::completed();
        handle.wait_with_timeout(Duration::from_millis(10)).await.unwrap();
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_actions() {
        let store = store();

        store.shutdown(Duration::from_secs(1)).await.unwrap();

        match store.send(TestAction::Increment).await {
            Err(StoreError::ShutdownInProgress) => {},
            other => panic!("expected ShutdownInProgress, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_shutdown_times_out_on_slow_effect() {
        let store = store();
        let _ = store.send(TestAction::SlowNoop).await.unwrap();

        let result = store.shutdown(Duration::from_millis(30)).await;

        assert!(matches!(result, Err(StoreError::ShutdownTimeout(1))));
    }
}
