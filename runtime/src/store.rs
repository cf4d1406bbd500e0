//! Store runtime for coordinating reducer execution and effect supervision.

use crate::supervisor::{EffectFailure, SettleGuard, Supervisor, SupervisorPhase};
use crate::{StoreConfig, lock};
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use saga_core::action::Action;
use saga_core::effect::{Effect, EffectError};
use saga_core::environment::Clock;
use saga_core::reducer::Reducer;
use saga_core::watch::{Matched, WatchTable};
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;

/// Listener registered with [`Store::subscribe`]
type Listener<S, A> = Arc<dyn Fn(&S, &A) + Send + Sync>;

/// Handle returned by [`Store::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Serializes dispatches: one caller applies, the rest enqueue
struct DispatchQueue<A> {
    busy: bool,
    pending: VecDeque<A>,
}

struct Inner<S, A, E, R> {
    state: RwLock<Arc<S>>,
    reducer: R,
    environment: E,
    supervisor: Arc<Supervisor<A, E>>,
    queue: Mutex<DispatchQueue<A>>,
    listeners: Mutex<Vec<(SubscriptionId, Listener<S, A>)>>,
    next_subscription: AtomicU64,
    action_broadcast: broadcast::Sender<A>,
    clock: Arc<dyn Clock>,
}

/// The Store - holds state and supervises effects for one reducer
///
/// The Store manages:
/// 1. State (an immutable `Arc` snapshot, replaced on every dispatch)
/// 2. Reducer (pure business logic)
/// 3. Watch table and environment (which effects run, with what collaborators)
/// 4. Effect tasks (spawned on tokio, feeding actions back into `dispatch`)
///
/// Cloning a Store is cheap and yields another handle to the same instance.
/// Each call to [`Store::new`] produces an isolated instance with its own
/// supervisor.
///
/// # Type Parameters
///
/// - `S`: State type
/// - `A`: Action type
/// - `E`: Environment type handed to watch-table factories
/// - `R`: Reducer implementation
///
/// # Example
///
/// ```ignore
/// let store = Store::new(AppState::default(), TodoReducer::new(), todo_watches(), env);
///
/// store.dispatch(TodoAction::AddTodo { value: "Buy milk".into() });
/// assert_eq!(store.state(|s| s.todos.len()), 1);
/// ```
pub struct Store<S, A, E, R>
where
    A: Action,
{
    inner: Arc<Inner<S, A, E, R>>,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A> + Send + Sync + 'static,
    A: Action,
    S: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create a new store with the default [`StoreConfig`]
    ///
    /// # Arguments
    ///
    /// - `initial_state`: The starting state for the store
    /// - `reducer`: The reducer implementation (business logic)
    /// - `watches`: The watch table the supervisor matches actions against
    /// - `environment`: Collaborators handed to watch-table factories
    #[must_use]
    pub fn new(initial_state: S, reducer: R, watches: WatchTable<A, E>, environment: E) -> Self {
        Self::with_config(initial_state, reducer, watches, environment, StoreConfig::default())
    }

    /// Create a new store with custom configuration
    #[must_use]
    pub fn with_config(
        initial_state: S,
        reducer: R,
        watches: WatchTable<A, E>,
        environment: E,
        config: StoreConfig,
    ) -> Self {
        let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(Arc::new(initial_state)),
                reducer,
                environment,
                supervisor: Arc::new(Supervisor::new(watches, config.end_policy)),
                queue: Mutex::new(DispatchQueue {
                    busy: false,
                    pending: VecDeque::new(),
                }),
                listeners: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
                action_broadcast,
                clock: config.clock,
            }),
        }
    }

    /// Dispatch an action to the store
    ///
    /// 1. Runs the reducer and replaces the state snapshot
    /// 2. Notifies the supervisor, which spawns any matching effect tasks
    /// 3. Notifies subscribers and action observers
    ///
    /// All of this happens before `dispatch` returns, unless another
    /// dispatch is already in progress on this store: a listener that
    /// dispatches, or a concurrent caller, has its action queued and applied
    /// by the in-progress dispatch in arrival order once the current
    /// notification round completes. The reducer therefore sees actions
    /// strictly in the order they were dispatched, and never re-entrantly.
    #[tracing::instrument(skip_all, name = "store_dispatch", fields(action = action.name()))]
    pub fn dispatch(&self, action: A) {
        {
            let mut queue = lock(&self.inner.queue);
            queue.pending.push_back(action);
            if queue.busy {
                tracing::trace!("Dispatch in progress, action queued");
                return;
            }
            queue.busy = true;
        }

        let _reset = BusyReset(&self.inner.queue);
        loop {
            let next = {
                let mut queue = lock(&self.inner.queue);
                match queue.pending.pop_front() {
                    Some(action) => action,
                    None => {
                        queue.busy = false;
                        break;
                    },
                }
            };
            self.apply(next);
        }
    }

    /// Current state snapshot
    ///
    /// The snapshot never changes; later dispatches replace the store's
    /// snapshot rather than mutate this one.
    #[must_use]
    pub fn get_state(&self) -> Arc<S> {
        let state = self
            .inner
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(&state)
    }

    /// Read current state via a closure
    ///
    /// ```ignore
    /// let todo_count = store.state(|s| s.todos.len());
    /// ```
    pub fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        f(&self.get_state())
    }

    /// Register a listener called after every applied action
    ///
    /// Listeners run synchronously inside `dispatch`, after the supervisor,
    /// with the new state and the action that produced it. Dispatching from
    /// a listener is allowed; the action is queued (see [`Store::dispatch`]).
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&S, &A) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.listeners).push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = lock(&self.inner.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Subscribe to every applied action
    ///
    /// Returns a broadcast receiver that gets a clone of each action after
    /// it has been reduced. Slow receivers observe
    /// [`RecvError::Lagged`](broadcast::error::RecvError::Lagged).
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.inner.action_broadcast.subscribe()
    }

    /// Current supervisor phase
    #[must_use]
    pub fn phase(&self) -> SupervisorPhase {
        self.inner.supervisor.phase()
    }

    /// Number of effect tasks spawned and not yet settled
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.supervisor.in_flight()
    }

    /// Effect tasks that failed without a mapped failure action so far
    #[must_use]
    pub fn failures(&self) -> Vec<EffectFailure> {
        self.inner.supervisor.failures()
    }

    pub(crate) fn subscribe_phase(&self) -> tokio::sync::watch::Receiver<SupervisorPhase> {
        self.inner.supervisor.subscribe_phase()
    }

    /// Reduce one action and run every notification for it
    fn apply(&self, action: A) {
        tracing::debug!(action = action.name(), "Applying action");
        metrics::counter!("store.actions.total").increment(1);

        let next = {
            let current = self.get_state();
            let span = tracing::debug_span!("reducer_execution");
            let _enter = span.enter();
            Arc::new(self.inner.reducer.reduce(S::clone(&current), &action))
        };
        {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *state = Arc::clone(&next);
        }

        for matched in self.inner.supervisor.observe(&action, &self.inner.environment) {
            self.spawn_effect(matched);
        }

        let listeners: Vec<Listener<S, A>> = lock(&self.inner.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&next, &action);
        }

        // No receivers is fine
        let _ = self.inner.action_broadcast.send(action);
    }

    /// Spawn one supervised task for a matched watch
    fn spawn_effect(&self, matched: Matched<A>) {
        let Matched {
            index, name, effect, ..
        } = matched;
        let guard = SettleGuard::new(Arc::clone(&self.inner.supervisor), index);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.inner.supervisor.record_failure(EffectFailure {
                watch: name,
                reason: "no tokio runtime available to spawn the effect task".to_string(),
            });
            return;
        };

        metrics::counter!("store.effects.spawned", "watch" => name).increment(1);
        tracing::debug!(watch = name, "Spawning effect task");

        let store = self.clone();
        let cancel = self.inner.supervisor.cancellation();
        runtime.spawn(async move {
            let _guard = guard;
            let run = AssertUnwindSafe(store.run_effect(effect)).catch_unwind();

            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!(watch = name, "Effect task cancelled");
                    metrics::counter!("store.effects.cancelled", "watch" => name).increment(1);
                },
                outcome = run => match outcome {
                    Ok(Ok(())) => tracing::trace!(watch = name, "Effect task settled"),
                    Ok(Err(error)) => store.inner.supervisor.record_failure(EffectFailure {
                        watch: name,
                        reason: error.to_string(),
                    }),
                    Err(payload) => store.inner.supervisor.record_failure(EffectFailure {
                        watch: name,
                        reason: format!("panicked: {}", panic_message(payload.as_ref())),
                    }),
                },
            }
        });
    }

    /// Execute an effect, dispatching whatever actions it yields
    fn run_effect(&self, effect: Effect<A>) -> BoxFuture<'static, Result<(), EffectError>> {
        let store = self.clone();
        Box::pin(async move {
            match effect {
                Effect::None => Ok(()),
                Effect::Delay { duration, action } => {
                    tracing::trace!(?duration, "Effect::Delay waiting");
                    store.inner.clock.sleep(duration).await;
                    store.dispatch(*action);
                    Ok(())
                },
                Effect::Future(fut) => {
                    if let Some(action) = fut.await? {
                        tracing::trace!(action = action.name(), "Effect::Future produced an action");
                        store.dispatch(action);
                    }
                    Ok(())
                },
                Effect::Parallel(effects) => {
                    let results =
                        join_all(effects.into_iter().map(|effect| store.run_effect(effect))).await;
                    results.into_iter().collect()
                },
            }
        })
    }
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    A: Action,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A, E, R> std::fmt::Debug for Store<S, A, E, R>
where
    A: Action,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("phase", &self.inner.supervisor.phase())
            .field("in_flight", &self.inner.supervisor.in_flight())
            .finish_non_exhaustive()
    }
}

/// Releases the dispatch queue if a reducer or listener panics mid-dispatch
///
/// Actions still queued behind the panicking one are dropped and logged;
/// nothing applies them once the dispatching caller has unwound. On the
/// normal path the loop clears `busy` itself while holding the lock.
struct BusyReset<'a, A: Action>(&'a Mutex<DispatchQueue<A>>);

impl<A: Action> Drop for BusyReset<'_, A> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut queue = lock(self.0);
            queue.busy = false;
            for action in queue.pending.drain(..) {
                tracing::error!(
                    action = action.name(),
                    "Dispatch panicked, queued action dropped"
                );
                metrics::counter!("store.actions.dropped").increment(1);
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
