//! # Saga Store Core
//!
//! Core traits and types for the saga-store architecture.
//!
//! This crate provides the fundamental abstractions for building a state
//! container whose side effects are orchestrated by watching the action
//! stream, rather than by the reducer itself.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state owned by a store
//! - **Action**: Tagged inputs, including the terminal `End` signal
//! - **Reducer**: Pure function `(State, Action) → State`
//! - **Effect**: Description of asynchronous work (not its execution)
//! - **Watch table**: Static mapping from trigger actions to effect factories
//! - **Clock**: Injected timer collaborator
//!
//! ## Architecture Principles
//!
//! - The reducer is the only thing that ever produces new state
//! - Effects are values; the runtime decides when and where they run
//! - Every effect feeds back into the store through ordinary actions
//!
//! ## Example
//!
//! ```ignore
//! use saga_core::{action::Action, reducer::Reducer, watch::WatchTable};
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//!     IncrementLater,
//!     End,
//! }
//!
//! impl Reducer for CounterReducer {
//!     type State = i64;
//!     type Action = CounterAction;
//!
//!     fn reduce(&self, state: i64, action: &CounterAction) -> i64 {
//!         match action {
//!             CounterAction::Increment => state + 1,
//!             _ => state,
//!         }
//!     }
//! }
//!
//! let watches = WatchTable::<CounterAction, ()>::new().take_every("increment_later", |action, _env| {
//!     matches!(action, CounterAction::IncrementLater).then(|| Effect::Delay {
//!         duration: Duration::from_millis(10),
//!         action: Box::new(CounterAction::Increment),
//!     })
//! });
//! ```

// Re-export commonly used types
pub use smallvec::SmallVec;

/// Watch tables mapping trigger actions to effect factories
pub mod watch;

/// Action module - The tagged inputs a store accepts
///
/// Actions unify user intents ("add this todo"), effect triggers
/// ("fetch todos") and effect results ("todos fetched"). Every action type
/// also carries the terminal `End` signal used by the drain protocol.
pub mod action {
    /// Behaviour every action type must provide to the runtime
    ///
    /// # Example
    ///
    /// ```
    /// use saga_core::action::Action;
    ///
    /// #[derive(Clone, Debug, PartialEq)]
    /// enum PingAction {
    ///     Ping,
    ///     End,
    /// }
    ///
    /// impl Action for PingAction {
    ///     fn end() -> Self {
    ///         Self::End
    ///     }
    ///
    ///     fn is_end(&self) -> bool {
    ///         matches!(self, Self::End)
    ///     }
    ///
    ///     fn name(&self) -> &'static str {
    ///         match self {
    ///             Self::Ping => "Ping",
    ///             Self::End => "End",
    ///         }
    ///     }
    /// }
    ///
    /// assert!(PingAction::end().is_end());
    /// assert!(!PingAction::Ping.is_end());
    /// ```
    pub trait Action: Clone + std::fmt::Debug + Send + 'static {
        /// The terminal action that stops the effect supervisor
        fn end() -> Self;

        /// Whether this action is the terminal `End` signal
        fn is_end(&self) -> bool;

        /// Stable variant name, used for logging and metrics labels
        fn name(&self) -> &'static str;
    }
}

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action) → State`.
///
/// They never perform I/O and never spawn work. Asynchronous consequences
/// of an action are declared separately in a [`watch::WatchTable`].
pub mod reducer {
    /// The Reducer trait - sole producer of new state
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    ///
    /// # Contract
    ///
    /// - Total: every action yields a state; unknown actions return the input
    /// - Deterministic: the same inputs always produce the same output
    /// - Must not panic
    ///
    /// # Example
    ///
    /// ```
    /// use saga_core::reducer::Reducer;
    ///
    /// struct Sum;
    ///
    /// impl Reducer for Sum {
    ///     type State = i64;
    ///     type Action = i64;
    ///
    ///     fn reduce(&self, state: i64, action: &i64) -> i64 {
    ///         state.saturating_add(*action)
    ///     }
    /// }
    ///
    /// assert_eq!(Sum.reduce(40, &2), 42);
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// Produce the next state from the current state and an action
        ///
        /// The previous state is consumed; the store hands the reducer its own
        /// copy, so snapshots held by readers are never observed changing.
        fn reduce(&self, state: Self::State, action: &Self::Action) -> Self::State;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe asynchronous work to be performed by the runtime.
/// They are values (not execution): a watch-table factory builds them, the
/// store's supervisor spawns them, and whatever action they yield is
/// dispatched back into the same store.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;
    use thiserror::Error;

    /// Future driven by [`Effect::Future`]
    ///
    /// Resolves to the follow-up action to dispatch (if any), or to an
    /// [`EffectError`] when the work failed in a way the effect has no
    /// failure action for.
    pub type EffectFuture<Action> =
        Pin<Box<dyn Future<Output = Result<Option<Action>, EffectError>> + Send>>;

    /// Failure of an effect task that has no mapped failure action
    ///
    /// Collaborator failures an effect knows how to report (a failed fetch,
    /// say) must be turned into actions instead. An `EffectError` reaching
    /// the runtime is treated as a defect in the effect itself.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    #[error("effect `{effect}` failed: {message}")]
    pub struct EffectError {
        /// Name of the effect that failed
        pub effect: String,
        /// Human readable cause
        pub message: String,
    }

    impl EffectError {
        /// Create an effect error
        #[must_use]
        pub fn new(effect: impl Into<String>, message: impl Into<String>) -> Self {
            Self {
                effect: effect.into(),
                message: message.into(),
            }
        }
    }

    /// Effect type - describes asynchronous work to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects concurrently; the task settles when all of them have
        Parallel(Vec<Effect<Action>>),

        /// Wait on the store's clock, then dispatch the action
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after the delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// `Ok(Some(action))` is fed back into the store, `Ok(None)` ends the
        /// task quietly, `Err` is recorded as an effect defect.
        Future(EffectFuture<Action>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async block as an [`Effect::Future`]
        pub fn future<F>(future: F) -> Self
        where
            F: Future<Output = Result<Option<Action>, EffectError>> + Send + 'static,
        {
            Effect::Future(Box::pin(future))
        }

        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Whether this effect does nothing when executed
        #[must_use]
        pub fn is_none(&self) -> bool {
            match self {
                Effect::None => true,
                Effect::Parallel(effects) => effects.iter().all(Effect::is_none),
                Effect::Delay { .. } | Effect::Future(_) => false,
            }
        }
    }
}

/// Environment module - Injected collaborators
///
/// External collaborators are abstracted behind traits so tests can swap in
/// deterministic implementations.
pub mod environment {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Future returned by [`Clock::sleep`]
    pub type Sleep = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

    /// Clock trait - abstracts timer waits for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - real timers
    /// let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    ///
    /// // Test - every wait resolves immediately
    /// let clock: Arc<dyn Clock> = Arc::new(ImmediateClock);
    /// ```
    pub trait Clock: Send + Sync + std::fmt::Debug {
        /// Resolve after `duration` has elapsed on this clock
        fn sleep(&self, duration: Duration) -> Sleep;
    }

    /// Wall-clock timer backed by tokio
    ///
    /// Honours tokio's paused test time, so `#[tokio::test(start_paused = true)]`
    /// drives it virtually.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn sleep(&self, duration: Duration) -> Sleep {
            Box::pin(tokio::time::sleep(duration))
        }
    }
}
