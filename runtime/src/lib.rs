//! # Saga Store Runtime
//!
//! Runtime implementation for the saga-store architecture.
//!
//! This crate provides the [`Store`] that owns state, applies the reducer,
//! supervises effect tasks spawned from its watch table, and offers the
//! drain protocol used to wait for every effect to settle.
//!
//! ## Core Components
//!
//! - **Store**: Holds the current state snapshot and serializes dispatches
//! - **Supervisor**: Matches dispatched actions against the watch table and
//!   spawns one independent task per match
//! - **Drain**: `End` → wait for in-flight tasks → read final state
//!
//! ## Example
//!
//! ```ignore
//! use saga_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, my_watches(), environment);
//!
//! // Dispatch synchronously; the reducer has run when this returns
//! store.dispatch(Action::DoSomething);
//!
//! // Wait for every effect to finish, then select from final state
//! let value = store.run_to_completion(|s| s.some_field).await?;
//! ```

/// Drain protocol: wait for effects to settle, then read state
mod drain;

/// Effect supervision: watch-table matching and task bookkeeping
pub mod supervisor;

/// The Store
pub mod store;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// One or more effect tasks failed without a mapped failure action
        ///
        /// Reported by the drain; the failures were already logged when
        /// they happened and did not stop other tasks.
        #[error("{count} effect task(s) failed; first failure: {first}")]
        EffectFailed {
            /// Number of recorded failures
            count: usize,
            /// Description of the earliest failure
            first: String,
        },

        /// Timeout waiting for effects to settle
        ///
        /// Returned by `run_to_completion_within` when the deadline passes
        /// before the supervisor is drained.
        #[error("Timeout waiting for effects to settle")]
        Timeout,

        /// The supervisor's completion signal went away before draining
        #[error("Supervisor completion signal closed before draining")]
        CompletionSignalLost,
    }
}

/// What the supervisor does with in-flight tasks when it observes `End`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndPolicy {
    /// Let in-flight tasks finish and dispatch their results
    #[default]
    Drain,

    /// Cooperatively cancel in-flight tasks; cancelled tasks dispatch nothing
    CancelInFlight,
}

/// Store configuration
///
/// # Example
///
/// ```ignore
/// let config = StoreConfig::default()
///     .with_end_policy(EndPolicy::CancelInFlight)
///     .with_clock(Arc::new(ImmediateClock));
///
/// let store = Store::with_config(state, reducer, watches, env, config);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity of the action broadcast channel
    pub broadcast_capacity: usize,
    /// Policy applied to in-flight tasks on `End`
    pub end_policy: EndPolicy,
    /// Timer used by [`Effect::Delay`](saga_core::effect::Effect::Delay)
    pub clock: std::sync::Arc<dyn saga_core::environment::Clock>,
}

impl StoreConfig {
    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the end policy
    #[must_use]
    pub const fn with_end_policy(mut self, policy: EndPolicy) -> Self {
        self.end_policy = policy;
        self
    }

    /// Set the clock used for delays
    #[must_use]
    pub fn with_clock(mut self, clock: std::sync::Arc<dyn saga_core::environment::Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            end_policy: EndPolicy::Drain,
            clock: std::sync::Arc::new(saga_core::environment::SystemClock),
        }
    }
}

/// Lock a mutex, recovering the data if a panicking thread poisoned it
///
/// Every critical section in this crate leaves its data consistent before
/// running user code, so a poisoned lock carries no torn state.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// Re-export for convenience
pub use error::StoreError;
pub use store::{Store, SubscriptionId};
pub use supervisor::{EffectFailure, SupervisorPhase};
