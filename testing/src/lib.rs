//! # Saga Store Testing
//!
//! Testing utilities and helpers for the saga-store architecture.
//!
//! This crate provides:
//! - Deterministic [`Clock`] implementations ([`ImmediateClock`], [`ManualClock`])
//! - A Given-When-Then harness for reducers and their watch tables
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use saga_testing::ImmediateClock;
//! use saga_runtime::{Store, StoreConfig};
//!
//! #[tokio::test]
//! async fn delayed_todo_lands() {
//!     let config = StoreConfig::default().with_clock(Arc::new(ImmediateClock));
//!     let store = Store::with_config(AppState::default(), TodoReducer::new(), todo_watches(), env, config);
//!
//!     store.dispatch(TodoAction::AddDelayedTodo { value: "x".into() });
//!     let todos = store.run_to_completion(|s| s.todos.clone()).await?;
//!     assert_eq!(todos.len(), 1);
//! }
//! ```

use saga_core::environment::Clock;

/// Given-When-Then harness for reducers
pub mod reducer_test;

/// Mock implementations of environment traits
pub mod mocks {
    use super::Clock;
    use saga_core::environment::Sleep;
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use std::time::Duration;
    use tokio::sync::oneshot;

    /// Clock whose waits complete immediately
    ///
    /// # Example
    ///
    /// ```
    /// use saga_testing::mocks::ImmediateClock;
    /// use saga_core::environment::Clock;
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// ImmediateClock.sleep(Duration::from_secs(3600)).await; // Returns at once
    /// # });
    /// ```
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ImmediateClock;

    impl Clock for ImmediateClock {
        fn sleep(&self, _duration: Duration) -> Sleep {
            Box::pin(std::future::ready(()))
        }
    }

    #[derive(Debug)]
    struct Sleeper {
        deadline: Duration,
        wake: oneshot::Sender<()>,
    }

    #[derive(Debug, Default)]
    struct ManualClockState {
        now: Duration,
        sleepers: Vec<Sleeper>,
    }

    /// Virtual clock advanced explicitly by the test
    ///
    /// Time starts at zero and only moves on [`ManualClock::advance`]. A
    /// sleep resolves once the clock has been advanced past its deadline.
    /// Clones share the same timeline.
    ///
    /// # Example
    ///
    /// ```
    /// use saga_testing::mocks::ManualClock;
    /// use saga_core::environment::Clock;
    /// use std::time::Duration;
    ///
    /// let clock = ManualClock::new();
    /// let mut sleep = tokio_test::task::spawn(clock.sleep(Duration::from_secs(1)));
    ///
    /// tokio_test::assert_pending!(sleep.poll());
    /// clock.advance(Duration::from_secs(1));
    /// tokio_test::assert_ready!(sleep.poll());
    /// ```
    #[derive(Debug, Clone, Default)]
    pub struct ManualClock {
        state: Arc<Mutex<ManualClockState>>,
    }

    impl ManualClock {
        /// Create a clock at time zero
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        fn state(&self) -> MutexGuard<'_, ManualClockState> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Move time forward, waking every sleep whose deadline has passed
        pub fn advance(&self, by: Duration) {
            let mut state = self.state();
            state.now += by;
            let now = state.now;

            let (due, waiting): (Vec<_>, Vec<_>) =
                state.sleepers.drain(..).partition(|s| s.deadline <= now);
            state.sleepers = waiting;

            for sleeper in due {
                // The sleep future may already be gone
                let _ = sleeper.wake.send(());
            }
        }

        /// Time elapsed since the clock was created
        #[must_use]
        pub fn elapsed(&self) -> Duration {
            self.state().now
        }

        /// Number of sleeps still waiting on this clock
        #[must_use]
        pub fn pending_sleepers(&self) -> usize {
            self.state()
                .sleepers
                .iter()
                .filter(|s| !s.wake.is_closed())
                .count()
        }

        /// Yield to the runtime until at least `count` sleeps are waiting
        ///
        /// Useful to make sure spawned effect tasks reached their timer
        /// before advancing the clock.
        pub async fn wait_for_sleepers(&self, count: usize) {
            while self.pending_sleepers() < count {
                tokio::task::yield_now().await;
            }
        }
    }

    impl Clock for ManualClock {
        fn sleep(&self, duration: Duration) -> Sleep {
            let (wake, woken) = oneshot::channel();
            {
                let mut state = self.state();
                if duration.is_zero() {
                    let _ = wake.send(());
                } else {
                    let deadline = state.now + duration;
                    state.sleepers.push(Sleeper { deadline, wake });
                }
            }

            Box::pin(async move {
                let _ = woken.await;
            })
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    /// Install a `tracing` subscriber that writes through the test harness
    ///
    /// Honours `RUST_LOG`. Safe to call from every test; only the first call
    /// installs the subscriber.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use helpers::init_test_tracing;
pub use mocks::{ImmediateClock, ManualClock};
pub use reducer_test::{ReducerTest, assertions};
