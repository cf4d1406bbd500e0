//! Todo list whose side effects are run by a supervised watch table.
//!
//! This crate shows how to build an application on saga-store:
//!
//! - Pure reducer for adding and toggling todos and tracking a fetch
//! - Watch table turning `AddDelayedTodo` and `FetchTodos` into effects
//! - A swappable server collaborator ([`TodoClient`])
//! - Draining the store to read the final state in tests
//!
//! # Quick Start
//!
//! ```no_run
//! use todo::{SimulatedServer, TodoAction, TodoEnvironment, configure_store};
//! use saga_core::environment::SystemClock;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = SimulatedServer::new(Arc::new(SystemClock), Duration::from_millis(1000));
//! let store = configure_store(TodoEnvironment::new(Arc::new(server)));
//!
//! store.dispatch(TodoAction::AddTodo { value: "Buy milk".to_string() });
//! store.dispatch(TodoAction::ToggleTodo { index: 0 });
//! store.dispatch(TodoAction::FetchTodos);
//!
//! // Waits for the fetch to land, then reads the list
//! let todos = store.run_to_completion(|s| s.todos.clone()).await?;
//! println!("Fetched {} todos", todos.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod effects;
pub mod mocks;
pub mod reducer;
pub mod selectors;
pub mod types;

use saga_core::environment::Clock;
use saga_runtime::{Store, StoreConfig};
use std::sync::Arc;

// Re-export commonly used types
pub use client::{FetchError, SimulatedServer, TodoClient};
pub use config::TodoConfig;
pub use effects::{TodoEnvironment, todo_watches};
pub use reducer::TodoReducer;
pub use types::{AppState, Todo, TodoAction};

/// Store type for the todo application
pub type TodoStore = Store<AppState, TodoAction, TodoEnvironment, TodoReducer>;

/// Create a fresh todo store with default runtime settings
///
/// Every call yields an independent store with its own supervisor.
#[must_use]
pub fn configure_store(env: TodoEnvironment) -> TodoStore {
    configure_store_with(env, StoreConfig::default())
}

/// Create a fresh todo store with custom runtime settings
#[must_use]
pub fn configure_store_with(env: TodoEnvironment, config: StoreConfig) -> TodoStore {
    Store::with_config(
        AppState::default(),
        TodoReducer::new(),
        todo_watches(),
        env,
        config,
    )
}

/// Environment backed by [`SimulatedServer`], timed by `clock`
#[must_use]
pub fn simulated_environment(config: &TodoConfig, clock: Arc<dyn Clock>) -> TodoEnvironment {
    let server = SimulatedServer::new(clock, config.server_latency);
    TodoEnvironment::new(Arc::new(server)).with_delay(config.delay)
}
