//! The todo server collaborator.
//!
//! Effects reach the server only through [`TodoClient`], so tests can swap
//! in [`MockTodoClient`](crate::mocks::MockTodoClient) and the demo can use
//! [`SimulatedServer`].

use crate::types::Todo;
use saga_core::environment::Clock;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a todo fetch failed
///
/// Lives in [`AppState`](crate::AppState), so it is cheap to clone and
/// comparable.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchError {
    /// The server could not be reached
    #[error("todo server unavailable: {0}")]
    Unavailable(String),

    /// The server answered with something that is not a todo list
    #[error("malformed todo list: {0}")]
    Malformed(String),
}

/// Source of the remote todo list
pub trait TodoClient: Send + Sync {
    /// Fetch the server's todo list
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the server is unreachable or its answer
    /// cannot be understood.
    fn fetch_todos(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Todo>, FetchError>> + Send + '_>>;
}

/// In-process stand-in for the todo server
///
/// Answers every fetch with a fixed seed list after `latency` has elapsed on
/// the injected clock.
#[derive(Debug, Clone)]
pub struct SimulatedServer {
    clock: Arc<dyn Clock>,
    latency: Duration,
}

impl SimulatedServer {
    /// Latency of the real demo server
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(1000);

    /// Creates a server answering after `latency`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, latency: Duration) -> Self {
        Self { clock, latency }
    }

    /// The list every fetch returns
    #[must_use]
    pub fn seed_todos() -> Vec<Todo> {
        vec![Todo::new("Be a llama"), Todo::completed("Kick a donkey")]
    }
}

impl TodoClient for SimulatedServer {
    fn fetch_todos(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Todo>, FetchError>> + Send + '_>> {
        Box::pin(async move {
            tracing::debug!(latency = ?self.latency, "Simulated server handling fetch");
            self.clock.sleep(self.latency).await;
            Ok(Self::seed_todos())
        })
    }
}
