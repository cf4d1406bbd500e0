//! Mock collaborators for tests.

use crate::client::{FetchError, TodoClient};
use crate::types::Todo;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Scripted [`TodoClient`]
///
/// Every fetch resolves to the same outcome. With a gate attached, fetches
/// park until the test notifies it, which lets tests hold fetches in flight.
/// [`MockTodoClient::parked`] tells how many are currently held, so a test
/// can release them all at once with [`Notify::notify_waiters`].
///
/// # Example
///
/// ```
/// use todo::mocks::MockTodoClient;
/// use todo::{FetchError, TodoClient};
///
/// # tokio_test::block_on(async {
/// let client = MockTodoClient::failing(FetchError::Unavailable("offline".into()));
/// assert!(client.fetch_todos().await.is_err());
/// assert_eq!(client.calls(), 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockTodoClient {
    outcome: Result<Vec<Todo>, FetchError>,
    gate: Option<Arc<Notify>>,
    calls: Arc<AtomicUsize>,
    parked: Arc<AtomicUsize>,
}

impl MockTodoClient {
    /// Client whose fetches succeed with `todos`
    #[must_use]
    pub fn succeeding(todos: Vec<Todo>) -> Self {
        Self {
            outcome: Ok(todos),
            gate: None,
            calls: Arc::new(AtomicUsize::new(0)),
            parked: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Client whose fetches fail with `error`
    #[must_use]
    pub fn failing(error: FetchError) -> Self {
        Self {
            outcome: Err(error),
            gate: None,
            calls: Arc::new(AtomicUsize::new(0)),
            parked: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Hold every fetch until `gate` is notified
    #[must_use]
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of fetches started so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of fetches currently waiting on the gate
    #[must_use]
    pub fn parked(&self) -> usize {
        self.parked.load(Ordering::SeqCst)
    }
}

impl TodoClient for MockTodoClient {
    fn fetch_todos(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Todo>, FetchError>> + Send + '_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if let Some(gate) = &self.gate {
                let notified = gate.notified();
                tokio::pin!(notified);
                // Register as a waiter before reporting as parked
                notified.as_mut().enable();
                self.parked.fetch_add(1, Ordering::SeqCst);
                notified.await;
                self.parked.fetch_sub(1, Ordering::SeqCst);
            }
            self.outcome.clone()
        })
    }
}
