//! The todo watch table: which actions start which effects.

use crate::client::TodoClient;
use crate::types::TodoAction;
use saga_core::effect::Effect;
use saga_core::watch::WatchTable;
use std::sync::Arc;
use std::time::Duration;

/// Collaborators the todo effects need
#[derive(Clone)]
pub struct TodoEnvironment {
    /// Where fetched todos come from
    pub client: Arc<dyn TodoClient>,
    /// How long `AddDelayedTodo` waits before adding
    pub delay: Duration,
}

impl TodoEnvironment {
    /// Delay used by the demo application
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

    /// Creates an environment with the default delay
    #[must_use]
    pub fn new(client: Arc<dyn TodoClient>) -> Self {
        Self {
            client,
            delay: Self::DEFAULT_DELAY,
        }
    }

    /// Sets the delayed-add delay
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl std::fmt::Debug for TodoEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoEnvironment")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

/// Watch table for the todo store
///
/// | Trigger | Effect |
/// |---|---|
/// | `AddDelayedTodo { value }` | wait `env.delay`, then `AddTodo { value }` |
/// | `FetchTodos` | `client.fetch_todos()`, then `FetchTodosSucceeded` or `FetchTodosFailed` |
///
/// Both watches take every trigger: concurrent fetches race and the last
/// answer to arrive wins.
#[must_use]
pub fn todo_watches() -> WatchTable<TodoAction, TodoEnvironment> {
    WatchTable::<TodoAction, TodoEnvironment>::new()
        .take_every("add_delayed_todo", |action, env| match action {
            TodoAction::AddDelayedTodo { value } => Some(Effect::Delay {
                duration: env.delay,
                action: Box::new(TodoAction::AddTodo {
                    value: value.clone(),
                }),
            }),
            _ => None,
        })
        .take_every("fetch_todos", |action, env| {
            matches!(action, TodoAction::FetchTodos).then(|| {
                let client = Arc::clone(&env.client);
                Effect::future(async move {
                    let outcome = match client.fetch_todos().await {
                        Ok(todos) => {
                            tracing::info!(count = todos.len(), "Fetched todos");
                            TodoAction::FetchTodosSucceeded { todos }
                        },
                        Err(error) => {
                            tracing::warn!(%error, "Fetching todos failed");
                            TodoAction::FetchTodosFailed { error }
                        },
                    };
                    Ok(Some(outcome))
                })
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockTodoClient;
    use crate::reducer::TodoReducer;
    use crate::types::AppState;
    use saga_testing::{ReducerTest, assertions};

    fn env() -> TodoEnvironment {
        TodoEnvironment::new(Arc::new(MockTodoClient::succeeding(Vec::new())))
            .with_delay(Duration::from_millis(250))
    }

    #[test]
    fn delayed_add_waits_then_adds() {
        ReducerTest::new(TodoReducer::new())
            .with_watches(todo_watches(), env())
            .given_state(AppState::default())
            .when_action(TodoAction::AddDelayedTodo {
                value: "later".to_string(),
            })
            .then_state(|state| assert_eq!(state.count(), 0))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_delay_effect(
                    effects,
                    Duration::from_millis(250),
                    &TodoAction::AddTodo {
                        value: "later".to_string(),
                    },
                );
            })
            .run();
    }

    #[test]
    fn fetch_starts_a_future() {
        ReducerTest::new(TodoReducer::new())
            .with_watches(todo_watches(), env())
            .given_state(AppState::default())
            .when_action(TodoAction::FetchTodos)
            .then_state(|state| assert!(state.is_fetching))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn plain_actions_trigger_nothing() {
        ReducerTest::new(TodoReducer::new())
            .with_watches(todo_watches(), env())
            .given_state(AppState::default())
            .when_actions([
                TodoAction::AddTodo { value: "now".to_string() },
                TodoAction::ToggleTodo { index: 0 },
                TodoAction::End,
            ])
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }
}
