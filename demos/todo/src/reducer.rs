//! Reducer logic for the todo list.
//!
//! Pure: every asynchronous consequence of an action lives in
//! [`todo_watches`](crate::effects::todo_watches), never here.

use crate::types::{AppState, Todo, TodoAction};
use saga_core::reducer::Reducer;

/// Reducer for the todo application
#[derive(Clone, Debug, Default)]
pub struct TodoReducer;

impl TodoReducer {
    /// Creates a new `TodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn toggle(mut state: AppState, index: usize) -> AppState {
        let len = state.todos.len();
        match state.todos.get_mut(index) {
            Some(todo) => todo.completed = !todo.completed,
            None => {
                tracing::warn!(index, len, "ToggleTodo index out of range, ignored");
            },
        }
        state
    }
}

impl Reducer for TodoReducer {
    type State = AppState;
    type Action = TodoAction;

    fn reduce(&self, mut state: AppState, action: &TodoAction) -> AppState {
        match action {
            TodoAction::AddTodo { value } => {
                state.todos.push(Todo::new(value.clone()));
                state
            },
            TodoAction::ToggleTodo { index } => Self::toggle(state, *index),
            TodoAction::FetchTodos => {
                state.is_fetching = true;
                state.fetch_error = None;
                state
            },
            TodoAction::FetchTodosSucceeded { todos } => {
                state.todos.clone_from(todos);
                state.is_fetching = false;
                state.fetch_error = None;
                state
            },
            TodoAction::FetchTodosFailed { error } => {
                state.is_fetching = false;
                state.fetch_error = Some(error.clone());
                state
            },
            // Effect triggers and the terminal signal leave state alone
            TodoAction::AddDelayedTodo { .. } | TodoAction::End => state,
        }
    }
}
