//! Domain types for the todo list.
//!
//! Todos have no identity beyond their position in the list; `ToggleTodo`
//! addresses them by index.

use crate::client::FetchError;
use saga_core::action::Action;
use serde::{Deserialize, Serialize};

/// A single todo item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// What needs doing
    pub text: String,
    /// Whether it has been done
    pub completed: bool,
}

impl Todo {
    /// Creates an open todo
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
        }
    }

    /// Creates a todo that is already done
    #[must_use]
    pub fn completed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: true,
        }
    }
}

/// State of the todo application
///
/// Owned by the store; only ever replaced by [`TodoReducer`](crate::TodoReducer).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    /// All todos, in insertion order
    pub todos: Vec<Todo>,
    /// A server fetch has been requested and not yet answered
    pub is_fetching: bool,
    /// Outcome of the last failed fetch, cleared by the next request
    pub fetch_error: Option<FetchError>,
}

impl AppState {
    /// Returns the number of todos
    #[must_use]
    pub fn count(&self) -> usize {
        self.todos.len()
    }

    /// Returns the number of completed todos
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.todos.iter().filter(|t| t.completed).count()
    }
}

/// Everything the todo store can be asked to do
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TodoAction {
    /// Append an open todo
    AddTodo {
        /// Text of the new todo
        value: String,
    },

    /// Flip the `completed` flag of the todo at `index`
    ToggleTodo {
        /// Position in the list
        index: usize,
    },

    /// Append an open todo after the configured delay
    AddDelayedTodo {
        /// Text of the new todo
        value: String,
    },

    /// Ask the server for its todo list
    FetchTodos,

    /// The server answered with a list
    FetchTodosSucceeded {
        /// Replacement list
        todos: Vec<Todo>,
    },

    /// The server could not be reached or answered nonsense
    FetchTodosFailed {
        /// Why the fetch failed
        error: FetchError,
    },

    /// Stop watching for effect triggers
    End,
}

impl Action for TodoAction {
    fn end() -> Self {
        Self::End
    }

    fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    fn name(&self) -> &'static str {
        match self {
            Self::AddTodo { .. } => "AddTodo",
            Self::ToggleTodo { .. } => "ToggleTodo",
            Self::AddDelayedTodo { .. } => "AddDelayedTodo",
            Self::FetchTodos => "FetchTodos",
            Self::FetchTodosSucceeded { .. } => "FetchTodosSucceeded",
            Self::FetchTodosFailed { .. } => "FetchTodosFailed",
            Self::End => "End",
        }
    }
}
