//! Read-only views of [`AppState`], for subscribers and drain selectors.
//!
//! ```
//! use todo::{AppState, selectors};
//!
//! let state = AppState::default();
//! assert!(selectors::select_todos(&state).is_empty());
//! assert!(!selectors::select_is_fetching(&state));
//! assert_eq!(selectors::select_fetch_error(&state), None);
//! ```

use crate::client::FetchError;
use crate::types::{AppState, Todo};

/// The current todo list
#[must_use]
pub fn select_todos(state: &AppState) -> &[Todo] {
    &state.todos
}

/// Whether a fetch is outstanding
#[must_use]
pub const fn select_is_fetching(state: &AppState) -> bool {
    state.is_fetching
}

/// Error of the last failed fetch, if any
#[must_use]
pub const fn select_fetch_error(state: &AppState) -> Option<&FetchError> {
    state.fetch_error.as_ref()
}
