//! Command-line walk through the todo flows.
//!
//! Fetches the seed list from the simulated server, adds and toggles a todo,
//! schedules a delayed add, then drains the store and prints the final state
//! as JSON.
//!
//! `RUST_LOG` controls logging (default `info`); `TODO_DELAY_MS` and
//! `TODO_SERVER_LATENCY_MS` override the timings.

use anyhow::Context;
use saga_core::environment::SystemClock;
use std::sync::Arc;
use todo::{TodoAction, TodoConfig, configure_store, selectors, simulated_environment};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = TodoConfig::from_env();
    tracing::info!(?config, "Starting todo demo");

    let store = configure_store(simulated_environment(&config, Arc::new(SystemClock)));
    store.subscribe(|state, action| {
        tracing::info!(
            action = %serde_json::to_string(action).unwrap_or_default(),
            todos = state.count(),
            completed = state.completed_count(),
            "State updated"
        );
    });

    // Fetch first: the answer replaces the whole list
    let mut actions = store.subscribe_actions();
    store.dispatch(TodoAction::FetchTodos);
    loop {
        match actions.recv().await.context("action stream closed before the fetch finished")? {
            TodoAction::FetchTodosSucceeded { .. } | TodoAction::FetchTodosFailed { .. } => break,
            _ => {},
        }
    }
    if let Some(error) = store.state(|s| selectors::select_fetch_error(s).cloned()) {
        tracing::warn!(%error, "Continuing without the server list");
    }

    store.dispatch(TodoAction::AddTodo {
        value: "Buy milk".to_string(),
    });
    let last = store.state(|s| s.count()).saturating_sub(1);
    store.dispatch(TodoAction::ToggleTodo { index: last });
    store.dispatch(TodoAction::AddDelayedTodo {
        value: "Walk the llama".to_string(),
    });

    let final_state = store
        .run_to_completion(Clone::clone)
        .await
        .context("draining the todo store")?;

    println!("{}", serde_json::to_string_pretty(&final_state)?);
    Ok(())
}
