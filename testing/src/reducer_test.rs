//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable
//! Given-When-Then syntax. Optionally a watch table can be attached, in which
//! case the harness also collects the effects each action would trigger.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use saga_core::{effect::Effect, reducer::Reducer, watch::WatchTable};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use saga_testing::ReducerTest;
///
/// ReducerTest::new(TodoReducer::new())
///     .with_watches(todo_watches(), test_environment())
///     .given_state(AppState::default())
///     .when_action(TodoAction::FetchTodos)
///     .then_state(|state| {
///         assert!(state.is_fetching);
///     })
///     .then_effects(|effects| {
///         assertions::assert_has_future_effect(effects);
///     })
///     .run();
/// ```
pub struct ReducerTest<R, E = ()>
where
    R: Reducer,
{
    reducer: R,
    watches: Option<(WatchTable<R::Action, E>, E)>,
    initial_state: Option<R::State>,
    actions: Vec<R::Action>,
    state_assertions: Vec<StateAssertion<R::State>>,
    effect_assertions: Vec<EffectAssertion<R::Action>>,
}

impl<R> ReducerTest<R>
where
    R: Reducer,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            watches: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Attach a watch table so effect assertions can be made
    ///
    /// Must be called before any `then_effects`.
    #[must_use]
    pub fn with_watches<E>(self, watches: WatchTable<R::Action, E>, env: E) -> ReducerTest<R, E> {
        ReducerTest {
            reducer: self.reducer,
            watches: Some((watches, env)),
            initial_state: self.initial_state,
            actions: self.actions,
            state_assertions: self.state_assertions,
            effect_assertions: Vec::new(),
        }
    }
}

impl<R, E> ReducerTest<R, E>
where
    R: Reducer,
{
    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to apply (When)
    ///
    /// May be called repeatedly; actions are applied in order.
    #[must_use]
    pub fn when_action(mut self, action: R::Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Add several actions to apply, in order (When)
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = R::Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects triggered by the actions (Then)
    ///
    /// Effects are listed in action order, then watch-table order.
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<R::Action>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state or actions are not set, if effect assertions
    /// were added without a watch table, or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );
        assert!(
            self.effect_assertions.is_empty() || self.watches.is_some(),
            "Effect assertions need a watch table set with with_watches()"
        );

        let mut effects = Vec::new();
        for action in &self.actions {
            state = self.reducer.reduce(state, action);
            if let Some((watches, env)) = &self.watches {
                effects.extend(watches.matching(action, env).into_iter().map(|m| m.effect));
            }
        }

        // Run state assertions
        for assertion in self.state_assertions {
            assertion(&state);
        }

        // Run effect assertions
        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use saga_core::effect::Effect;
    use std::time::Duration;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect would do something.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that effects contain a Delay of `duration` dispatching `action`
    ///
    /// # Panics
    ///
    /// Panics if no matching Delay effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_delay_effect<A>(effects: &[Effect<A>], duration: Duration, action: &A)
    where
        A: PartialEq + std::fmt::Debug,
    {
        assert!(
            effects.iter().any(|e| matches!(
                e,
                Effect::Delay { duration: d, action: a } if *d == duration && **a == *action
            )),
            "Expected Delay({duration:?}, {action:?}), found {effects:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Clone, Debug)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Increment,
        Decrement,
        IncrementLater,
    }

    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;

        fn reduce(&self, state: TestState, action: &TestAction) -> TestState {
            match action {
                TestAction::Increment => TestState {
                    count: state.count + 1,
                },
                TestAction::Decrement => TestState {
                    count: state.count - 1,
                },
                TestAction::IncrementLater => state,
            }
        }
    }

    fn watches() -> WatchTable<TestAction, Duration> {
        WatchTable::<TestAction, Duration>::new().take_every("later", |action, delay| {
            matches!(action, TestAction::IncrementLater).then(|| Effect::Delay {
                duration: *delay,
                action: Box::new(TestAction::Increment),
            })
        })
    }

    #[test]
    fn test_reducer_test_increment() {
        ReducerTest::new(TestReducer)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_sequence() {
        ReducerTest::new(TestReducer)
            .given_state(TestState { count: 5 })
            .when_actions([TestAction::Decrement, TestAction::Decrement, TestAction::Increment])
            .then_state(|state| {
                assert_eq!(state.count, 4);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_collects_triggered_effects() {
        ReducerTest::new(TestReducer)
            .with_watches(watches(), Duration::from_millis(5))
            .given_state(TestState { count: 0 })
            .when_action(TestAction::IncrementLater)
            .then_state(|state| {
                assert_eq!(state.count, 0);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_delay_effect(
                    effects,
                    Duration::from_millis(5),
                    &TestAction::Increment,
                );
            })
            .run();
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<TestAction>(&[Effect::None]);
        assertions::assert_no_effects::<TestAction>(&[]);
    }

    #[test]
    fn test_assertions_future_effect() {
        let effects = [Effect::<TestAction>::future(async { Ok(None) })];
        assertions::assert_has_future_effect(&effects);
    }
}
