//! Watch tables: which actions start which effects.
//!
//! A [`WatchTable`] is the static half of an effect supervisor. Each entry
//! pairs a name and a [`WatchPolicy`] with a factory that inspects a
//! dispatched action and, if the action is a trigger for it, builds the
//! [`Effect`] to run.
//!
//! # Example
//!
//! ```
//! use saga_core::effect::Effect;
//! use saga_core::watch::WatchTable;
//! use std::time::Duration;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum Action {
//!     Ping,
//!     PingLater,
//! }
//!
//! let table = WatchTable::<Action, ()>::new().take_every("ping_later", |action, _env| {
//!     matches!(action, Action::PingLater).then(|| Effect::Delay {
//!         duration: Duration::from_millis(5),
//!         action: Box::new(Action::Ping),
//!     })
//! });
//!
//! assert_eq!(table.matching(&Action::PingLater, &()).len(), 1);
//! assert!(table.matching(&Action::Ping, &()).is_empty());
//! ```

use crate::effect::Effect;
use smallvec::SmallVec;

/// Factory turning a trigger action into an effect
///
/// Returns `None` when the action is not a trigger for this watch.
pub type EffectFactory<A, E> = Box<dyn Fn(&A, &E) -> Option<Effect<A>> + Send + Sync>;

/// How a watch reacts to a trigger while earlier tasks of its own are running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchPolicy {
    /// Spawn an independent task for every trigger; tasks never cancel or
    /// block one another
    #[default]
    Every,

    /// Ignore triggers while a task spawned by this watch is still in flight
    Leading,
}

/// One row of a watch table
pub struct Watch<A, E> {
    name: &'static str,
    policy: WatchPolicy,
    factory: EffectFactory<A, E>,
}

impl<A, E> Watch<A, E> {
    /// Name used in logs, metrics and failure reports
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Concurrency policy of this watch
    #[must_use]
    pub const fn policy(&self) -> WatchPolicy {
        self.policy
    }

    /// Build the effect for `action`, if it is a trigger for this watch
    pub fn effect_for(&self, action: &A, env: &E) -> Option<Effect<A>> {
        (self.factory)(action, env)
    }
}

impl<A, E> std::fmt::Debug for Watch<A, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watch")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// A trigger matched by [`WatchTable::matching`]
#[derive(Debug)]
pub struct Matched<A> {
    /// Position of the watch in its table
    pub index: usize,
    /// Name of the watch
    pub name: &'static str,
    /// Policy of the watch
    pub policy: WatchPolicy,
    /// The effect built by the watch's factory
    pub effect: Effect<A>,
}

/// Static mapping from trigger actions to effect factories
pub struct WatchTable<A, E> {
    watches: Vec<Watch<A, E>>,
}

impl<A, E> WatchTable<A, E> {
    /// Create an empty table
    #[must_use]
    pub const fn new() -> Self {
        Self {
            watches: Vec::new(),
        }
    }

    /// Add a watch that spawns a task for every trigger
    #[must_use]
    pub fn take_every<F>(self, name: &'static str, factory: F) -> Self
    where
        F: Fn(&A, &E) -> Option<Effect<A>> + Send + Sync + 'static,
    {
        self.with_watch(name, WatchPolicy::Every, factory)
    }

    /// Add a watch that ignores triggers while one of its tasks is running
    #[must_use]
    pub fn take_leading<F>(self, name: &'static str, factory: F) -> Self
    where
        F: Fn(&A, &E) -> Option<Effect<A>> + Send + Sync + 'static,
    {
        self.with_watch(name, WatchPolicy::Leading, factory)
    }

    /// Add a watch with an explicit policy
    #[must_use]
    pub fn with_watch<F>(mut self, name: &'static str, policy: WatchPolicy, factory: F) -> Self
    where
        F: Fn(&A, &E) -> Option<Effect<A>> + Send + Sync + 'static,
    {
        self.watches.push(Watch {
            name,
            policy,
            factory: Box::new(factory),
        });
        self
    }

    /// All watches, in registration order
    #[must_use]
    pub fn watches(&self) -> &[Watch<A, E>] {
        &self.watches
    }

    /// Number of watches
    #[must_use]
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    /// Whether the table has no watches
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Run every factory against `action` and collect the triggered effects
    ///
    /// Effects that would do nothing ([`Effect::is_none`]) are dropped, so a
    /// factory may return `Some(Effect::None)` without a task being spawned.
    pub fn matching(&self, action: &A, env: &E) -> SmallVec<[Matched<A>; 4]> {
        self.watches
            .iter()
            .enumerate()
            .filter_map(|(index, watch)| {
                let effect = watch.effect_for(action, env)?;
                (!effect.is_none()).then_some(Matched {
                    index,
                    name: watch.name,
                    policy: watch.policy,
                    effect,
                })
            })
            .collect()
    }
}

impl<A, E> Default for WatchTable<A, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, E> std::fmt::Debug for WatchTable<A, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.watches).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Trigger(u32),
        Quiet,
        Fired(u32),
    }

    fn delayed(value: u32) -> Effect<TestAction> {
        Effect::Delay {
            duration: Duration::from_millis(u64::from(value)),
            action: Box::new(TestAction::Fired(value)),
        }
    }

    #[test]
    fn empty_table_matches_nothing() {
        let table = WatchTable::<TestAction, ()>::new();
        assert!(table.is_empty());
        assert!(table.matching(&TestAction::Trigger(1), &()).is_empty());
    }

    #[test]
    fn matching_preserves_registration_order() {
        let table = WatchTable::<TestAction, ()>::new()
            .take_every("first", |action, _env| match action {
                TestAction::Trigger(v) => Some(delayed(*v)),
                _ => None,
            })
            .take_leading("second", |action, _env| match action {
                TestAction::Trigger(v) => Some(delayed(v + 1)),
                _ => None,
            });

        let matched = table.matching(&TestAction::Trigger(3), &());
        assert_eq!(matched.len(), 2);
        assert_eq!((matched[0].index, matched[0].name), (0, "first"));
        assert_eq!(matched[0].policy, WatchPolicy::Every);
        assert_eq!((matched[1].index, matched[1].name), (1, "second"));
        assert_eq!(matched[1].policy, WatchPolicy::Leading);

        assert!(table.matching(&TestAction::Quiet, &()).is_empty());

        let registered: Vec<_> = table.watches().iter().map(|w| (w.name(), w.policy())).collect();
        assert_eq!(
            registered,
            vec![("first", WatchPolicy::Every), ("second", WatchPolicy::Leading)]
        );
    }

    #[test]
    fn factories_see_the_environment() {
        let table = WatchTable::<TestAction, u32>::new().take_every("env", |action, factor| {
            matches!(action, TestAction::Quiet).then(|| delayed(*factor))
        });

        let matched = table.matching(&TestAction::Quiet, &7);
        match &matched[0].effect {
            Effect::Delay { duration, action } => {
                assert_eq!(*duration, Duration::from_millis(7));
                assert_eq!(**action, TestAction::Fired(7));
            },
            other => unreachable!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn none_effects_are_dropped() {
        let table = WatchTable::<TestAction, ()>::new()
            .take_every("noop", |_action, _env| Some(Effect::None));
        assert!(table.matching(&TestAction::Quiet, &()).is_empty());
    }
}
