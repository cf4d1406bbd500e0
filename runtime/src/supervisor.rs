//! Effect supervision for a single store.
//!
//! The supervisor is the observer the store notifies after every reducer
//! run. It owns the watch table, counts in-flight effect tasks, records
//! effect defects and publishes its lifecycle phase on a `watch` channel:
//!
//! ```text
//! Watching ──End──► WindingDown ──last task settles──► Drained
//!     └────End with nothing in flight──────────────────────┘
//! ```
//!
//! Task spawning itself lives in the store, which owns the runtime handle
//! and the dispatch path the tasks feed back into.

use crate::{EndPolicy, lock};
use saga_core::action::Action;
use saga_core::watch::{Matched, WatchPolicy, WatchTable};
use saga_core::SmallVec;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Lifecycle phase of a store's effect supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorPhase {
    /// Matching actions against the watch table and spawning tasks
    Watching,
    /// `End` observed; waiting for in-flight tasks to settle
    WindingDown,
    /// `End` observed and every task has settled
    Drained,
}

/// An effect task that failed without a mapped failure action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectFailure {
    /// Name of the watch that spawned the task
    pub watch: &'static str,
    /// What went wrong
    pub reason: String,
}

impl std::fmt::Display for EffectFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}`: {}", self.watch, self.reason)
    }
}

#[derive(Debug)]
struct Tracker {
    phase: SupervisorPhase,
    in_flight: usize,
    per_watch: Vec<usize>,
}

/// Watch-table matcher and task bookkeeping for one store
pub(crate) struct Supervisor<A, E> {
    table: WatchTable<A, E>,
    tracker: Mutex<Tracker>,
    phase: watch::Sender<SupervisorPhase>,
    failures: Mutex<Vec<EffectFailure>>,
    cancel: CancellationToken,
    end_policy: EndPolicy,
}

impl<A, E> Supervisor<A, E>
where
    A: Action,
{
    pub(crate) fn new(table: WatchTable<A, E>, end_policy: EndPolicy) -> Self {
        let (phase, _) = watch::channel(SupervisorPhase::Watching);
        let per_watch = vec![0; table.len()];
        tracing::debug!(
            watches = ?table.watches().iter().map(|w| (w.name(), w.policy())).collect::<Vec<_>>(),
            "Supervisor watching"
        );

        Self {
            table,
            tracker: Mutex::new(Tracker {
                phase: SupervisorPhase::Watching,
                in_flight: 0,
                per_watch,
            }),
            phase,
            failures: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
            end_policy,
        }
    }

    /// React to an applied action
    ///
    /// Returns the effects to spawn. Each returned effect has already been
    /// counted as in flight; the caller must settle it exactly once through
    /// a [`SettleGuard`].
    pub(crate) fn observe(&self, action: &A, env: &E) -> SmallVec<[Matched<A>; 4]> {
        let mut tracker = lock(&self.tracker);

        // Factories are not consulted once stopped, so none of them runs
        if tracker.phase != SupervisorPhase::Watching {
            if !action.is_end() {
                tracing::debug!(
                    action = action.name(),
                    phase = ?tracker.phase,
                    "Supervisor no longer watching, action not matched"
                );
            }
            return SmallVec::new();
        }

        if action.is_end() {
            let in_flight = tracker.in_flight;
            tracker.phase = if in_flight == 0 {
                SupervisorPhase::Drained
            } else {
                SupervisorPhase::WindingDown
            };
            self.phase.send_replace(tracker.phase);
            tracing::info!(in_flight, phase = ?tracker.phase, "End observed, supervisor stopped watching");

            if self.end_policy == EndPolicy::CancelInFlight && in_flight > 0 {
                tracing::info!(in_flight, "Cancelling in-flight effect tasks");
                self.cancel.cancel();
            }
            return SmallVec::new();
        }

        let mut matched = self.table.matching(action, env);
        matched.retain(|m| {
            let busy = tracker.per_watch.get(m.index).copied().unwrap_or(0) > 0;
            if m.policy == WatchPolicy::Leading && busy {
                tracing::debug!(watch = m.name, "Leading watch busy, trigger ignored");
                metrics::counter!("store.effects.ignored").increment(1);
                false
            } else {
                true
            }
        });

        for m in &matched {
            tracker.in_flight += 1;
            if let Some(count) = tracker.per_watch.get_mut(m.index) {
                *count += 1;
            }
            tracing::trace!(watch = m.name, action = action.name(), "Watch matched");
        }

        matched
    }

    /// Mark one task of watch `index` as finished
    fn settle(&self, index: usize) {
        let mut tracker = lock(&self.tracker);
        tracker.in_flight = tracker.in_flight.saturating_sub(1);
        if let Some(count) = tracker.per_watch.get_mut(index) {
            *count = count.saturating_sub(1);
        }

        if tracker.in_flight == 0 && tracker.phase == SupervisorPhase::WindingDown {
            tracker.phase = SupervisorPhase::Drained;
            self.phase.send_replace(SupervisorPhase::Drained);
            tracing::info!("All effect tasks settled, supervisor drained");
        }
    }

    pub(crate) fn record_failure(&self, failure: EffectFailure) {
        tracing::error!(watch = failure.watch, reason = %failure.reason, "Effect task failed");
        metrics::counter!("store.effects.failed", "watch" => failure.watch).increment(1);
        lock(&self.failures).push(failure);
    }

    pub(crate) fn failures(&self) -> Vec<EffectFailure> {
        lock(&self.failures).clone()
    }

    pub(crate) fn phase(&self) -> SupervisorPhase {
        *self.phase.borrow()
    }

    pub(crate) fn subscribe_phase(&self) -> watch::Receiver<SupervisorPhase> {
        self.phase.subscribe()
    }

    pub(crate) fn in_flight(&self) -> usize {
        lock(&self.tracker).in_flight
    }

    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Settles one in-flight task when dropped
///
/// Created for every matched effect before it is spawned, so the count is
/// released on completion, cancellation, panic, or a failed spawn alike.
pub(crate) struct SettleGuard<A: Action, E> {
    supervisor: Arc<Supervisor<A, E>>,
    index: usize,
}

impl<A: Action, E> SettleGuard<A, E> {
    pub(crate) const fn new(supervisor: Arc<Supervisor<A, E>>, index: usize) -> Self {
        Self { supervisor, index }
    }
}

impl<A: Action, E> Drop for SettleGuard<A, E> {
    fn drop(&mut self) {
        self.supervisor.settle(self.index);
    }
}
