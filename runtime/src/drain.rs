//! Drain protocol: `End`, wait for in-flight effects, read final state.

use crate::error::StoreError;
use crate::store::Store;
use crate::supervisor::SupervisorPhase;
use saga_core::action::Action;
use saga_core::reducer::Reducer;
use std::time::Duration;

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A> + Send + Sync + 'static,
    A: Action,
    S: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Dispatch `End`, wait for every in-flight effect to settle, then
    /// apply `selector` to the final state
    ///
    /// Actions dispatched by effects that were already running when `End`
    /// arrived are still reduced before this resolves. Triggers dispatched
    /// after `End` spawn nothing.
    ///
    /// Calling this again once the store is drained dispatches another
    /// `End` (which changes nothing) and resolves immediately.
    ///
    /// An effect's follow-up action is reduced before its task settles, so
    /// chains of effects are always covered. The exception is a dispatch
    /// running on a thread outside the store's effect tasks: while it holds
    /// the dispatch queue (for instance in a slow listener), a follow-up
    /// queued behind it may be reduced only after this has resolved.
    ///
    /// # Errors
    ///
    /// - [`StoreError::EffectFailed`] if any effect task failed without a
    ///   mapped failure action during the store's lifetime
    /// - [`StoreError::CompletionSignalLost`] if the supervisor's phase
    ///   channel closed before draining
    #[tracing::instrument(skip_all, name = "store_run_to_completion")]
    pub async fn run_to_completion<F, T>(&self, selector: F) -> Result<T, StoreError>
    where
        F: FnOnce(&S) -> T,
    {
        // Subscribe before dispatching so the Drained transition cannot be missed
        let mut phase = self.subscribe_phase();
        self.dispatch(A::end());

        phase
            .wait_for(|phase| *phase == SupervisorPhase::Drained)
            .await
            .map_err(|_| StoreError::CompletionSignalLost)?;

        metrics::counter!("store.drain.completed").increment(1);

        let failures = self.failures();
        if let Some(first) = failures.first() {
            tracing::warn!(count = failures.len(), first = %first, "Drained with effect failures");
            return Err(StoreError::EffectFailed {
                count: failures.len(),
                first: first.to_string(),
            });
        }

        tracing::debug!("Store drained");
        Ok(self.state(selector))
    }

    /// [`run_to_completion`](Self::run_to_completion) with a deadline
    ///
    /// # Errors
    ///
    /// [`StoreError::Timeout`] if effects have not settled within `timeout`,
    /// otherwise the errors of `run_to_completion`.
    pub async fn run_to_completion_within<F, T>(
        &self,
        timeout: Duration,
        selector: F,
    ) -> Result<T, StoreError>
    where
        F: FnOnce(&S) -> T,
    {
        tokio::time::timeout(timeout, self.run_to_completion(selector))
            .await
            .map_err(|_| {
                tracing::warn!(?timeout, in_flight = self.in_flight(), "Timed out draining store");
                StoreError::Timeout
            })?
    }
}
