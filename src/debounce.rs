//! Trailing-edge debounce.
//!
//! A [`Debounced`] wrapper defers its callback until `delay` has passed with
//! no further calls. Each call cancels the previous deferred call and
//! schedules a fresh one carrying its own arguments, so a burst of calls
//! fires once, `delay` after the last call, with the last call's arguments.

use crate::error::{PaceError, PaceResult};
use crate::metrics::CallStats;
use crate::outcome::Outcome;
use crate::scheduler::{check_delay, Scheduler, TimerHandle};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// A callback wrapped with debounce semantics.
///
/// Clones share one pending call and one set of counters; wrapping the same
/// callback twice gives two independent debouncers.
pub struct Debounced<F> {
    inner: Arc<DebounceInner<F>>,
}

struct DebounceInner<F> {
    callback: F,
    delay: Duration,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<DebounceState>,
}

#[derive(Default)]
struct DebounceState {
    pending: Option<TimerHandle>,
    generation: u64,
    stats: CallStats,
}

/// Wrap `callback` so it only runs once calls have been quiet for `delay`.
pub fn debounce<F>(callback: F, delay: Duration, scheduler: Arc<dyn Scheduler>) -> PaceResult<Debounced<F>> {
    Debounced::new(callback, delay, scheduler)
}

impl<F> Debounced<F> {
    pub fn new(callback: F, delay: Duration, scheduler: Arc<dyn Scheduler>) -> PaceResult<Self> {
        check_delay("debounce delay", delay)?;

        Ok(Self {
            inner: Arc::new(DebounceInner {
                callback,
                delay,
                scheduler,
                state: Mutex::new(DebounceState::default()),
            }),
        })
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Whether a deferred call is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.inner.read_state().pending.is_some()
    }

    pub fn stats(&self) -> CallStats {
        self.inner.read_state().stats
    }

    /// Record a call. `args` is moved into the deferred call and handed to
    /// the callback unchanged if no newer call supersedes it.
    pub fn call<A, R>(&self, args: A) -> PaceResult<()>
    where
        F: Fn(A) -> R + Send + Sync + 'static,
        A: Send + 'static,
        R: Outcome + 'static,
    {
        let mut state = self
            .inner
            .state
            .lock()
            .map_err(|_| PaceError::poisoned("debounce state"))?;

        state.stats.record_invocation();

        if let Some(previous) = state.pending.take() {
            if self.inner.scheduler.cancel(previous) {
                state.stats.record_dropped();
                tracing::debug!(timer = %previous, "Superseded pending debounced call");
            }
        }

        state.generation += 1;
        let generation = state.generation;
        let inner = Arc::clone(&self.inner);

        let handle = self
            .inner
            .scheduler
            .schedule_after(self.inner.delay, Box::new(move || inner.fire::<A, R>(generation, args)))?;
        state.pending = Some(handle);

        Ok(())
    }
}

impl<F> DebounceInner<F> {
    fn read_state(&self) -> MutexGuard<'_, DebounceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fire<A, R>(&self, generation: u64, args: A)
    where
        F: Fn(A) -> R,
        R: Outcome,
    {
        {
            let mut state = self.read_state();
            // A newer call got in after this timer elapsed but before it ran.
            if state.generation != generation {
                state.stats.record_dropped();
                tracing::debug!(generation, "Discarded stale debounced call");
                return;
            }
            state.pending = None;
        }

        let failure = match panic::catch_unwind(AssertUnwindSafe(|| (self.callback)(args))) {
            Ok(outcome) => outcome.failure(),
            Err(payload) => {
                // Count the firing before the panic reaches the scheduler.
                self.read_state().stats.record_fired(true);
                tracing::error!(generation, "Debounced callback panicked");
                panic::resume_unwind(payload);
            }
        };
        self.read_state().stats.record_fired(failure.is_some());

        match failure {
            Some(reason) => tracing::error!(
                delay_ms = self.delay.as_millis() as u64,
                error = %reason,
                "Debounced callback failed"
            ),
            None => tracing::trace!(generation, "Debounced callback fired"),
        }
    }
}

impl<F> Clone for Debounced<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F> std::fmt::Debug for Debounced<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debounced")
            .field("delay", &self.inner.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}
