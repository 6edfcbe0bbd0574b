//! Leading-edge throttle.
//!
//! The first call always fires. After a firing, calls are dropped until
//! `interval` has elapsed on the clock; nothing dropped is queued or retried.

use crate::clock::Clock;
use crate::error::{PaceError, PaceResult};
use crate::metrics::CallStats;
use crate::outcome::Outcome;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// A callback wrapped with leading-edge throttle semantics.
pub struct Throttled<F> {
    callback: F,
    interval: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<ThrottleState>,
}

#[derive(Default)]
struct ThrottleState {
    last_fire: Option<Instant>,
    stats: CallStats,
}

/// Wrap `callback` so it fires at most once per `interval`.
pub fn throttle<F>(callback: F, interval: Duration, clock: Arc<dyn Clock>) -> PaceResult<Throttled<F>> {
    Throttled::new(callback, interval, clock)
}

impl<F> Throttled<F> {
    pub fn new(callback: F, interval: Duration, clock: Arc<dyn Clock>) -> PaceResult<Self> {
        Ok(Self {
            callback,
            interval,
            clock,
            state: Mutex::new(ThrottleState::default()),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the callback last fired, if ever.
    pub fn last_fire(&self) -> Option<Instant> {
        self.read_state().last_fire
    }

    pub fn stats(&self) -> CallStats {
        self.read_state().stats
    }

    fn read_state(&self) -> MutexGuard<'_, ThrottleState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fire the callback now if the interval allows it, returning its result.
    /// Returns `Ok(None)` when the call is dropped.
    pub fn call<A, R>(&self, args: A) -> PaceResult<Option<R>>
    where
        F: Fn(A) -> R,
        R: Outcome,
    {
        let now = self.clock.now();

        let previous = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| PaceError::poisoned("throttle state"))?;

            state.stats.record_invocation();

            if let Some(last) = state.last_fire {
                let elapsed = now.saturating_duration_since(last);
                if elapsed < self.interval {
                    state.stats.record_dropped();
                    tracing::debug!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        interval_ms = self.interval.as_millis() as u64,
                        "Suppressed throttled call"
                    );
                    return Ok(None);
                }
            }

            // Claim the slot before running so concurrent callers see it taken.
            state.last_fire.replace(now)
        };

        let result = match panic::catch_unwind(AssertUnwindSafe(|| (self.callback)(args))) {
            Ok(result) => result,
            Err(payload) => {
                self.release(now, previous);
                tracing::error!("Throttled callback panicked");
                panic::resume_unwind(payload);
            }
        };

        if let Some(reason) = result.failure() {
            self.release(now, previous);
            tracing::warn!(error = %reason, "Throttled callback failed");
        } else {
            self.read_state().stats.record_fired(false);
        }

        Ok(Some(result))
    }

    /// Undo the slot claimed at `now`: a failed firing does not start a new interval.
    fn release(&self, now: Instant, previous: Option<Instant>) {
        let mut state = self.read_state();
        state.stats.record_fired(true);
        if state.last_fire == Some(now) {
            state.last_fire = previous;
        }
    }
}

impl<F> std::fmt::Debug for Throttled<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttled")
            .field("interval", &self.interval)
            .field("last_fire", &self.last_fire())
            .finish()
    }
}
