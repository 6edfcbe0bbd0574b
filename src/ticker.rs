//! Start/stop/reset counter that ticks on a fixed cadence.

use crate::clock::Clock;
use crate::error::{PaceError, PaceResult};
use crate::scheduler::{check_delay, Scheduler, TimerHandle};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

/// Counts elapsed intervals while running.
///
/// Tick `n` after a start is due at `start + n * interval`, so a late tick
/// does not push back the ones after it. Each tick reschedules the next one,
/// so at most one tick is ever pending. Dropping the ticker cancels it.
pub struct Ticker {
    inner: Arc<TickerInner>,
}

struct TickerInner {
    interval: Duration,
    scheduler: Arc<dyn Scheduler>,
    on_tick: Box<dyn Fn(u64) + Send + Sync>,
    state: Mutex<TickerState>,
}

#[derive(Default)]
struct TickerState {
    count: u64,
    running: Option<TimerHandle>,
    next_due: Option<Instant>,
    generation: u64,
}

impl Ticker {
    pub fn new<T>(interval: Duration, scheduler: Arc<dyn Scheduler>, on_tick: T) -> PaceResult<Self>
    where
        T: Fn(u64) + Send + Sync + 'static,
    {
        if interval.is_zero() {
            return Err(PaceError::InvalidArgument(
                "Tick interval must be greater than 0".to_string(),
            ));
        }
        check_delay("tick interval", interval)?;

        Ok(Self {
            inner: Arc::new(TickerInner {
                interval,
                scheduler,
                on_tick: Box::new(on_tick),
                state: Mutex::new(TickerState::default()),
            }),
        })
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn count(&self) -> u64 {
        self.inner.read_state().count
    }

    pub fn is_running(&self) -> bool {
        self.inner.read_state().running.is_some()
    }

    /// Start counting. A running ticker restarts its cadence from now.
    pub fn start(&self) -> PaceResult<()> {
        let mut state = self.inner.lock()?;
        self.inner.halt(&mut state);
        state.next_due = Some(self.inner.scheduler.now() + self.inner.interval);
        TickerInner::schedule_next(&self.inner, &mut state)?;
        tracing::debug!(count = state.count, "Ticker started");
        Ok(())
    }

    /// Stop counting, keeping the current count.
    pub fn stop(&self) -> PaceResult<()> {
        let mut state = self.inner.lock()?;
        if self.inner.halt(&mut state) {
            tracing::debug!(count = state.count, "Ticker stopped");
        }
        Ok(())
    }

    /// Stop counting and return the count to zero.
    pub fn reset(&self) -> PaceResult<()> {
        let mut state = self.inner.lock()?;
        self.inner.halt(&mut state);
        state.count = 0;
        tracing::debug!("Ticker reset");
        Ok(())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        let mut state = self.inner.read_state();
        self.inner.halt(&mut state);
    }
}

impl TickerInner {
    fn lock(&self) -> PaceResult<MutexGuard<'_, TickerState>> {
        self.state.lock().map_err(|_| PaceError::poisoned("ticker state"))
    }

    fn read_state(&self) -> MutexGuard<'_, TickerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn halt(&self, state: &mut TickerState) -> bool {
        state.generation += 1;
        match state.running.take() {
            Some(handle) => {
                self.scheduler.cancel(handle);
                true
            }
            None => false,
        }
    }

    fn schedule_next(this: &Arc<Self>, state: &mut TickerState) -> PaceResult<()> {
        let generation = state.generation;
        let weak: Weak<Self> = Arc::downgrade(this);
        let delay = match state.next_due {
            Some(due) => due.saturating_duration_since(this.scheduler.now()),
            None => this.interval,
        };

        let handle = this.scheduler.schedule_after(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.tick(generation);
                }
            }),
        )?;
        state.running = Some(handle);
        Ok(())
    }

    fn tick(self: &Arc<Self>, generation: u64) {
        let count = {
            let mut state = self.read_state();
            if state.generation != generation {
                return;
            }
            state.count += 1;
            // Missed slots are not skipped: an overdue tick is scheduled with no delay.
            state.next_due = state.next_due.map(|due| due + self.interval);
            if let Err(e) = Self::schedule_next(self, &mut state) {
                state.running = None;
                tracing::error!(error = %e, "Ticker could not schedule its next tick");
            }
            state.count
        };

        (self.on_tick)(count);
    }
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("interval", &self.inner.interval)
            .field("count", &self.count())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;

    fn ticker(scheduler: &Arc<ManualScheduler>) -> (Ticker, Arc<Mutex<Vec<u64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ticker = Ticker::new(Duration::from_secs(1), scheduler.clone(), move |count| {
            sink.lock().unwrap().push(count)
        })
        .unwrap();
        (ticker, seen)
    }

    #[test]
    fn test_counts_once_per_interval() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (ticker, seen) = ticker(&scheduler);

        ticker.start().unwrap();
        assert!(ticker.is_running());
        scheduler.advance(Duration::from_millis(3500));

        assert_eq!(ticker.count(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn test_stop_keeps_count() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (ticker, _seen) = ticker(&scheduler);

        ticker.start().unwrap();
        scheduler.advance(Duration::from_secs(2));
        ticker.stop().unwrap();
        scheduler.advance(Duration::from_secs(5));

        assert_eq!(ticker.count(), 2);
        assert!(!ticker.is_running());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_reset_stops_and_zeroes() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (ticker, _seen) = ticker(&scheduler);

        ticker.start().unwrap();
        scheduler.advance(Duration::from_secs(4));
        ticker.reset().unwrap();
        scheduler.advance(Duration::from_secs(2));

        assert_eq!(ticker.count(), 0);
        assert!(!ticker.is_running());

        ticker.start().unwrap();
        scheduler.advance(Duration::from_secs(1));
        assert_eq!(ticker.count(), 1);
    }

    #[test]
    fn test_restart_does_not_double_cadence() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (ticker, _seen) = ticker(&scheduler);

        ticker.start().unwrap();
        scheduler.advance(Duration::from_millis(500));
        ticker.start().unwrap();
        scheduler.advance(Duration::from_millis(999));
        assert_eq!(ticker.count(), 0);

        scheduler.advance(Duration::from_millis(1));
        assert_eq!(ticker.count(), 1);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn test_drop_cancels_cadence() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (ticker, seen) = ticker(&scheduler);

        ticker.start().unwrap();
        drop(ticker);

        assert_eq!(scheduler.pending(), 0);
        scheduler.advance(Duration::from_secs(3));
        assert!(seen.lock().unwrap().is_empty());
    }

    /// Delivers every timer 100ms later than asked.
    struct Lagging(Arc<ManualScheduler>);

    impl Clock for Lagging {
        fn now(&self) -> Instant {
            self.0.now()
        }
    }

    impl Scheduler for Lagging {
        fn schedule_after(&self, delay: Duration, action: crate::scheduler::DeferredAction) -> PaceResult<TimerHandle> {
            self.0.schedule_after(delay + Duration::from_millis(100), action)
        }

        fn cancel(&self, handle: TimerHandle) -> bool {
            self.0.cancel(handle)
        }
    }

    #[test]
    fn test_late_ticks_do_not_drift() {
        let scheduler = Arc::new(ManualScheduler::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let clock = Arc::clone(&scheduler);
        let ticker = Ticker::new(
            Duration::from_secs(1),
            Arc::new(Lagging(Arc::clone(&scheduler))),
            move |_| sink.lock().unwrap().push(clock.elapsed()),
        )
        .unwrap();

        ticker.start().unwrap();
        scheduler.advance(Duration::from_millis(3200));

        assert_eq!(ticker.count(), 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Duration::from_millis(1100),
                Duration::from_millis(2100),
                Duration::from_millis(3100),
            ]
        );
    }

    #[test]
    fn test_rejects_zero_interval() {
        let scheduler = Arc::new(ManualScheduler::new());
        let result = Ticker::new(Duration::ZERO, scheduler, |_| {});
        assert!(matches!(result, Err(PaceError::InvalidArgument(_))));
    }
}
