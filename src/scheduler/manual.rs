use super::{DeferredAction, Scheduler, TimerHandle};
use crate::clock::Clock;
use crate::error::{PaceError, PaceResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Scheduler with its own virtual clock.
///
/// Nothing runs until [`ManualScheduler::advance`] moves time forward. Calls
/// due at the same instant run in the order they were scheduled, and the
/// clock reads exactly the due instant while each one runs.
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

struct ManualState {
    origin: Instant,
    elapsed: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, u64), DeferredAction>,
    due_at: HashMap<u64, Duration>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                origin: Instant::now(),
                elapsed: Duration::ZERO,
                next_id: 1,
                queue: BTreeMap::new(),
                due_at: HashMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Virtual time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        self.state().elapsed
    }

    /// Number of calls waiting to run.
    pub fn pending(&self) -> usize {
        self.state().queue.len()
    }

    /// Move virtual time forward by `by`, running every call that falls due.
    /// Calls scheduled by those calls run too if they fall inside the window.
    /// Returns how many calls ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state().elapsed + by;
        let mut ran = 0;

        loop {
            let action = {
                let mut state = self.state();
                let key = match state.queue.keys().next() {
                    Some(&key) if key.0 <= target => key,
                    _ => break,
                };
                state.due_at.remove(&key.1);
                if key.0 > state.elapsed {
                    state.elapsed = key.0;
                }
                state.queue.remove(&key)
            };

            if let Some(action) = action {
                action();
                ran += 1;
            }
        }

        self.state().elapsed = target;
        ran
    }

    /// Run calls that are already due without moving time.
    pub fn run_due(&self) -> usize {
        self.advance(Duration::ZERO)
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualScheduler {
    fn now(&self) -> Instant {
        let state = self.state();
        state.origin + state.elapsed
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&self, delay: Duration, action: DeferredAction) -> PaceResult<TimerHandle> {
        let mut state = self.state();
        let due = state.elapsed.checked_add(delay).ok_or_else(|| {
            PaceError::InvalidArgument(format!("Delay of {:?} overflows the virtual clock", delay))
        })?;

        let id = state.next_id;
        state.next_id += 1;
        state.queue.insert((due, id), action);
        state.due_at.insert(id, due);

        Ok(TimerHandle::new(id))
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        let mut state = self.state();
        match state.due_at.remove(&handle.id()) {
            Some(due) => state.queue.remove(&(due, handle.id())).is_some(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<(&'static str, Duration)>>>, Arc<ManualScheduler>) {
        (Arc::new(Mutex::new(Vec::new())), Arc::new(ManualScheduler::new()))
    }

    #[test]
    fn test_runs_in_due_order() {
        let (log, scheduler) = recorder();

        for (name, ms) in [("late", 300), ("early", 100), ("middle", 200)] {
            let log = Arc::clone(&log);
            let clock = Arc::clone(&scheduler);
            scheduler
                .schedule_after(
                    Duration::from_millis(ms),
                    Box::new(move || log.lock().unwrap().push((name, clock.elapsed()))),
                )
                .unwrap();
        }

        assert_eq!(scheduler.advance(Duration::from_millis(250)), 2);
        assert_eq!(scheduler.elapsed(), Duration::from_millis(250));
        assert_eq!(scheduler.advance(Duration::from_millis(50)), 1);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("early", Duration::from_millis(100)),
                ("middle", Duration::from_millis(200)),
                ("late", Duration::from_millis(300)),
            ]
        );
    }

    #[test]
    fn test_zero_delay_waits_for_next_turn() {
        let (log, scheduler) = recorder();
        let sink = Arc::clone(&log);
        scheduler
            .schedule_after(Duration::ZERO, Box::new(move || sink.lock().unwrap().push(("now", Duration::ZERO))))
            .unwrap();

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(scheduler.run_due(), 1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_cancel() {
        let (log, scheduler) = recorder();
        let sink = Arc::clone(&log);
        let handle = scheduler
            .schedule_after(Duration::from_millis(10), Box::new(move || sink.lock().unwrap().push(("x", Duration::ZERO))))
            .unwrap();

        assert_eq!(scheduler.pending(), 1);
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));
        assert_eq!(scheduler.advance(Duration::from_secs(1)), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_nested_scheduling_within_window() {
        let scheduler = Arc::new(ManualScheduler::new());
        let hits = Arc::new(Mutex::new(Vec::new()));

        let inner_scheduler = Arc::clone(&scheduler);
        let inner_hits = Arc::clone(&hits);
        scheduler
            .schedule_after(
                Duration::from_millis(100),
                Box::new(move || {
                    let clock = Arc::clone(&inner_scheduler);
                    let hits = Arc::clone(&inner_hits);
                    inner_scheduler
                        .schedule_after(
                            Duration::from_millis(100),
                            Box::new(move || hits.lock().unwrap().push(clock.elapsed())),
                        )
                        .unwrap();
                }),
            )
            .unwrap();

        assert_eq!(scheduler.advance(Duration::from_millis(250)), 2);
        assert_eq!(*hits.lock().unwrap(), vec![Duration::from_millis(200)]);
    }

    #[test]
    fn test_overflowing_delay_is_rejected() {
        let scheduler = ManualScheduler::new();
        scheduler.advance(Duration::from_secs(1));

        let result = scheduler.schedule_after(Duration::MAX, Box::new(|| {}));
        assert!(matches!(result, Err(PaceError::InvalidArgument(_))));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_clock_tracks_virtual_time() {
        let scheduler = ManualScheduler::new();
        let start = scheduler.now();
        scheduler.advance(Duration::from_millis(1200));
        assert_eq!(scheduler.now().duration_since(start), Duration::from_millis(1200));
    }
}
