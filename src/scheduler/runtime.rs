use super::{DeferredAction, Scheduler, TimerHandle};
use crate::clock::Clock;
use crate::error::{PaceError, PaceResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Scheduler that runs each deferred call as a task on a tokio runtime.
///
/// A task removes itself from the pending table before running its action,
/// and `cancel` removes it under the same lock, so a cancelled call can never
/// run once `cancel` has returned `true`.
#[derive(Clone)]
pub struct TokioScheduler {
    handle: Handle,
    tasks: Arc<Mutex<HashMap<u64, JoinHandle<()>>>>,
    next_id: Arc<AtomicU64>,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Bind to the runtime the caller is running on.
    pub fn current() -> PaceResult<Self> {
        let handle = Handle::try_current()
            .map_err(|e| PaceError::Scheduler(format!("No tokio runtime available: {}", e)))?;
        Ok(Self::new(handle))
    }

    /// Number of calls scheduled but not yet run or cancelled.
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Clock for TokioScheduler {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_after(&self, delay: Duration, action: DeferredAction) -> PaceResult<TimerHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tasks = Arc::clone(&self.tasks);

        // Insert before the task can look itself up.
        let mut pending = self
            .tasks
            .lock()
            .map_err(|_| PaceError::poisoned("scheduler tasks"))?;

        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;

            let still_pending = match tasks.lock() {
                Ok(mut tasks) => tasks.remove(&id).is_some(),
                Err(_) => false,
            };

            if still_pending {
                action();
            } else {
                tracing::trace!(timer = id, "Deferred call was cancelled before running");
            }
        });

        pending.insert(id, join);
        tracing::trace!(timer = id, delay_ms = delay.as_millis() as u64, "Scheduled deferred call");

        Ok(TimerHandle::new(id))
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        let removed = match self.tasks.lock() {
            Ok(mut tasks) => tasks.remove(&handle.id()),
            Err(_) => None,
        };

        match removed {
            Some(join) => {
                join.abort();
                tracing::trace!(timer = handle.id(), "Cancelled deferred call");
                true
            }
            None => false,
        }
    }
}
