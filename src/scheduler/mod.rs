//! Deferred-call scheduling
//!
//! The combinators never touch timers directly. They are handed a
//! [`Scheduler`] that can run a closure after a delay and cancel it before
//! it runs. [`TokioScheduler`] runs on a tokio runtime; [`ManualScheduler`]
//! keeps its own virtual time and only moves when told to.

pub mod manual;
pub mod runtime;

use crate::clock::Clock;
use crate::error::{PaceError, PaceResult};
use std::fmt;
use std::time::Duration;

pub use manual::ManualScheduler;
pub use runtime::TokioScheduler;

/// Largest delay any scheduled call accepts (2^31 - 1 milliseconds).
pub const MAX_DELAY: Duration = Duration::from_millis(2_147_483_647);

/// Work to run once a delay has elapsed.
pub type DeferredAction = Box<dyn FnOnce() + Send + 'static>;

/// Identifies one scheduled call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Schedule-after-delay and cancel-if-pending, on a clock callers can read.
pub trait Scheduler: Clock + Send + Sync {
    /// Run `action` once `delay` has elapsed. The action never runs
    /// synchronously inside this call, even for a zero delay.
    fn schedule_after(&self, delay: Duration, action: DeferredAction) -> PaceResult<TimerHandle>;

    /// Cancel a call that has not run yet. Returns `true` if it was still pending.
    fn cancel(&self, handle: TimerHandle) -> bool;
}

/// Reject delays a scheduler cannot honour.
pub fn check_delay(name: &str, delay: Duration) -> PaceResult<()> {
    if delay > MAX_DELAY {
        return Err(PaceError::InvalidArgument(format!(
            "{} of {:?} exceeds the maximum of {:?}",
            name, delay, MAX_DELAY
        )));
    }
    Ok(())
}
