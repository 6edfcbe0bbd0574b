use serde::{Deserialize, Serialize};

/// Counters kept by every debounced or throttled wrapper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStats {
    /// Calls made to the wrapper.
    pub invocations: u64,
    /// Times the underlying callback actually ran.
    pub fired: u64,
    /// Calls that never reached the callback: superseded by a newer call
    /// (debounce) or suppressed inside the interval (throttle).
    pub dropped: u64,
    /// Firings whose callback reported failure.
    pub failed: u64,
}

impl CallStats {
    pub(crate) fn record_invocation(&mut self) {
        self.invocations += 1;
    }

    pub(crate) fn record_fired(&mut self, failed: bool) {
        self.fired += 1;
        if failed {
            self.failed += 1;
        }
    }

    pub(crate) fn record_dropped(&mut self) {
        self.dropped += 1;
    }

    /// Share of invocations that reached the callback.
    pub fn fire_ratio(&self) -> f64 {
        if self.invocations == 0 {
            0.0
        } else {
            self.fired as f64 / self.invocations as f64
        }
    }
}
