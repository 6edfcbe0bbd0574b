//! Monotonic time sources.

use std::time::Instant;

/// A monotonic clock consulted by the throttler.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Clock backed by tokio's instant, so a paused tokio runtime also pauses it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monotonic_clock_follows_paused_time() {
        let clock = MonotonicClock::new();
        let start = clock.now();
        tokio::time::advance(std::time::Duration::from_millis(250)).await;
        assert_eq!(
            clock.now().duration_since(start),
            std::time::Duration::from_millis(250)
        );
    }
}
