pub mod clock;
pub mod config;
pub mod config_validator;
pub mod debounce;
pub mod error;
pub mod metrics;
pub mod outcome;
pub mod scheduler;
pub mod throttle;
pub mod ticker;

pub use clock::{Clock, MonotonicClock};
pub use config::Config;
pub use debounce::{debounce, Debounced};
pub use error::{PaceError, PaceResult};
pub use metrics::CallStats;
pub use outcome::Outcome;
pub use scheduler::{ManualScheduler, Scheduler, TimerHandle, TokioScheduler};
pub use throttle::{throttle, Throttled};
pub use ticker::Ticker;
