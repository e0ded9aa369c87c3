//! Scheduled reminder sweeps and notification throttling.

pub mod engine;
pub mod scheduler;
pub mod throttle;

pub use engine::{ItemOutcome, ReminderEngine, SweepReport};
pub use scheduler::{ReminderScheduleConfig, ReminderScheduler};
pub use throttle::{NotificationThrottle, DEFAULT_COOLDOWN_MINUTES};
