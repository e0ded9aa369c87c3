//! Periodic driver for the reminder sweeps.
//!
//! Uses tokio-cron-scheduler to run the upcoming, overdue, and escalation
//! sweeps on fixed cron schedules. Sweeps are independent jobs; a failing
//! sweep run is logged and the schedule carries on.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{debug, error, info};

use crate::error::BadgerResult;
use crate::reminders::{ReminderEngine, SweepReport};

/// Cron schedules and horizons for the periodic sweeps.
///
/// Cron expressions are six-field with leading seconds. All jobs share the
/// engine's single throttle keyspace, so overlapping schedules cannot
/// double-notify inside one cooldown window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderScheduleConfig {
    /// Wide-horizon deadline sweep (default: daily at 09:00).
    pub upcoming_daily_cron: String,
    /// Horizon of the daily sweep in hours (default: 24).
    pub upcoming_daily_horizon_hours: i64,
    /// Narrow-horizon deadline sweep (default: hourly at minute 0).
    pub upcoming_hourly_cron: String,
    /// Horizon of the hourly sweep in hours (default: 3).
    pub upcoming_hourly_horizon_hours: i64,
    /// Overdue sweep (default: daily at 18:00).
    pub overdue_cron: String,
    /// Escalation sweep (default: daily at 10:00).
    pub escalation_cron: String,
    /// Minimum age before an unresolved mention escalates (default: 24).
    pub escalation_age_hours: i64,
}

impl Default for ReminderScheduleConfig {
    fn default() -> Self {
        Self {
            upcoming_daily_cron: "0 0 9 * * *".to_string(),
            upcoming_daily_horizon_hours: 24,
            upcoming_hourly_cron: "0 0 * * * *".to_string(),
            upcoming_hourly_horizon_hours: 3,
            overdue_cron: "0 0 18 * * *".to_string(),
            escalation_cron: "0 0 10 * * *".to_string(),
            escalation_age_hours: 24,
        }
    }
}

impl ReminderScheduleConfig {
    /// Set both upcoming horizons, clamped to at least one hour.
    pub fn with_upcoming_horizons(mut self, daily_hours: i64, hourly_hours: i64) -> Self {
        self.upcoming_daily_horizon_hours = daily_hours.max(1);
        self.upcoming_hourly_horizon_hours = hourly_hours.max(1);
        self
    }

    /// Set the escalation age threshold.
    pub fn with_escalation_age_hours(mut self, hours: i64) -> Self {
        self.escalation_age_hours = hours.max(0);
        self
    }
}

/// Scheduler for the periodic reminder sweeps.
///
/// Wraps tokio-cron-scheduler to run the ReminderEngine's sweeps on the
/// configured cron schedules.
///
/// # Example
///
/// ```ignore
/// use badger_core::reminders::{ReminderScheduler, ReminderScheduleConfig};
/// use std::sync::Arc;
///
/// # async fn example(engine: Arc<badger_core::reminders::ReminderEngine>)
/// # -> Result<(), Box<dyn std::error::Error>> {
/// let scheduler = ReminderScheduler::with_defaults(engine).await?;
/// scheduler.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct ReminderScheduler {
    scheduler: JobScheduler,
    engine: Arc<ReminderEngine>,
    config: ReminderScheduleConfig,
}

impl ReminderScheduler {
    /// Create a new ReminderScheduler.
    ///
    /// Note: Call `start()` to begin periodic execution.
    pub async fn new(
        engine: Arc<ReminderEngine>,
        config: ReminderScheduleConfig,
    ) -> Result<Self, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            engine,
            config,
        })
    }

    /// Create a scheduler with the default schedules.
    pub async fn with_defaults(engine: Arc<ReminderEngine>) -> Result<Self, JobSchedulerError> {
        Self::new(engine, ReminderScheduleConfig::default()).await
    }

    /// Get the schedule configuration.
    pub fn config(&self) -> &ReminderScheduleConfig {
        &self.config
    }

    /// Register the four sweep jobs and start the scheduler.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        let engine = self.engine.clone();
        let horizon = self.config.upcoming_daily_horizon_hours;
        let daily = Job::new_async(
            self.config.upcoming_daily_cron.as_str(),
            move |_uuid, _lock| {
                let engine = engine.clone();
                Box::pin(async move {
                    debug!(job = "upcoming-daily", "sweep starting");
                    if let Err(e) = engine.sweep_upcoming(horizon).await {
                        error!(error = %e, job = "upcoming-daily", "sweep failed");
                    }
                })
            },
        )?;
        self.scheduler.add(daily).await?;

        let engine = self.engine.clone();
        let horizon = self.config.upcoming_hourly_horizon_hours;
        let hourly = Job::new_async(
            self.config.upcoming_hourly_cron.as_str(),
            move |_uuid, _lock| {
                let engine = engine.clone();
                Box::pin(async move {
                    debug!(job = "upcoming-hourly", "sweep starting");
                    if let Err(e) = engine.sweep_upcoming(horizon).await {
                        error!(error = %e, job = "upcoming-hourly", "sweep failed");
                    }
                })
            },
        )?;
        self.scheduler.add(hourly).await?;

        let engine = self.engine.clone();
        let overdue = Job::new_async(self.config.overdue_cron.as_str(), move |_uuid, _lock| {
            let engine = engine.clone();
            Box::pin(async move {
                debug!(job = "overdue-daily", "sweep starting");
                if let Err(e) = engine.sweep_overdue().await {
                    error!(error = %e, job = "overdue-daily", "sweep failed");
                }
            })
        })?;
        self.scheduler.add(overdue).await?;

        let engine = self.engine.clone();
        let age = self.config.escalation_age_hours;
        let escalation = Job::new_async(
            self.config.escalation_cron.as_str(),
            move |_uuid, _lock| {
                let engine = engine.clone();
                Box::pin(async move {
                    debug!(job = "escalation-daily", "sweep starting");
                    if let Err(e) = engine.sweep_escalations(age).await {
                        error!(error = %e, job = "escalation-daily", "sweep failed");
                    }
                })
            },
        )?;
        self.scheduler.add(escalation).await?;

        self.scheduler.start().await?;

        info!(
            upcoming_daily = %self.config.upcoming_daily_cron,
            upcoming_hourly = %self.config.upcoming_hourly_cron,
            overdue = %self.config.overdue_cron,
            escalation = %self.config.escalation_cron,
            "reminder scheduler started"
        );

        Ok(())
    }

    /// Stop the scheduler gracefully.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        info!("shutting down reminder scheduler");
        self.scheduler.shutdown().await
    }

    /// Run the wide upcoming sweep and the overdue sweep immediately,
    /// outside the cron schedule.
    pub async fn run_now(&self) -> BadgerResult<(SweepReport, SweepReport)> {
        let upcoming = self
            .engine
            .sweep_upcoming(self.config.upcoming_daily_horizon_hours)
            .await?;
        let overdue = self.engine.sweep_overdue().await?;
        Ok((upcoming, overdue))
    }

    /// Get the underlying engine.
    pub fn engine(&self) -> &Arc<ReminderEngine> {
        &self.engine
    }
}
