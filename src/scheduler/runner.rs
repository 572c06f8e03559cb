//! Daily run scheduler
//!
//! Triggers at most one scan per calendar day, a fixed lead time before the
//! day's earliest event. Ticks may arrive at any time and in any number; the
//! persisted run marker is the only gate.

use super::{RunState, RunStateStore, SchedulerError, SchedulerState, TickOutcome};
use crate::data::OpportunitySink;
use crate::scan::{RunSummary, ScanError, ScanPipeline};
use crate::sources::{LineSource, ScheduleSource, StatsSource};
use crate::telemetry::{self, CounterMetric};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::future::Future;

/// Unit of work the scheduler triggers
#[async_trait]
pub trait ScanJob: Send {
    async fn run(&mut self, date: NaiveDate) -> Result<RunSummary, ScanError>;
}

#[async_trait]
impl<L, S, O> ScanJob for ScanPipeline<L, S, O>
where
    L: LineSource,
    S: StatsSource,
    O: OpportunitySink,
{
    async fn run(&mut self, date: NaiveDate) -> Result<RunSummary, ScanError> {
        ScanPipeline::run(self, date).await
    }
}

/// Configuration for the run scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How long before the earliest event the scan should run
    pub lead: Duration,
    /// Extra slack allowing a run shortly before the target
    pub early_start_grace: Duration,
    /// Time zone defining the calendar day
    pub timezone: Tz,
    /// Daemon tick cadence
    pub tick_interval: std::time::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lead: Duration::hours(3),
            early_start_grace: Duration::zero(),
            timezone: Tz::UTC,
            tick_interval: std::time::Duration::from_secs(3600),
        }
    }
}

/// Drives the once-a-day state machine
pub struct RunScheduler<E, R, J> {
    config: SchedulerConfig,
    schedule: E,
    store: R,
    job: J,
    state: Option<SchedulerState>,
}

impl<E, R, J> RunScheduler<E, R, J>
where
    E: ScheduleSource,
    R: RunStateStore,
    J: ScanJob,
{
    pub fn new(config: SchedulerConfig, schedule: E, store: R, job: J) -> Self {
        Self {
            config,
            schedule,
            store,
            job,
            state: None,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// State after the most recent tick
    pub fn state(&self) -> Option<SchedulerState> {
        self.state
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    pub fn job(&self) -> &J {
        &self.job
    }

    /// Calendar day containing `now` in the configured time zone
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.config.timezone).date_naive()
    }

    /// Trigger instant for a day whose first event starts at `earliest`
    pub fn target_for(&self, earliest: DateTime<Utc>) -> DateTime<Utc> {
        earliest - self.config.lead
    }

    /// Evaluate the schedule once at `now`.
    ///
    /// Runs the scan when the day has not run yet and the trigger time has
    /// arrived. A failed scan is reported without marking the day, so the
    /// next tick tries again.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, SchedulerError> {
        let outcome = self.evaluate(now).await;
        let label = match &outcome {
            Ok(outcome) => outcome.label(),
            Err(_) => "error",
        };
        telemetry::increment_labeled(CounterMetric::SchedulerTicks, "outcome", label);
        outcome
    }

    async fn evaluate(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, SchedulerError> {
        let date = self.today(now);

        if self.store.has_run(date).await? {
            self.state = Some(SchedulerState::Ran { date });
            tracing::debug!(date = %date, "Already ran today");
            return Ok(TickOutcome::AlreadyRan);
        }

        let starts = self.schedule.event_starts(date).await?;
        let Some(earliest) = starts.into_iter().min() else {
            self.state = Some(SchedulerState::Idle { date });
            tracing::info!(date = %date, "No events today");
            return Ok(TickOutcome::NoEvents);
        };

        let target = self.target_for(earliest);
        if now < target - self.config.early_start_grace {
            self.state = Some(SchedulerState::RunPending { date, target });
            tracing::info!(
                date = %date,
                first_event = %earliest,
                target = %target,
                minutes_until = (target - now).num_minutes(),
                "Waiting for scan window"
            );
            return Ok(TickOutcome::Waiting { target });
        }

        tracing::info!(date = %date, first_event = %earliest, target = %target, "Running scheduled scan");

        match self.job.run(date).await {
            Ok(summary) => {
                let run_id = summary.run_id();
                let state = RunState::ran(date, target, Utc::now(), run_id);
                if let Err(source) = self.store.mark_ran(state).await {
                    self.state = Some(SchedulerState::RunPending { date, target });
                    tracing::error!(
                        date = %date,
                        run_id = %run_id,
                        error = %source,
                        "Scan recorded but day not marked, next tick will record it again"
                    );
                    return Err(SchedulerError::Unmarked { date, run_id, source });
                }
                self.state = Some(SchedulerState::Ran { date });
                Ok(TickOutcome::Ran {
                    run_id: summary.run_id(),
                    opportunities: summary.opportunities.len(),
                })
            }
            Err(e) => {
                self.state = Some(SchedulerState::RunPending { date, target });
                tracing::error!(date = %date, error = %e, "Scheduled scan failed, will retry next tick");
                Ok(TickOutcome::ScanFailed {
                    target,
                    error: e.to_string(),
                })
            }
        }
    }

    /// Tick on the configured cadence until `shutdown` resolves.
    ///
    /// Tick errors are logged and the loop continues.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        tokio::pin!(shutdown);

        tracing::info!(interval_secs = self.config.tick_interval.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
                _ = interval.tick() => {
                    match self.tick(Utc::now()).await {
                        Ok(outcome) => tracing::info!(outcome = %outcome, "Tick complete"),
                        Err(e) => tracing::error!(error = %e, "Tick failed"),
                    }
                }
            }
        }
    }
}
