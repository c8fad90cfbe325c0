//! Cron-driven trigger for the weather DAG.
//!
//! One run is started per schedule occurrence. Occurrences missed while the
//! process was down (or busy with a long run) are skipped, never backfilled.

use std::{future::Future, str::FromStr};

use chrono::{DateTime, TimeDelta, Utc};
use cron::Schedule;
use thiserror::Error;

use crate::{dag::Dag, handoff::RunId};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid schedule expression '{expr}': {reason}")]
    Parse { expr: String, reason: String },

    #[error("schedule '{0}' has no upcoming occurrences")]
    Exhausted(String),
}

/// Parse a schedule expression.
///
/// Accepts shorthands such as `@daily`, standard 5-field cron (seconds are
/// pinned to zero) and the 6/7-field form the `cron` crate uses natively.
pub fn parse_schedule(expr: &str) -> Result<Schedule, ScheduleError> {
    Schedule::from_str(&normalize_cron_expr(expr)).map_err(|e| ScheduleError::Parse {
        expr: expr.to_string(),
        reason: e.to_string(),
    })
}

fn normalize_cron_expr(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// First occurrence at or after `start_date` that is not in the past.
pub fn next_fire_time(
    schedule: &Schedule,
    start_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let anchor = if start_date > now {
        // `after` is exclusive; step back so `start_date` itself can fire.
        start_date - TimeDelta::seconds(1)
    } else {
        now
    };
    schedule.after(&anchor).next()
}

/// Drives a [`Dag`] on a cron schedule.
#[derive(Debug)]
pub struct Scheduler {
    dag: Dag,
    schedule: Schedule,
    expr: String,
    start_date: DateTime<Utc>,
}

impl Scheduler {
    pub fn new(dag: Dag, expr: &str, start_date: DateTime<Utc>) -> Result<Self, ScheduleError> {
        Ok(Self {
            dag,
            schedule: parse_schedule(expr)?,
            expr: expr.to_string(),
            start_date,
        })
    }

    /// The next `count` fire times from now.
    pub fn upcoming(&self, count: usize) -> Vec<DateTime<Utc>> {
        let now = self.dag.clock().now();
        let Some(first) = next_fire_time(&self.schedule, self.start_date, now) else {
            return Vec::new();
        };

        std::iter::once(first)
            .chain(self.schedule.after(&first))
            .take(count)
            .collect()
    }

    /// Next fire time, never repeating `last_fired` even if the clock reads
    /// earlier than it.
    fn next_occurrence(
        &self,
        now: DateTime<Utc>,
        last_fired: Option<DateTime<Utc>>,
    ) -> Result<DateTime<Utc>, ScheduleError> {
        let anchor = last_fired.map_or(now, |last| now.max(last));
        next_fire_time(&self.schedule, self.start_date, anchor)
            .ok_or_else(|| ScheduleError::Exhausted(self.expr.clone()))
    }

    /// Run the DAG at every fire time until `shutdown` resolves.
    ///
    /// A failed run is logged and the loop carries on with the next
    /// occurrence. Each occurrence fires at most once.
    pub async fn serve<S>(&self, shutdown: S) -> Result<(), ScheduleError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut last_fired = None;

        loop {
            let now = self.dag.clock().now();
            let fire_at = self.next_occurrence(now, last_fired)?;
            let wait = (fire_at - now).to_std().unwrap_or_default();

            tracing::info!(next_run = %fire_at, ?wait, "Waiting for next scheduled run");

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Scheduler shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(wait) => {}
            }
            last_fired = Some(fire_at);

            match self.dag.run(RunId::scheduled(fire_at)).await {
                Ok(summary) => tracing::info!(
                    run_id = %summary.run_id,
                    path = %summary.output_path.display(),
                    "Scheduled run succeeded"
                ),
                Err(err) => tracing::error!(
                    run_id = %RunId::scheduled(fire_at),
                    error = %err,
                    "Scheduled run failed"
                ),
            }
        }
    }
}
