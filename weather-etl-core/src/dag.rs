//! Sequential execution of the weather DAG for a single run.
//!
//! Each task reads the previous task's result from the [`RunContext`] and
//! pushes its own. A task that still fails after the retry policy is
//! exhausted halts the run.

use std::{future::Future, path::PathBuf, sync::Arc, time::Duration};

use crate::{
    clock::{Clock, SystemClock},
    config::Config,
    error::{FetchError, StageError},
    handoff::{RunContext, RunId},
    model::{Location, NormalizedWeatherRecord},
    stage::{self, OpenMeteoSource, TaskId, WeatherSource},
};

/// Per-task retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            retry_delay: Duration::from_secs(5 * 60),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            retry_delay: Duration::ZERO,
        }
    }

    /// Run `op` until it succeeds or the policy is exhausted.
    pub async fn run<T, F, Fut>(&self, task: TaskId, mut op: F) -> Result<T, StageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StageError>>,
    {
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt <= self.retries => {
                    tracing::warn!(
                        %task,
                        attempt,
                        error = %err,
                        "Task failed, retrying in {:?}",
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(%task, attempt, error = %err, "Task failed");
                    return Err(err);
                }
            }
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    pub output_path: PathBuf,
    pub record: NormalizedWeatherRecord,
}

/// The fetch → transform → save chain plus everything it needs.
#[derive(Debug, Clone)]
pub struct Dag {
    source: Arc<dyn WeatherSource>,
    clock: Arc<dyn Clock>,
    location: Location,
    output_dir: PathBuf,
    retry: RetryPolicy,
}

impl Dag {
    pub fn new(
        source: Arc<dyn WeatherSource>,
        clock: Arc<dyn Clock>,
        location: Location,
        output_dir: PathBuf,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            clock,
            location,
            output_dir,
            retry,
        }
    }

    /// Wire the DAG against Open-Meteo and the system clock.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let source = OpenMeteoSource::new(&config.api, &config.location)?;
        Ok(Self::new(
            Arc::new(source),
            Arc::new(SystemClock),
            config.location.clone(),
            config.output.dir.clone(),
            config.dag.retry_policy(),
        ))
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[tracing::instrument(name = "run", skip_all, fields(run_id = %run_id))]
    pub async fn run(&self, run_id: RunId) -> Result<RunSummary, StageError> {
        let mut ctx = RunContext::new(run_id);

        let source = self.source.as_ref();
        let raw = self
            .retry
            .run(TaskId::FetchWeather, move || async move {
                source.fetch_current().await.map_err(StageError::from)
            })
            .await?;
        ctx.push_fetch(raw);

        let record = {
            let (ctx, location, clock) = (&ctx, &self.location, self.clock.as_ref());
            self.retry
                .run(TaskId::TransformWeather, move || async move {
                    stage::transform(ctx.fetched(), location, clock)
                })
                .await?
        };
        ctx.push_transform(record.clone());

        let path = {
            let (ctx, output_dir, clock) = (&ctx, self.output_dir.as_path(), self.clock.as_ref());
            self.retry
                .run(TaskId::SaveWeather, move || async move {
                    stage::persist(ctx.transformed(), output_dir, clock)
                })
                .await?
        };

        tracing::info!(path = %path.display(), "Run finished");
        Ok(RunSummary {
            run_id: ctx.run_id().clone(),
            output_path: path,
            record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::FixedClock, model::RawWeatherResponse};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Fails the first `failures` calls, then returns `payload`.
    #[derive(Debug)]
    struct FlakySource {
        failures: usize,
        calls: AtomicUsize,
        payload: Value,
    }

    impl FlakySource {
        fn new(failures: usize, payload: Value) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
                payload,
            }
        }
    }

    #[async_trait]
    impl WeatherSource for FlakySource {
        async fn fetch_current(&self) -> Result<RawWeatherResponse, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(FetchError::Status {
                    status: reqwest::StatusCode::BAD_GATEWAY,
                    body: "try later".to_string(),
                })
            } else {
                Ok(RawWeatherResponse::new(self.payload.clone()))
            }
        }
    }

    fn retry_once() -> RetryPolicy {
        RetryPolicy {
            retries: 1,
            retry_delay: Duration::ZERO,
        }
    }

    fn dag(source: Arc<FlakySource>, out: PathBuf) -> Dag {
        let at = Utc.with_ymd_and_hms(2026, 1, 13, 10, 0, 0).unwrap();
        Dag::new(
            source,
            Arc::new(FixedClock(at)),
            Location::london(),
            out,
            retry_once(),
        )
    }

    fn run_id() -> RunId {
        RunId::manual(Utc.with_ymd_and_hms(2026, 1, 13, 10, 0, 0).unwrap())
    }

    fn payload() -> Value {
        json!({ "current": { "temperature_2m": 15.3, "relative_humidity_2m": 80, "weather_code": 3 } })
    }

    #[tokio::test]
    async fn fetch_is_retried_once_then_run_completes() {
        let dir = tempdir().unwrap();
        let source = Arc::new(FlakySource::new(1, payload()));

        let summary = dag(source.clone(), dir.path().to_path_buf())
            .run(run_id())
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            summary.output_path,
            dir.path().join("weather_20260113_100000.json")
        );
        assert_eq!(summary.record.weather.weather_code, Some(3.into()));
    }

    #[tokio::test]
    async fn second_fetch_failure_halts_run_without_output() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("data");
        let source = Arc::new(FlakySource::new(2, payload()));

        let err = dag(source.clone(), out.clone())
            .run(run_id())
            .await
            .unwrap_err();

        assert!(matches!(err, StageError::Fetch(_)), "got {err:?}");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn empty_payload_fails_transform_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("data");
        let source = Arc::new(FlakySource::new(0, json!({})));

        let err = dag(source, out.clone()).run(run_id()).await.unwrap_err();

        assert!(matches!(err, StageError::MissingData(_)), "got {err:?}");
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn retry_policy_none_makes_a_single_attempt() {
        let dir = tempdir().unwrap();
        let source = Arc::new(FlakySource::new(1, payload()));

        let result = dag(source.clone(), dir.path().to_path_buf())
            .with_retry(RetryPolicy::none())
            .run(run_id())
            .await;

        assert!(result.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_policy_is_one_retry_after_five_minutes() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retries, 1);
        assert_eq!(policy.retry_delay, Duration::from_secs(300));
    }
}
