//! Core library for the `weather-etl` pipeline.
//!
//! This crate defines:
//! - The three pipeline stages: fetch (Open-Meteo), transform, save
//! - The per-run hand-off that carries each stage's result to the next
//! - A DAG runner applying the per-task retry policy
//! - A cron-driven scheduler that triggers one run per occurrence
//! - Configuration loading and saving
//!
//! It is used by `weather-etl`, but the stages can be driven by any other
//! orchestrator through [`stage::transform`], [`stage::persist`] and the
//! [`WeatherSource`] trait.

pub mod clock;
pub mod config;
pub mod dag;
pub mod error;
pub mod handoff;
pub mod model;
pub mod scheduler;
pub mod stage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ApiConfig, Config, DagConfig, OutputConfig};
pub use dag::{Dag, RetryPolicy, RunSummary};
pub use error::{FetchError, MissingDataError, PersistError, StageError};
pub use handoff::{RunContext, RunId, RunKind};
pub use model::{Location, NormalizedWeatherRecord, RawWeatherResponse, WeatherReading};
pub use scheduler::{ScheduleError, Scheduler};
pub use stage::{OpenMeteoSource, TaskId, WeatherSource};
