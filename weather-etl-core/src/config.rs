use anyhow::{Context, Result, anyhow, ensure};
use chrono::{DateTime, TimeZone, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{dag::RetryPolicy, model::Location, scheduler::parse_schedule};

/// Open-Meteo endpoint and query settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,

    /// Whole-request timeout in milliseconds.
    pub timeout_ms: u64,

    /// Values of the `current=` query parameter.
    pub current_fields: Vec<String>,

    pub timezone: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            timeout_ms: 10_000,
            current_fields: vec![
                "temperature_2m".to_string(),
                "relative_humidity_2m".to_string(),
                "weather_code".to_string(),
            ],
            timezone: "UTC".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Where weather files are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let dir = project_dirs()
            .map(|dirs| dirs.data_dir().join("data"))
            .unwrap_or_else(|| PathBuf::from("data"));
        Self { dir }
    }
}

/// DAG registration: identity, cadence and retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagConfig {
    pub dag_id: String,
    pub description: String,
    pub owner: String,

    /// Cron expression or shorthand, e.g. `@daily` or `0 6 * * *`.
    pub schedule: String,

    /// No run fires before this instant.
    pub start_date: DateTime<Utc>,

    /// Extra attempts per task after the first failure.
    pub retries: u32,
    pub retry_delay_secs: u64,

    pub tags: Vec<String>,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            dag_id: "weather_etl".to_string(),
            description: "Daily weather ETL pipeline with fetch, transform, and save tasks"
                .to_string(),
            owner: "weather-etl".to_string(),
            schedule: "@daily".to_string(),
            start_date: Utc
                .with_ymd_and_hms(2026, 1, 13, 0, 0, 0)
                .single()
                .unwrap_or_default(),
            retries: 1,
            retry_delay_secs: 5 * 60,
            tags: vec!["etl".to_string(), "weather".to_string()],
        }
    }
}

impl DagConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [output]
/// dir = "/var/lib/weather-etl/data"
///
/// [dag]
/// schedule = "@daily"
/// retries = 1
/// retry_delay_secs = 300
/// ```
///
/// The pipeline always reports on London; `location` is not read from or
/// written to the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub location: Location,
    pub api: ApiConfig,
    pub output: OutputConfig,
    pub dag: DagConfig,
}

impl Config {
    /// Load config from the default location, or defaults if there is no file yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load config from an explicit file. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs =
            project_dirs().ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.api.timeout_ms > 0, "api.timeout_ms must be greater than zero");
        ensure!(
            !self.api.current_fields.is_empty(),
            "api.current_fields must list at least one field"
        );
        ensure!(!self.output.dir.as_os_str().is_empty(), "output.dir must not be empty");
        parse_schedule(&self.dag.schedule)?;
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "weather-etl", "weather-etl")
}
