use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::SecondsFormat;
use clap::{Parser, Subcommand};
use inquire::{CustomType, Text, error::CustomUserError, validator::Validation};
use weather_etl_core::{Config, Dag, RetryPolicy, RunId, Scheduler, scheduler::parse_schedule};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-etl", version, about = "Daily weather ETL pipeline")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run fetch → transform → save once, now.
    Run {
        /// Fail on the first error instead of applying the retry policy.
        #[arg(long)]
        no_retry: bool,
    },

    /// Run the pipeline on its schedule until interrupted.
    Schedule,

    /// Print upcoming scheduled run times.
    Next {
        #[arg(long, short = 'n', default_value_t = 5)]
        count: usize,
    },

    /// Interactively edit output directory, schedule and retry policy.
    Configure,

    /// Print the effective configuration as TOML.
    ShowConfig,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Run { no_retry } => {
                let config = load_config(self.config.as_deref())?;
                let mut dag = Dag::from_config(&config).context("Failed to set up weather DAG")?;
                if no_retry {
                    dag = dag.with_retry(RetryPolicy::none());
                }

                let run_id = RunId::manual(dag.clock().now());
                let summary = dag
                    .run(run_id)
                    .await
                    .context("Weather ETL run failed")?;

                println!("{}", summary.output_path.display());
            }
            Command::Schedule => {
                let config = load_config(self.config.as_deref())?;
                let scheduler = scheduler_from(&config)?;

                tracing::info!(
                    dag_id = %config.dag.dag_id,
                    description = %config.dag.description,
                    owner = %config.dag.owner,
                    tags = ?config.dag.tags,
                    schedule = %config.dag.schedule,
                    output_dir = %config.output.dir.display(),
                    "Starting scheduler (Ctrl-C to stop)"
                );

                scheduler
                    .serve(async {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                        }
                    })
                    .await?;
            }
            Command::Next { count } => {
                let config = load_config(self.config.as_deref())?;
                for at in scheduler_from(&config)?.upcoming(count) {
                    println!("{}", at.to_rfc3339_opts(SecondsFormat::Secs, true));
                }
            }
            Command::Configure => {
                let path = match self.config {
                    Some(path) => path,
                    None => Config::config_file_path()?,
                };
                let config = if path.exists() {
                    Config::load_from(&path)?
                } else {
                    Config::default()
                };

                let config = prompt_config(config)?;
                config.save_to(&path)?;
                println!("Saved configuration to {}", path.display());
            }
            Command::ShowConfig => {
                let config = load_config(self.config.as_deref())?;
                print!("{}", config.to_toml()?);
            }
        }

        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn scheduler_from(config: &Config) -> anyhow::Result<Scheduler> {
    let dag = Dag::from_config(config).context("Failed to set up weather DAG")?;
    let scheduler = Scheduler::new(dag, &config.dag.schedule, config.dag.start_date)?;
    Ok(scheduler)
}

fn prompt_config(mut config: Config) -> anyhow::Result<Config> {
    let output_dir = Text::new("Output directory:")
        .with_default(&config.output.dir.display().to_string())
        .prompt()?;

    let schedule = Text::new("Schedule (cron expression or @daily/@hourly):")
        .with_default(&config.dag.schedule)
        .with_validator(|input: &str| {
            Ok::<_, CustomUserError>(match parse_schedule(input) {
                Ok(_) => Validation::Valid,
                Err(e) => Validation::Invalid(e.to_string().into()),
            })
        })
        .prompt()?;

    let retries = CustomType::<u32>::new("Retries per task:")
        .with_default(config.dag.retries)
        .with_error_message("Please type a whole number")
        .prompt()?;

    let retry_delay_mins = CustomType::<u64>::new("Retry delay (minutes):")
        .with_default(config.dag.retry_delay_secs / 60)
        .with_error_message("Please type a whole number")
        .prompt()?;

    config.output.dir = PathBuf::from(output_dir);
    config.dag.schedule = schedule;
    config.dag.retries = retries;
    config.dag.retry_delay_secs = retry_delay_mins * 60;

    config.validate()?;
    Ok(config)
}
