use std::{env, io::IsTerminal};

use tracing_subscriber::filter::EnvFilter;

/// Install the global tracing subscriber.
///
/// - `RUST_LOG` wins when set; otherwise `WEATHER_ETL_LOG_LEVEL`
///   (`trace`..`error`, default `info`) applies to everything.
/// - Colors follow TTY detection, overridden by `FORCE_COLOR=1|true|yes`
///   or `FORCE_COLOR=0|false|no`.
///
/// Logs go to stderr so `show-config` and `next` output stays pipeable.
pub fn init_tracing() {
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stderr().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("WEATHER_ETL_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("{level},hyper=warn,reqwest=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
