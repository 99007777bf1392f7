//! Logging initialization.
//!
//! Logs always go to stderr so stdout carries only the probe report:
//! - compact text by default, JSON with `--json-logs`
//! - optionally a daily-rolling JSON file in `--log-dir`

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Fallback level variable, read when `RUST_LOG` is unset.
pub const LOG_LEVEL_ENV: &str = "APPGEN_PROBE_LOG_LEVEL";

/// Keeps the non-blocking file writer alive for the lifetime of the program.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// How logging should be set up.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Number of `-v` flags.
    pub verbosity: u8,
    /// JSON instead of compact text on stderr.
    pub json: bool,
    /// Directory for daily log files.
    pub log_dir: Option<PathBuf>,
}

/// Pick the filter directive.
///
/// `-v` wins over the environment; otherwise `RUST_LOG`, then
/// `APPGEN_PROBE_LOG_LEVEL`, then `warn`.
#[must_use]
pub fn filter_directive(
    verbosity: u8,
    rust_log: Option<String>,
    level_env: Option<String>,
) -> String {
    let set = |value: Option<String>| value.filter(|s| !s.trim().is_empty());
    match verbosity {
        0 => set(rust_log)
            .or_else(|| set(level_env))
            .unwrap_or_else(|| "warn".to_string()),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Initialize the global subscriber.
///
/// # Errors
///
/// Returns an error if the filter does not parse, the log directory cannot be
/// created, or a subscriber is already installed.
pub fn init(options: &LogOptions) -> anyhow::Result<()> {
    let directive = filter_directive(
        options.verbosity,
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        std::env::var(LOG_LEVEL_ENV).ok(),
    );
    let env_filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("Invalid log filter '{directive}'"))?;

    let (text_layer, json_layer) = if options.json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true);
        (None, Some(layer))
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true);
        (Some(layer), None)
    };

    let file_layer = match &options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create log directory {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "appgen-probe");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .context("Logging is already initialized")?;

    Ok(())
}
