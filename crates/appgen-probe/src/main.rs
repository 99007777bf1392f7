//! appgen-probe
//!
//! Diagnostic probes for the app generator HTTP API.
//!
//! # Configuration
//!
//! Built-in defaults, then `appgen-probe.toml` (or `--config <FILE>`), then
//! `APPGEN_PROBE__<SECTION>__<KEY>` environment variables, then flags.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Optional. Log filter (default: warn)
//! - `APPGEN_PROBE_LOG_LEVEL`: Optional. Log level used when `RUST_LOG` is unset
//! - `APPGEN_PROBE_CONFIG`: Optional. Same as `--config`

use std::process::ExitCode;

use anyhow::{Context, Result};
use appgen_probe::cli::Cli;
use appgen_probe::commands;
use appgen_probe::logging;
use appgen_probe::report::Reporter;
use appgen_probe_core::ProbeConfig;
use clap::Parser;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    logging::init(&cli.global.log_options()).context("Failed to initialize logging")?;

    let mut config = ProbeConfig::load(cli.global.config.as_deref())
        .context("Failed to load configuration")?;
    cli.global.apply(&mut config);
    config
        .validate()
        .context("Invalid configuration after applying command-line flags")?;

    info!(
        base_url = %config.server.base_url,
        account = %config.credentials.account,
        "Configuration loaded"
    );

    let mut report = Reporter::new(std::io::stdout());
    commands::run(&cli.command, &config, &mut report)
        .await
        .context("Failed to write report")?;
    report.flush().context("Failed to write report")?;

    let failures = report.failures();
    if failures > 0 {
        warn!(failures, "Some probe steps failed");
    }

    if cli.global.exit_failure(failures) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
