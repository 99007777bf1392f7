//! Probe commands.
//!
//! A probe prints what the server answered and counts failed steps on the
//! [`Reporter`]; server-side failures never become errors here. The only
//! errors returned are console write failures.

mod adapt;
mod deploy;
mod inspect;
mod print_config;

use std::io::Write;

use anyhow::Result;
use appgen_probe_core::{ApiClient, ProbeConfig, Session};
use tracing::debug;

use crate::cli::Command;
use crate::report::Reporter;

/// Run one command against the configured server.
///
/// # Errors
///
/// Returns an error only when the report cannot be written.
pub async fn run<W: Write>(
    command: &Command,
    config: &ProbeConfig,
    report: &mut Reporter<W>,
) -> Result<()> {
    debug!(?command, base_url = %config.server.base_url, "Running probe");
    match command {
        Command::Inspect(args) => inspect::run(config, args, report).await,
        Command::Deploy(args) => deploy::run(config, args, report).await,
        Command::DeployMine(args) => deploy::run_mine(config, args, report).await,
        Command::DeployVue(args) => deploy::run_vue(config, args, report).await,
        Command::Adapt(args) => adapt::run(config, args, report).await,
        Command::Config => print_config::run(config, report),
    }
}

fn build_client<W: Write>(
    config: &ProbeConfig,
    report: &mut Reporter<W>,
) -> Result<Option<ApiClient>> {
    match ApiClient::from_config(config) {
        Ok(client) => Ok(Some(client)),
        Err(e) => {
            report.fail(format_args!("Cannot create HTTP client: {e}"))?;
            Ok(None)
        }
    }
}

/// Log in, or report why not. `verbose` also prints the raw login exchange.
async fn open_session<W: Write>(
    config: &ProbeConfig,
    report: &mut Reporter<W>,
    verbose: bool,
) -> Result<Option<Session>> {
    let Some(client) = build_client(config, report)? else {
        return Ok(None);
    };

    if !verbose {
        return match client.login(&config.credentials).await {
            Ok(session) => {
                report.ok("Login succeeded")?;
                Ok(Some(session))
            }
            Err(e) => {
                report.fail(format_args!("Login failed: {e}"))?;
                Ok(None)
            }
        };
    }

    report.step("Logging in")?;
    report.field("Account", &config.credentials.account)?;
    let response = match client.send_login(&config.credentials).await {
        Ok(response) => response,
        Err(e) => {
            report.fail(format_args!("Login failed: {e}"))?;
            return Ok(None);
        }
    };
    report.field("Status", response.status)?;
    report.field("Response", &response.body)?;

    match client.accept_login(response) {
        Ok(session) => {
            report.ok("Login succeeded")?;
            Ok(Some(session))
        }
        Err(e) => {
            report.fail(format_args!("Login failed: {e}"))?;
            Ok(None)
        }
    }
}

/// Display an optional string the way the report shows absent values.
fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or("None")
}
