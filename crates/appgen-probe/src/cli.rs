//! Command-line interface.

use std::path::PathBuf;

use appgen_probe_core::{EntityId, ProbeConfig};
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::logging::LogOptions;

/// Diagnostic probes for the app generator HTTP API.
#[derive(Parser, Debug)]
#[command(name = "appgen-probe", version, about)]
pub struct Cli {
    /// Options shared by every subcommand
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Probe to run
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand. Each one overrides the configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file [default: appgen-probe.toml in the platform config directory]
    #[arg(long, global = true, value_name = "FILE", env = "APPGEN_PROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the API server
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Account to log in with
    #[arg(long, global = true)]
    pub account: Option<String>,

    /// Password to log in with
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Timeout applied to every request, in seconds (0 disables it)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Write logs to stderr as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Also write JSON logs to daily files in this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Exit with status 1 when any probe step failed
    #[arg(long, global = true)]
    pub strict: bool,
}

impl GlobalArgs {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut ProbeConfig) {
        if let Some(base_url) = &self.base_url {
            config.server.base_url.clone_from(base_url);
        }
        if let Some(account) = &self.account {
            config.credentials.account.clone_from(account);
        }
        if let Some(password) = &self.password {
            config.credentials.password.clone_from(password);
        }
        if let Some(timeout) = self.timeout {
            config.server.request_timeout_secs = timeout;
        }
    }

    /// Logging setup requested on the command line.
    #[must_use]
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            verbosity: self.verbose,
            json: self.json_logs,
            log_dir: self.log_dir.clone(),
        }
    }

    /// Whether the run should end with a failing exit status.
    #[must_use]
    pub const fn exit_failure(&self, failures: usize) -> bool {
        self.strict && failures > 0
    }
}

/// Available probes.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch app records and check their generation type
    Inspect(InspectArgs),

    /// Deploy apps by id
    Deploy(DeployArgs),

    /// Log in verbosely, list your own apps and deploy each of them
    DeployMine(DeployMineArgs),

    /// List all apps (admin), deploy those of the expected type and verify the pages
    DeployVue(DeployVueArgs),

    /// Stream code generation with an adapt type, then check the stored type
    Adapt(AdaptArgs),

    /// Print the effective configuration with the password masked
    Config,
}

/// `inspect` arguments.
#[derive(Args, Debug, Clone, Default)]
pub struct InspectArgs {
    /// App ids [default: the configured known ids]
    #[arg(value_name = "ID")]
    pub ids: Vec<EntityId>,

    /// Expected generation type [default: apps.expected_code_gen_type]
    #[arg(long, value_name = "TYPE")]
    pub expected: Option<String>,
}

/// `deploy` arguments.
#[derive(Args, Debug, Clone, Default)]
pub struct DeployArgs {
    /// App ids [default: the known ids, or apps.deploy_id with --anonymous]
    #[arg(value_name = "ID")]
    pub ids: Vec<EntityId>,

    /// Skip login and deploy without a session
    #[arg(long)]
    pub anonymous: bool,

    /// Fetch each deploy URL and check that it serves HTML
    #[arg(long)]
    pub verify: bool,
}

/// `deploy-mine` arguments.
#[derive(Args, Debug, Clone, Default)]
pub struct DeployMineArgs {
    /// Page size of the listing [default: listing.my_page_size]
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..=20))]
    pub page_size: Option<u64>,

    /// Fetch each deploy URL and check that it serves HTML
    #[arg(long)]
    pub verify: bool,
}

/// `deploy-vue` arguments.
#[derive(Args, Debug, Clone, Default)]
pub struct DeployVueArgs {
    /// Page size of the admin listing [default: listing.admin_page_size]
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub page_size: Option<u64>,

    /// How many matching apps to deploy [default: listing.deploy_limit]
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: Option<u64>,

    /// Generation type to select [default: apps.expected_code_gen_type]
    #[arg(long, value_name = "TYPE")]
    pub expected: Option<String>,
}

/// `adapt` arguments.
#[derive(Args, Debug, Clone, Default)]
pub struct AdaptArgs {
    /// App to generate code for [default: generation.app_id]
    #[arg(long, value_name = "ID")]
    pub app_id: Option<EntityId>,

    /// Chat message [default: generation.message]
    #[arg(long)]
    pub message: Option<String>,

    /// Generation type to adapt to [default: generation.adapt]
    #[arg(long, value_name = "TYPE")]
    pub adapt: Option<String>,
}
