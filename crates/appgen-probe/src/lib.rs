//! # appgen-probe
//!
//! Command-line probes for the app generator HTTP API. Each subcommand logs
//! in, exercises one part of the API and prints what the server answered.
//!
//! - [`cli`] - argument parsing and configuration overrides
//! - [`commands`] - the probes
//! - [`logging`] - tracing subscriber setup
//! - [`report`] - the console report

#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod logging;
pub mod report;
