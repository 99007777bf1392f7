//! # appgen-probe-core
//!
//! Client and checks for probing the app generator HTTP API.
//!
//! This crate provides:
//! - An authenticated HTTP session (cookie store + login) over the API
//! - Typed wire types for the `{code, message, data}` response envelope
//! - Read-only diagnostic checks on what the server returned
//! - Layered configuration (defaults, TOML file, environment)
//!
//! ## Architecture
//!
//! - [`client`] - [`ApiClient`] and the authenticated [`Session`]
//! - [`checks`] - generation type comparison, page classification, deploy outcomes
//! - [`config`] - configuration loading and validation
//! - [`error`] - unified error types for the crate
//! - [`stream`] - scanner for the code generation event stream
//! - [`types`] - envelope, application record, paging and request bodies

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod checks;
pub mod client;
pub mod config;
pub mod error;
pub mod stream;
pub mod types;

// Re-export primary types for convenience
pub use checks::{
    check_code_gen_type, classify_page, deploy_outcome, filter_by_code_gen_type,
    project_dir_name, CodeGenCheck, DeployOutcome, PageKind,
};
pub use client::{
    endpoints, ApiClient, GenerationCapture, PageFetch, RawResponse, Session, StreamEnd,
    StreamLimits,
};
pub use config::{ConfigError, ConfigResult, Credentials, ProbeConfig};
pub use error::{ProbeError, Result};
pub use stream::{SseScanner, StreamSummary};
pub use types::{
    api_code, AppRecord, CodeGenType, EntityId, Envelope, GenerationRequest, Page, PageQuery,
};
