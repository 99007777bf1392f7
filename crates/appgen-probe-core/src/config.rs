//! Probe configuration management.
//!
//! Layers, lowest precedence first:
//! - Built-in defaults (local dev server, the test account, the known app ids)
//! - A TOML file (`--config <path>` or `appgen-probe.toml` in the platform
//!   config directory)
//! - Environment variables `APPGEN_PROBE__<SECTION>__<KEY>`
//!
//! Command-line flags are applied on top by the binary.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::types::{CodeGenType, EntityId};

/// Prefix of the environment variables read by [`ProbeConfig::load`].
pub const ENV_PREFIX: &str = "APPGEN_PROBE";

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "appgen-probe.toml";

/// The list endpoint for the caller's own apps refuses pages above this size.
pub const MAX_MY_PAGE_SIZE: u64 = 20;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// No platform config directory could be determined.
    #[error("Cannot determine the platform config directory")]
    NoConfigDir,

    /// The effective configuration could not be rendered as TOML.
    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    /// A single field holds an invalid value.
    #[error("Invalid value for '{field}': {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields hold invalid values.
    #[error("Configuration has {} invalid values: {}", .0.len(), join_errors(.0))]
    MultipleValidationErrors(Vec<ConfigError>),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Complete probe configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Where the API lives.
    pub server: ServerConfig,
    /// Who to log in as.
    pub credentials: Credentials,
    /// Which apps to probe.
    pub apps: AppsConfig,
    /// Page sizes for the list endpoints.
    pub listing: ListingConfig,
    /// Streamed code generation probe.
    pub generation: GenerationConfig,
    /// Deployed page verification.
    pub verify: VerifyConfig,
}

/// API server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL; endpoint paths are joined onto it.
    pub base_url: String,
    /// Timeout applied to every request, in seconds. `0` disables it.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8100".to_string(),
            request_timeout_secs: 0,
        }
    }
}

/// Login credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Account name.
    pub account: String,
    /// Password.
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            account: "qu100".to_string(),
            password: "12345678".to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Application ids and expectations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppsConfig {
    /// Apps that have a `vue_project_<id>` directory on the generator host.
    pub known_ids: Vec<EntityId>,
    /// App deployed by default when none is given.
    pub deploy_id: EntityId,
    /// The generation type the probes expect.
    pub expected_code_gen_type: String,
}

impl Default for AppsConfig {
    fn default() -> Self {
        Self {
            known_ids: [
                1,
                326_124_693_326_557_184,
                326_394_947_705_458_688,
                326_400_125_011_709_952,
                326_402_496_173_395_968,
                326_402_925_988_892_672,
                326_403_535_287_046_144,
                326_404_132_828_565_504,
                326_404_808_065_372_160,
            ]
            .into_iter()
            .map(EntityId)
            .collect(),
            deploy_id: EntityId(326_404_132_828_565_504),
            expected_code_gen_type: CodeGenType::VUE_PROJECT.to_string(),
        }
    }
}

/// List endpoint paging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Page size for the caller's own apps (server maximum 20).
    pub my_page_size: u64,
    /// Page size for the admin listing.
    pub admin_page_size: u64,
    /// How many matching apps the admin deploy probe deploys.
    pub deploy_limit: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            my_page_size: MAX_MY_PAGE_SIZE,
            admin_page_size: 100,
            deploy_limit: 3,
        }
    }
}

/// Streamed code generation probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// App to generate code for.
    pub app_id: EntityId,
    /// Chat message sent with the request.
    pub message: String,
    /// Generation type passed as `adapt`.
    pub adapt: String,
    /// Timeout for the whole streamed request, in seconds.
    pub timeout_secs: u64,
    /// Size of the chunks the stream is cut into.
    pub chunk_size: usize,
    /// Number of leading chunks printed.
    pub preview_chunks: usize,
    /// Bytes shown of each printed chunk.
    pub preview_bytes: usize,
    /// Reading stops after this many chunks.
    pub max_chunks: usize,
    /// Pause before re-reading the app, in seconds.
    pub settle_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            app_id: EntityId(326_124_693_326_557_184),
            message: "Update to use Vue 3 composition API".to_string(),
            adapt: CodeGenType::VUE_PROJECT.to_string(),
            timeout_secs: 10,
            chunk_size: 1024,
            preview_chunks: 3,
            preview_bytes: 100,
            max_chunks: 5,
            settle_secs: 2,
        }
    }
}

impl GenerationConfig {
    /// Streamed request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Pause before re-reading the app.
    #[must_use]
    pub const fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

/// Deployed page verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Timeout for fetching a deployed page, in seconds.
    pub timeout_secs: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl VerifyConfig {
    /// Deployed page fetch timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ProbeConfig {
    /// Load configuration from the default file location and the process
    /// environment.
    ///
    /// `path` replaces the default file location; unlike the default file it
    /// must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or the result is invalid.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`ProbeConfig::load`], but reads environment variables from `env`
    /// instead of the process environment when given.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or the result is invalid.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config file");
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                if let Ok(default) = Self::default_path() {
                    tracing::debug!(path = %default.display(), "Looking for default config file");
                    builder = builder.add_source(
                        File::from(default.as_path())
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("apps.known_ids")
            .source(env);

        let config: Self = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Location of the per-user config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] when the platform has no home
    /// directory to derive it from.
    pub fn default_path() -> ConfigResult<PathBuf> {
        directories::ProjectDirs::from("", "", "appgen-probe")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Validate every field, collecting all problems.
    ///
    /// # Errors
    ///
    /// Returns a single [`ConfigError::ValidationError`] or
    /// [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        let mut invalid = |field: &str, message: &str| {
            errors.push(ConfigError::ValidationError {
                field: field.to_string(),
                message: message.to_string(),
            });
        };

        match Url::parse(&self.server.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(_) => invalid("server.base_url", "scheme must be http or https"),
            Err(e) => invalid("server.base_url", &e.to_string()),
        }
        if self.credentials.account.trim().is_empty() {
            invalid("credentials.account", "must not be empty");
        }
        if self.apps.expected_code_gen_type.trim().is_empty() {
            invalid("apps.expected_code_gen_type", "must not be empty");
        }
        if !(1..=MAX_MY_PAGE_SIZE).contains(&self.listing.my_page_size) {
            invalid(
                "listing.my_page_size",
                "must be between 1 and 20 (server limit)",
            );
        }
        if self.listing.admin_page_size == 0 {
            invalid("listing.admin_page_size", "must be at least 1");
        }
        if self.listing.deploy_limit == 0 {
            invalid("listing.deploy_limit", "must be at least 1");
        }
        if self.generation.timeout_secs == 0 {
            invalid("generation.timeout_secs", "must be at least 1");
        }
        if self.generation.chunk_size == 0 {
            invalid("generation.chunk_size", "must be at least 1");
        }
        if self.generation.max_chunks == 0 {
            invalid("generation.max_chunks", "must be at least 1");
        }
        if self.verify.timeout_secs == 0 {
            invalid("verify.timeout_secs", "must be at least 1");
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// Global request timeout, if one is configured.
    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        match self.server.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Render the configuration as TOML with the password masked.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Render`] if serialization fails.
    pub fn to_redacted_toml(&self) -> ConfigResult<String> {
        let mut shown = self.clone();
        if !shown.credentials.password.is_empty() {
            shown.credentials.password = "********".to_string();
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}
