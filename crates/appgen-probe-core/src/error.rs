//! Unified error types for the probe core library.
//!
//! [`ProbeError`] covers every way a probe step can fail: the transport gave
//! up, the server answered with a non-200 status, or the response envelope
//! carried a non-zero `code`. Configuration has its own [`ConfigError`]
//! (see [`crate::config`]) which converts into [`ProbeError`].
//!
//! # Example
//!
//! ```rust
//! use appgen_probe_core::error::{ProbeError, Result};
//!
//! fn require_success(code: i64, message: &str) -> Result<()> {
//!     if code != 0 {
//!         return Err(ProbeError::Api {
//!             code,
//!             message: message.to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_success(0, "ok").is_ok());
//! assert!(require_success(40100, "not logged in").unwrap_err().is_auth_error());
//! ```

use thiserror::Error;

use crate::types::api_code;

/// The unified error type for all probe operations.
#[derive(Debug, Error)]
pub enum ProbeError {
    // =========================================================================
    // TRANSPORT ERRORS
    // =========================================================================
    /// The request did not complete within its timeout.
    #[error("Request to {url} timed out")]
    Timeout {
        /// Target URL.
        url: String,
    },

    /// The request could not be sent or its body could not be read.
    #[error("Request to {url} failed: {source}")]
    Transport {
        /// Target URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    // =========================================================================
    // RESPONSE ERRORS
    // =========================================================================
    /// The server answered with something other than HTTP 200.
    #[error("Request to {url} returned HTTP {status}")]
    HttpStatus {
        /// Target URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept for diagnostics.
        body: String,
    },

    /// The response envelope carried a non-zero `code`.
    #[error("API returned code {code}: {message}")]
    Api {
        /// Envelope code.
        code: i64,
        /// Envelope message (empty when the server sent none).
        message: String,
    },

    /// The envelope reported success but carried no `data`.
    #[error("API response from {url} carried no data")]
    MissingData {
        /// Target URL.
        url: String,
    },

    /// The response body was not the JSON shape we expected.
    #[error("Failed to decode response from {url}: {message}")]
    Decode {
        /// Target URL.
        url: String,
        /// Decoder message.
        message: String,
    },

    // =========================================================================
    // SETUP ERRORS
    // =========================================================================
    /// A URL could not be built from the configured base URL or a server value.
    #[error("Invalid URL '{input}': {message}")]
    InvalidUrl {
        /// The offending input.
        input: String,
        /// Parser message.
        message: String,
    },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// The configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A specialized [`Result`] type for probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

impl ProbeError {
    /// Wrap a client error, separating timeouts from other transport failures.
    #[must_use]
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Transport { url, source }
        }
    }

    /// Returns `true` if the request hit its timeout.
    #[inline]
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the server could not be reached or stopped answering.
    #[inline]
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }

    /// Returns `true` if the server answered but rejected the request at the
    /// application level.
    #[inline]
    #[must_use]
    pub const fn is_api_error(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::MissingData { .. })
    }

    /// Returns `true` if the server refused the request for lack of a valid
    /// session or permission.
    #[inline]
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        match self {
            Self::Api { code, .. } => matches!(
                *code,
                api_code::NOT_LOGIN | api_code::NO_AUTH | api_code::FORBIDDEN
            ),
            Self::HttpStatus { status, .. } => matches!(*status, 401 | 403),
            _ => false,
        }
    }

    /// The HTTP status carried by this error, if any.
    #[inline]
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for ProbeError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::Load(e) => Self::Config(e.to_string()),
            ConfigError::NoConfigDir => {
                Self::Config("cannot determine the platform config directory".to_string())
            }
            ConfigError::Render(e) => Self::Config(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::Config(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                Self::Config(messages.join("; "))
            }
        }
    }
}
