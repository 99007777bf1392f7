//! HTTP client for the app generator API.
//!
//! [`ApiClient`] owns the connection pool and cookie store. Logging in
//! consumes it and yields a [`Session`]; every follow-up request lives on
//! [`Session`], so nothing can be sent on behalf of a user whose login
//! failed. [`ApiClient::anonymous`] is the explicit opt-out for probes that
//! deliberately skip authentication.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{Credentials, ProbeConfig};
use crate::error::{ProbeError, Result};
use crate::stream::{SseScanner, StreamSummary};
use crate::types::{
    AppRecord, DeployRequest, EntityId, Envelope, GenerationRequest, LoginRequest, Page, PageQuery,
};

/// API paths, relative to the configured base URL and any path prefix it has.
pub mod endpoints {
    /// `POST` login.
    pub const LOGIN: &str = "api/user/login";
    /// `GET` one application.
    pub const APP_DETAIL: &str = "api/app/get/vo";
    /// `POST` the caller's applications.
    pub const MY_APPS: &str = "api/app/my/list/page/vo";
    /// `POST` all applications (admin only).
    pub const ADMIN_APPS: &str = "api/app/admin/list/page/vo";
    /// `POST` deploy an application.
    pub const DEPLOY: &str = "api/app/deploy";
    /// `GET` streamed code generation.
    pub const GENERATE: &str = "api/app/chat/gen/code";
}

/// A fully read response, kept raw so probes can print it verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Requested URL.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Body as text.
    pub body: String,
}

impl RawResponse {
    /// Whether the status is HTTP 200.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Fail with [`ProbeError::HttpStatus`] unless the status is 200.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::HttpStatus`] for any other status.
    pub fn require_ok(&self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(ProbeError::HttpStatus {
                url: self.url.clone(),
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    /// Decode the body as a response envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Decode`] if the body is not a matching envelope.
    pub fn envelope<T: DeserializeOwned>(&self) -> Result<Envelope<T>> {
        serde_json::from_str(&self.body).map_err(|e| ProbeError::Decode {
            url: self.url.clone(),
            message: e.to_string(),
        })
    }

    /// Status check, envelope check, then the payload.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`ProbeError`].
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        self.require_ok()?;
        self.envelope::<T>()?
            .into_result()?
            .ok_or(ProbeError::MissingData { url: self.url })
    }
}

/// Bounds for reading the streamed generation response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamLimits {
    /// Timeout for the whole request, body included.
    ///
    /// This bounds the total time spent on the stream, not the gap between
    /// two reads: a slow stream that keeps sending still ends as
    /// [`StreamEnd::TimedOut`] once it elapses.
    pub timeout: Duration,
    /// Each received block is cut into pieces of at most this many bytes.
    pub chunk_size: usize,
    /// Reading stops once this many pieces have been collected.
    pub max_chunks: usize,
}

/// Why reading the generation stream stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The chunk limit was reached and the connection was dropped.
    LimitReached,
    /// The server closed the stream.
    Completed,
    /// The timeout elapsed while the body was still streaming.
    TimedOut,
    /// The body failed for another reason.
    Failed(String),
}

/// What was read from the generation stream.
#[derive(Debug, Clone)]
pub struct GenerationCapture {
    /// HTTP status (always 200; other statuses are errors).
    pub status: u16,
    /// Collected pieces, in arrival order.
    pub chunks: Vec<Vec<u8>>,
    /// Why reading stopped.
    pub end: StreamEnd,
    /// Events recognised in the collected bytes.
    pub summary: StreamSummary,
}

/// A deployed page fetched for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFetch {
    /// Fetched URL.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Body as text.
    pub body: String,
}

/// Unauthenticated client: base URL plus an HTTP client with a cookie store.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str, request_timeout: Option<Duration>) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| ProbeError::InvalidUrl {
            input: base_url.to_string(),
            message: e.to_string(),
        })?;
        // `join` replaces the last path segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(concat!("appgen-probe/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ProbeError::ClientBuild)?;

        Ok(Self { http, base_url })
    }

    /// Create a client from the server section of a configuration.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::new`].
    pub fn from_config(config: &ProbeConfig) -> Result<Self> {
        Self::new(&config.server.base_url, config.request_timeout())
    }

    /// The configured base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an API path or an absolute URL against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidUrl`] if the result is not a valid URL.
    pub fn resolve(&self, target: &str) -> Result<Url> {
        self.base_url
            .join(target)
            .map_err(|e| ProbeError::InvalidUrl {
                input: target.to_string(),
                message: e.to_string(),
            })
    }

    /// Log in and turn this client into an authenticated [`Session`].
    ///
    /// Succeeds only on HTTP 200 with envelope `code == 0`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::HttpStatus`] or [`ProbeError::Api`] when the
    /// server refuses, or a transport error when it cannot be reached.
    pub async fn login(self, credentials: &Credentials) -> Result<Session> {
        let response = self.send_login(credentials).await?;
        self.accept_login(response)
    }

    /// Send the login request without judging the answer.
    ///
    /// Pair with [`ApiClient::accept_login`] when the raw exchange should be
    /// shown whatever the outcome.
    ///
    /// # Errors
    ///
    /// Fails only when the request itself cannot be completed.
    pub async fn send_login(&self, credentials: &Credentials) -> Result<RawResponse> {
        let url = self.resolve(endpoints::LOGIN)?;
        info!(account = %credentials.account, "Logging in");

        let request = self.http.post(url.clone()).json(&LoginRequest {
            user_account: &credentials.account,
            user_password: &credentials.password,
        });
        send(request, &url).await
    }

    /// Turn a login response into a [`Session`] if it reports success.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::HttpStatus`] for a non-200 status, and
    /// [`ProbeError::Api`] or [`ProbeError::Decode`] for a refused or
    /// unreadable envelope.
    pub fn accept_login(self, response: RawResponse) -> Result<Session> {
        response.require_ok()?;
        if let Err(e) = response.envelope::<Value>()?.into_result() {
            warn!(error = %e, "Login rejected");
            return Err(e);
        }

        info!("Login succeeded");
        Ok(Session {
            client: self,
            login: Some(response),
        })
    }

    /// Use this client without logging in.
    #[must_use]
    pub fn anonymous(self) -> Session {
        Session {
            client: self,
            login: None,
        }
    }
}

/// A client that has passed login (or explicitly skipped it).
#[derive(Debug, Clone)]
pub struct Session {
    client: ApiClient,
    login: Option<RawResponse>,
}

impl Session {
    /// Whether this session came from a successful login.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.login.is_some()
    }

    /// The raw login response, for verbose reports.
    #[must_use]
    pub const fn login_response(&self) -> Option<&RawResponse> {
        self.login.as_ref()
    }

    /// The underlying client.
    #[must_use]
    pub const fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Fetch one application record.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-200 status, non-zero code or a
    /// response without data.
    pub async fn app_detail(&self, id: EntityId) -> Result<AppRecord> {
        let url = self.client.resolve(endpoints::APP_DETAIL)?;
        debug!(%id, "Fetching app detail");
        let request = self.client.http.get(url.clone()).query(&[("id", id.0)]);
        send(request, &url).await?.into_data()
    }

    /// List the logged-in user's applications.
    ///
    /// # Errors
    ///
    /// See [`Session::app_detail`].
    pub async fn list_my_apps(&self, query: PageQuery) -> Result<Page<AppRecord>> {
        self.list(endpoints::MY_APPS, query).await
    }

    /// List every application (requires an admin account).
    ///
    /// # Errors
    ///
    /// See [`Session::app_detail`].
    pub async fn list_all_apps(&self, query: PageQuery) -> Result<Page<AppRecord>> {
        self.list(endpoints::ADMIN_APPS, query).await
    }

    async fn list(&self, path: &str, query: PageQuery) -> Result<Page<AppRecord>> {
        let url = self.client.resolve(path)?;
        debug!(%url, page_size = query.page_size, "Listing apps");
        let request = self.client.http.post(url.clone()).json(&query);
        send(request, &url).await?.into_data()
    }

    /// Trigger a deployment and return the raw response.
    ///
    /// The response is not interpreted here; see
    /// [`crate::checks::deploy_outcome`].
    ///
    /// # Errors
    ///
    /// Fails only when the request itself cannot be completed.
    pub async fn deploy(&self, app_id: EntityId) -> Result<RawResponse> {
        let url = self.client.resolve(endpoints::DEPLOY)?;
        info!(%app_id, "Triggering deployment");
        let request = self
            .client
            .http
            .post(url.clone())
            .json(&DeployRequest { app_id });
        send(request, &url).await
    }

    /// Start streamed code generation and read the beginning of the stream.
    ///
    /// Reading stops after `limits.max_chunks` pieces, at end of stream, or
    /// when `limits.timeout` elapses mid-body; dropping the response then
    /// closes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Timeout`] if no response head arrives in time and
    /// [`ProbeError::HttpStatus`] (with the body) for a non-200 answer.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        limits: &StreamLimits,
    ) -> Result<GenerationCapture> {
        let url = self.client.resolve(endpoints::GENERATE)?;
        info!(app_id = %request.app_id, adapt = ?request.adapt, "Starting code generation stream");

        let mut response = self
            .client
            .http
            .get(url.clone())
            .query(request)
            .header(ACCEPT, "text/event-stream")
            .timeout(limits.timeout)
            .send()
            .await
            .map_err(|e| ProbeError::from_reqwest(url.as_str(), e))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProbeError::HttpStatus {
                url: url.to_string(),
                status,
                body,
            });
        }

        let chunk_size = limits.chunk_size.max(1);
        let mut chunks: Vec<Vec<u8>> = Vec::new();
        let mut scanner = SseScanner::new();

        let end = 'read: loop {
            match response.chunk().await {
                Ok(Some(block)) => {
                    for piece in block.chunks(chunk_size) {
                        scanner.feed(piece);
                        chunks.push(piece.to_vec());
                        if chunks.len() >= limits.max_chunks {
                            break 'read StreamEnd::LimitReached;
                        }
                    }
                }
                Ok(None) => break StreamEnd::Completed,
                Err(e) if e.is_timeout() => break StreamEnd::TimedOut,
                Err(e) => break StreamEnd::Failed(e.to_string()),
            }
        };
        debug!(chunks = chunks.len(), ?end, "Stopped reading generation stream");

        Ok(GenerationCapture {
            status,
            chunks,
            end,
            summary: scanner.finish(),
        })
    }

    /// Fetch a deployed page. Relative URLs are resolved against the base URL.
    ///
    /// # Errors
    ///
    /// Fails on an invalid URL or when the request cannot be completed.
    pub async fn fetch_page(&self, target: &str, timeout: Duration) -> Result<PageFetch> {
        let url = self.client.resolve(target)?;
        debug!(%url, "Fetching deployed page");
        let request = self.client.http.get(url.clone()).timeout(timeout);
        let RawResponse { url, status, body } = send(request, &url).await?;
        Ok(PageFetch { url, status, body })
    }
}

async fn send(request: RequestBuilder, url: &Url) -> Result<RawResponse> {
    let response = request
        .send()
        .await
        .map_err(|e| ProbeError::from_reqwest(url.as_str(), e))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| ProbeError::from_reqwest(url.as_str(), e))?;
    debug!(%url, status, bytes = body.len(), "Response received");

    Ok(RawResponse {
        url: url.to_string(),
        status,
        body,
    })
}
