//! GitLab REST API file fetcher with a circuit breaker.
//!
//! Reads files through the repository files endpoint:
//!
//! ```text
//! GET {base}/api/v4/projects/{user%2Frepo}/repository/files/{path}?ref={commit}
//! ```
//!
//! Authentication is optional; when a token is configured it is sent as
//! `PRIVATE-TOKEN`. Nothing is cached between calls.
//!
//! ## Circuit breaker
//! After `CIRCUIT_BREAKER_THRESHOLD` consecutive transport failures or 5xx
//! responses, the client stops making HTTP calls for
//! `CIRCUIT_BREAKER_COOLDOWN` and fails fast instead.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

use crate::config::{GitLabConfig, DEFAULT_FETCH_TIMEOUT};
use crate::error::{ClientError, FetchError, InvalidBaseUrl};
use crate::fetch::{ContentFetcher, FetchOutcome, FileRequest, RemoteFile};

/// Number of consecutive failures before circuit opens.
const CIRCUIT_BREAKER_THRESHOLD: u32 = 5;

/// How long the circuit stays open (60 seconds).
const CIRCUIT_BREAKER_COOLDOWN: Duration = Duration::from_secs(60);

/// Circuit breaker state.
#[derive(Debug)]
struct CircuitBreaker {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    fn new() -> Self {
        Self {
            consecutive_failures: 0,
            opened_at: None,
        }
    }

    /// Returns true if requests should be allowed through.
    fn allow_request(&self) -> bool {
        match self.opened_at {
            // Allow a probe request after cooldown
            Some(opened_at) => opened_at.elapsed() > CIRCUIT_BREAKER_COOLDOWN,
            None => true,
        }
    }

    fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.opened_at = None;
    }

    fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures >= CIRCUIT_BREAKER_THRESHOLD {
            if self.opened_at.is_none() {
                warn!(
                    threshold = CIRCUIT_BREAKER_THRESHOLD,
                    cooldown_secs = CIRCUIT_BREAKER_COOLDOWN.as_secs(),
                    "GitLab API circuit breaker opened"
                );
            }
            self.opened_at = Some(Instant::now());
        }
    }
}

/// Body of the repository files endpoint.
///
/// Anything that is not a file object (e.g. a tree listing from a proxy or
/// an older API) lands in `Other`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FilesApiBody {
    File { encoding: String, content: String },
    Other(serde::de::IgnoredAny),
}

/// [`ContentFetcher`] backed by a GitLab instance.
pub struct GitLabClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    circuit: Mutex<CircuitBreaker>,
}

impl GitLabClient {
    pub fn new(config: GitLabConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(InvalidBaseUrl {
                url: config.base_url,
                reason: "cannot be a base URL".to_string(),
            }
            .into());
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_FETCH_TIMEOUT)
            .user_agent(&config.user_agent)
            .build()?;

        if config.token.is_some() {
            debug!(base_url = %base_url, "GitLab client initialized with token authentication");
        } else {
            debug!(base_url = %base_url, "GitLab client initialized without token");
        }

        Ok(Self {
            http,
            base_url,
            token: config.token,
            circuit: Mutex::new(CircuitBreaker::new()),
        })
    }

    fn check_circuit(&self) -> bool {
        self.circuit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .allow_request()
    }

    fn record_success(&self) {
        self.circuit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_success();
    }

    fn record_failure(&self) {
        self.circuit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_failure();
    }

    /// Endpoint URL for one file at one ref.
    fn file_url(&self, request: &FileRequest<'_>) -> Url {
        let project = format!("{}/{}", request.owner, request.repo);
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in `new`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "api",
                "v4",
                "projects",
                project.as_str(),
                "repository",
                "files",
                request.path,
            ]);
        }
        url.query_pairs_mut().append_pair("ref", request.commit);
        url
    }

    /// Build a request with optional auth header.
    fn request(&self, url: Url, timeout: Duration) -> reqwest::RequestBuilder {
        let mut req = self.http.get(url).timeout(timeout);
        if let Some(ref token) = self.token {
            req = req.header("PRIVATE-TOKEN", token);
        }
        req
    }
}

#[async_trait]
impl ContentFetcher for GitLabClient {
    async fn fetch(
        &self,
        request: &FileRequest<'_>,
        timeout: Duration,
    ) -> Result<FetchOutcome, FetchError> {
        if !self.check_circuit() {
            debug!("GitLab circuit breaker open, skipping file fetch");
            return Err(FetchError::Transport("circuit breaker open".to_string()));
        }

        let url = self.file_url(request);
        debug!(url = %url, "Fetching file from GitLab");

        let resp = match self.request(url, timeout).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, path = %request.path, "GitLab API request failed");
                self.record_failure();
                return Err(e.into());
            }
        };

        let status = resp.status();
        if status.is_server_error() {
            warn!(status = %status, path = %request.path, "GitLab API returned server error");
            self.record_failure();
            return Err(FetchError::Status(status.as_u16()));
        }
        self.record_success();

        match status.as_u16() {
            200..=299 => {}
            404 => return Err(FetchError::NotFound),
            401 | 403 => return Err(FetchError::Unauthorized(status.as_u16())),
            other => return Err(FetchError::Status(other)),
        }

        match resp.json::<FilesApiBody>().await? {
            FilesApiBody::File { encoding, content } => {
                Ok(FetchOutcome::File(RemoteFile { encoding, content }))
            }
            FilesApiBody::Other(_) => Ok(FetchOutcome::NotAFile),
        }
    }
}
