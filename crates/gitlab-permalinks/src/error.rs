//! Error types for permalink resolution.

use thiserror::Error;
use tracing::Level;

/// Why a single permalink occurrence was left untouched.
///
/// None of these ever reach the caller of
/// [`PermalinkRewriter::rewrite`](crate::PermalinkRewriter::rewrite); they are
/// logged and the link stays as raw text.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("bad git commit hash in permalink: {0}")]
    InvalidCommitHash(String),

    #[error("error while fetching file contents: {0}")]
    FetchFailed(#[from] FetchError),

    #[error("permalink is not a file")]
    NotAFile,

    #[error("error while decoding file contents: {0}")]
    DecodeFailed(String),

    #[error("invalid line anchor: {0:?}")]
    InvalidLineAnchor(String),

    #[error("line numbers out of range: {start}-{end}")]
    LineRangeOutOfBounds { start: usize, end: usize },
}

impl SkipReason {
    /// Log severity for this skip.
    ///
    /// A path that resolves to something other than a regular file is the
    /// only anomaly. A missing or malformed anchor is not worth reporting at
    /// all; everything else is routine.
    pub fn level(&self) -> Level {
        match self {
            SkipReason::NotAFile => Level::WARN,
            SkipReason::InvalidLineAnchor(_) => Level::TRACE,
            _ => Level::DEBUG,
        }
    }
}

/// Failure reported by a [`ContentFetcher`](crate::ContentFetcher).
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("file not found")]
    NotFound,

    #[error("request timed out")]
    Timeout,

    #[error("unauthorized (HTTP {0})")]
    Unauthorized(u16),

    #[error("remote returned HTTP {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// The configured GitLab base URL has no usable host.
#[derive(Debug, Error)]
#[error("invalid GitLab base URL {url:?}: {reason}")]
pub struct InvalidBaseUrl {
    pub url: String,
    pub reason: String,
}

/// Failure constructing a [`GitLabClient`](crate::GitLabClient).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    BaseUrl(#[from] InvalidBaseUrl),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_decode() {
            FetchError::InvalidResponse(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}
