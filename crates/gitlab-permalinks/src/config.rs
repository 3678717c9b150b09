//! Tunables for the rewrite engine and the GitLab client.

use serde::Deserialize;
use std::time::Duration;

/// Default cap on permalink occurrences considered per message.
pub const DEFAULT_MAX_REPLACEMENTS: usize = 10;

/// Default per-fetch timeout (5 seconds).
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default maximum span of a preview before it is truncated.
pub const DEFAULT_MAX_PREVIEW_LINES: usize = 10;

/// Default lines shown before and after a single-line anchor.
pub const DEFAULT_LINE_CONTEXT: usize = 3;

/// Default GitLab instance.
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";

/// Engine limits, injected at construction so tests can pick boundary values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PermalinkConfig {
    /// Occurrences beyond this many matches are ignored (DoS guard).
    pub max_replacements: usize,
    /// Upper bound on a single content fetch.
    #[serde(rename = "fetch_timeout_secs", deserialize_with = "de_secs")]
    pub fetch_timeout: Duration,
    /// Ranges longer than this are clamped and marked truncated.
    pub max_preview_lines: usize,
    /// Padding around a single-line anchor.
    pub line_context: usize,
    /// Fetches allowed in flight at once. `1` is fully sequential.
    pub fetch_concurrency: usize,
}

impl Default for PermalinkConfig {
    fn default() -> Self {
        Self {
            max_replacements: DEFAULT_MAX_REPLACEMENTS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_preview_lines: DEFAULT_MAX_PREVIEW_LINES,
            line_context: DEFAULT_LINE_CONTEXT,
            fetch_concurrency: 1,
        }
    }
}

fn de_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}

/// Connection settings for [`GitLabClient`](crate::GitLabClient).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GitLabConfig {
    /// Instance root, e.g. `https://gitlab.example.com`.
    pub base_url: String,
    /// Personal/project access token sent as `PRIVATE-TOKEN`.
    pub token: Option<String>,
    pub user_agent: String,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GITLAB_URL.to_string(),
            token: None,
            user_agent: concat!("gitlab-permalinks/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl GitLabConfig {
    /// Apply `GITLAB_URL` and `GITLAB_TOKEN` overrides. Empty values are ignored.
    pub fn with_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `get`, keyed by environment variable name.
    pub fn apply_overrides(mut self, get: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| get(key).filter(|v| !v.is_empty());
        if let Some(url) = get("GITLAB_URL") {
            self.base_url = url;
        }
        if let Some(token) = get("GITLAB_TOKEN") {
            self.token = Some(token);
        }
        self
    }
}
