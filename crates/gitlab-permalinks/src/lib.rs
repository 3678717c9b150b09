//! GitLab permalink previews for chat messages.
//!
//! Rewrites commit-pinned GitLab file links such as
//! `https://gitlab.com/owner/repo/-/blob/<sha>/src/main.rs#L10-20` into an
//! inline, syntax-hinted code block showing the referenced lines.
//!
//! ## Pipeline
//!
//! ```text
//! message ─► scan ─► exclude ─► resolve (hash, anchor, fetch, decode, lines) ─► render ─► splice
//! ```
//!
//! Rewriting is **fail-open**: any permalink that cannot be resolved stays in
//! the message as raw text and the reason is logged. The rewrite operation
//! itself never fails.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gitlab_permalinks::{GitLabClient, GitLabConfig, PermalinkConfig, PermalinkRewriter};
//!
//! let gitlab = GitLabConfig::default();
//! let client = GitLabClient::new(gitlab.clone())?;
//! let rewriter = PermalinkRewriter::new(Arc::new(client), &gitlab.base_url, PermalinkConfig::default())?;
//! let body = rewriter.rewrite("see https://gitlab.com/a/b/-/blob/abc123/lib.rs#L5").await;
//! ```

pub mod anchor;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod grammar;
pub mod render;
pub mod rewrite;

pub use anchor::{extract_lines, resolve_anchor, LineRange};
pub use client::GitLabClient;
pub use config::{GitLabConfig, PermalinkConfig};
pub use error::{ClientError, FetchError, InvalidBaseUrl, SkipReason};
pub use fetch::{ContentFetcher, FetchOutcome, FileRequest, RemoteFile};
pub use grammar::{is_inside_link, PermalinkGrammar, PermalinkInfo, Replacement};
pub use render::render_snippet;
pub use rewrite::PermalinkRewriter;
