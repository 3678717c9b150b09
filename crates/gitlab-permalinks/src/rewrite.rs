//! Permalink rewriting: scan, resolve, render, splice.
//!
//! Candidates are resolved and applied from the rightmost match to the
//! leftmost. Splicing a snippet only ever moves text to its right, so the
//! offsets of candidates still waiting to be applied stay valid.
//!
//! With `fetch_concurrency > 1` several fetches run at once, but results are
//! still applied one at a time in descending-offset order.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn, Level};

use crate::anchor::{extract_lines, resolve_anchor};
use crate::config::PermalinkConfig;
use crate::error::{FetchError, InvalidBaseUrl, SkipReason};
use crate::fetch::{ContentFetcher, FetchOutcome, FileRequest};
use crate::grammar::{PermalinkGrammar, Replacement};
use crate::render::render_snippet;

/// Rewrites GitLab permalinks in message text into code previews.
///
/// Holds no per-message state and can be shared across tasks behind an `Arc`.
pub struct PermalinkRewriter {
    fetcher: Arc<dyn ContentFetcher>,
    grammar: PermalinkGrammar,
    config: PermalinkConfig,
}

impl PermalinkRewriter {
    /// Rewriter for links pointing at the instance at `base_url`.
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        base_url: &str,
        config: PermalinkConfig,
    ) -> Result<Self, InvalidBaseUrl> {
        Ok(Self::with_grammar(
            fetcher,
            PermalinkGrammar::new(base_url)?,
            config,
        ))
    }

    pub fn with_grammar(
        fetcher: Arc<dyn ContentFetcher>,
        grammar: PermalinkGrammar,
        config: PermalinkConfig,
    ) -> Self {
        Self {
            fetcher,
            grammar,
            config,
        }
    }

    pub fn config(&self) -> &PermalinkConfig {
        &self.config
    }

    pub fn grammar(&self) -> &PermalinkGrammar {
        &self.grammar
    }

    /// Permalinks that [`rewrite`](Self::rewrite) would try, ascending by offset.
    pub fn candidates(&self, message: &str) -> Vec<Replacement> {
        self.grammar.candidates(message, self.config.max_replacements)
    }

    /// Replace every resolvable permalink in `message` with a code preview.
    ///
    /// Never fails: links that cannot be previewed are left as they are.
    #[instrument(
        skip(self, message),
        fields(
            message_len = message.len(),
            candidates = tracing::field::Empty,
            replaced = tracing::field::Empty
        )
    )]
    pub async fn rewrite(&self, message: &str) -> String {
        let candidates = self.candidates(message);
        tracing::Span::current().record("candidates", candidates.len());
        if candidates.is_empty() {
            return message.to_string();
        }

        let snippets: Vec<Option<String>> = stream::iter(candidates.iter().rev())
            .map(|r| self.resolve_logged(r))
            .buffered(self.config.fetch_concurrency.max(1))
            .collect()
            .await;

        let mut out = message.to_string();
        let mut replaced = 0usize;
        for (r, snippet) in candidates.iter().rev().zip(snippets) {
            let Some(snippet) = snippet else {
                continue;
            };
            if splice(&mut out, r, &snippet) {
                replaced += 1;
            }
        }

        tracing::Span::current().record("replaced", replaced);
        if replaced > 0 {
            debug!(replaced, "Permalinks rewritten");
        }
        out
    }

    async fn resolve_logged(&self, r: &Replacement) -> Option<String> {
        match self.resolve(r).await {
            Ok(snippet) => Some(snippet),
            Err(reason) => {
                log_skip(r, &reason);
                None
            }
        }
    }

    /// Produce the snippet for one candidate.
    async fn resolve(&self, r: &Replacement) -> Result<String, SkipReason> {
        let info = &r.info;
        if info.commit.is_empty() || !info.commit.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SkipReason::InvalidCommitHash(info.commit.clone()));
        }

        let range = resolve_anchor(&info.line, self.config.line_context)?
            .clamp_to(self.config.max_preview_lines);

        let request = FileRequest {
            owner: &info.user,
            repo: &info.repo,
            commit: &info.commit,
            path: &info.path,
        };
        let timeout = self.config.fetch_timeout;
        let outcome = tokio::time::timeout(timeout, self.fetcher.fetch(&request, timeout))
            .await
            .map_err(|_| FetchError::Timeout)??;

        let file = match outcome {
            FetchOutcome::File(file) => file,
            FetchOutcome::NotAFile => return Err(SkipReason::NotAFile),
        };
        let content = file.decode()?;
        let lines = extract_lines(&content, range)?;

        Ok(render_snippet(
            &info.user,
            &info.repo,
            &info.path,
            &r.word,
            &lines,
            range.truncated,
        ))
    }
}

fn log_skip(r: &Replacement, reason: &SkipReason) {
    let level = reason.level();
    if level == Level::WARN {
        warn!(file = %r.info.path, index = r.index, "{reason}");
    } else if level == Level::TRACE {
        trace!(anchor = %r.info.line, index = r.index, "{reason}");
    } else {
        debug!(
            path = %r.info.path,
            hash = %r.info.commit,
            index = r.index,
            error = %reason,
            "Skipping permalink"
        );
    }
}

/// Replace the first occurrence of `r.word` at or after `r.index`.
///
/// Identical link text elsewhere in the message is left alone.
fn splice(message: &mut String, r: &Replacement, snippet: &str) -> bool {
    let Some(offset) = message.get(r.index..).and_then(|tail| tail.find(&r.word)) else {
        return false;
    };
    let start = r.index + offset;
    message.replace_range(start..start + r.word.len(), snippet);
    true
}
