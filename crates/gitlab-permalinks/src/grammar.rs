//! Permalink detection in message body text.
//!
//! Recognizes commit-pinned GitLab file views:
//!
//! ```text
//! https://[www.]<host>/<user>/<repo>/-/blob/<commit>/<path>[#L<n>[-<m>]]
//! ```
//!
//! Matches that already sit inside a markdown link (`[label](url)`), as
//! either the label or the target, are dropped so the rewriter never
//! produces nested markdown.

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::error::InvalidBaseUrl;

/// Parsed coordinates of one permalink occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermalinkInfo {
    /// The URL carried a `www.` prefix.
    pub has_www: bool,
    pub user: String,
    pub repo: String,
    /// Commit reference as written; validated as hex later.
    pub commit: String,
    pub path: String,
    /// Raw anchor fragment (`L10`, `L10-20`), empty when absent.
    pub line: String,
}

impl PermalinkInfo {
    /// Project path in `user/repo` form.
    pub fn project_path(&self) -> String {
        format!("{}/{}", self.user, self.repo)
    }
}

/// One candidate substitution.
///
/// `index` is a byte offset into the *original* message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub index: usize,
    pub word: String,
    #[serde(flatten)]
    pub info: PermalinkInfo,
}

/// URL grammar bound to a single GitLab host.
#[derive(Debug, Clone)]
pub struct PermalinkGrammar {
    host: String,
    re: Regex,
}

impl PermalinkGrammar {
    /// Build the grammar for the instance at `base_url`.
    ///
    /// Scheme and a leading `www.` are ignored; a non-default port and a
    /// path prefix (`https://example.com/gitlab`) are kept.
    pub fn new(base_url: &str) -> Result<Self, InvalidBaseUrl> {
        let invalid = |reason: &str| InvalidBaseUrl {
            url: base_url.to_string(),
            reason: reason.to_string(),
        };

        let parsed = Url::parse(base_url).map_err(|e| invalid(&e.to_string()))?;
        let host = parsed.host_str().ok_or_else(|| invalid("missing host"))?;
        let host = host.strip_prefix("www.").unwrap_or(host);
        let host = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let prefix = parsed.path().trim_end_matches('/');

        // ASCII word characters only
        let pattern = format!(
            r"https?://(?P<haswww>www\.)?(?i:{}){}/(?P<user>(?-u:[\w-])+)/(?P<repo>(?-u:[\w.-])+)/-/blob/(?P<commit>(?-u:\w)+)/(?P<path>(?-u:[\w./-])+)(?:#(?P<line>(?-u:[\w-])+))?",
            regex::escape(&host),
            regex::escape(prefix)
        );
        let re = Regex::new(&pattern).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self { host, re })
    }

    /// Host (with port, if any) this grammar matches.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Every permalink in `msg`, non-overlapping, in ascending offset order.
    pub fn find_all<'a>(&'a self, msg: &'a str) -> impl Iterator<Item = Replacement> + 'a {
        self.re.captures_iter(msg).filter_map(|cap| {
            let whole = cap.get(0)?;
            let field = |name: &str| {
                cap.name(name)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            };
            Some(Replacement {
                index: whole.start(),
                word: whole.as_str().to_string(),
                info: PermalinkInfo {
                    has_www: cap.name("haswww").is_some(),
                    user: field("user"),
                    repo: field("repo"),
                    commit: field("commit"),
                    path: field("path"),
                    line: field("line"),
                },
            })
        })
    }

    /// Candidates the rewriter should try, in ascending offset order.
    ///
    /// The cap is applied to raw matches *before* link exclusion, so a
    /// message may yield fewer than `max` usable candidates.
    pub fn candidates(&self, msg: &str, max: usize) -> Vec<Replacement> {
        self.find_all(msg)
            .take(max)
            .filter(|r| !is_inside_link(msg, r.index, r.index + r.word.len()))
            .collect()
    }
}

/// Whether `msg[start..end]` is part of a markdown link, as its target or
/// inside its label.
///
/// This is not a markdown parser: `text ( url` without the bracket is never
/// excluded, and odd inputs at worst leave a link raw.
pub fn is_inside_link(msg: &str, start: usize, end: usize) -> bool {
    let bytes = msg.as_bytes();
    let start = start.min(bytes.len());
    let end = end.clamp(start, bytes.len());
    is_link_target(bytes, start) || is_link_label(bytes, start, end)
}

/// Walks backwards over spaces; the first other byte must be `(` and the one
/// right before it `]`.
fn is_link_target(bytes: &[u8], start: usize) -> bool {
    let mut i = start;
    while i > 0 && bytes[i - 1] == b' ' {
        i -= 1;
    }
    if i == 0 || bytes[i - 1] != b'(' {
        return false;
    }
    i > 1 && bytes[i - 2] == b']'
}

/// An unclosed `[` on the same line before the match, and `](` after it
/// with no bracket in between.
fn is_link_label(bytes: &[u8], start: usize, end: usize) -> bool {
    let is_stop = |b: &u8| matches!(b, b'[' | b']' | b'\n');

    let before = &bytes[..start];
    let opened = before
        .iter()
        .rposition(is_stop)
        .is_some_and(|i| before[i] == b'[');
    if !opened {
        return false;
    }

    let after = &bytes[end..];
    after
        .iter()
        .position(is_stop)
        .is_some_and(|i| after[i] == b']' && after.get(i + 1) == Some(&b'('))
}
