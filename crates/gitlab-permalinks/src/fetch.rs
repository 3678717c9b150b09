//! The seam between the rewriter and whatever serves file contents.

use async_trait::async_trait;
use base64::Engine as _;
use std::time::Duration;

use crate::error::{FetchError, SkipReason};

/// Coordinates of one file at one commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRequest<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub commit: &'a str,
    pub path: &'a str,
}

/// File payload as delivered by the remote, still transport-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// `base64` or `text`.
    pub encoding: String,
    pub content: String,
}

impl RemoteFile {
    pub fn base64(content: impl Into<String>) -> Self {
        Self {
            encoding: "base64".to_string(),
            content: content.into(),
        }
    }

    /// Encode `text` the way GitLab's files API delivers it.
    pub fn encode_text(text: &str) -> Self {
        Self::base64(base64::engine::general_purpose::STANDARD.encode(text))
    }

    /// Decode the payload into UTF-8 text.
    ///
    /// Binary files (invalid UTF-8) are treated as undecodable.
    pub fn decode(&self) -> Result<String, SkipReason> {
        let bytes = match self.encoding.as_str() {
            "base64" | "" => {
                let compact: String = self
                    .content
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                base64::engine::general_purpose::STANDARD
                    .decode(compact)
                    .map_err(|e| SkipReason::DecodeFailed(e.to_string()))?
            }
            "text" => return Ok(self.content.clone()),
            other => {
                return Err(SkipReason::DecodeFailed(format!(
                    "unsupported encoding {other:?}"
                )))
            }
        };
        String::from_utf8(bytes).map_err(|e| SkipReason::DecodeFailed(e.to_string()))
    }
}

/// Successful fetch results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    File(RemoteFile),
    /// The path exists at that ref but is not a regular file.
    NotAFile,
}

/// Retrieves file contents at a ref.
///
/// Implementations must give up after `timeout`. The rewriter additionally
/// enforces the same bound around every call.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(
        &self,
        request: &FileRequest<'_>,
        timeout: Duration,
    ) -> Result<FetchOutcome, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64() {
        let file = RemoteFile::encode_text("fn main() {}\n");
        assert_eq!(file.decode().unwrap(), "fn main() {}\n");
    }

    #[test]
    fn test_decode_ignores_line_wrapping() {
        let file = RemoteFile::base64("aGVsbG8g\nd29ybGQ=\n");
        assert_eq!(file.decode().unwrap(), "hello world");
    }

    #[test]
    fn test_decode_text_passthrough() {
        let file = RemoteFile {
            encoding: "text".into(),
            content: "plain".into(),
        };
        assert_eq!(file.decode().unwrap(), "plain");
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(
            RemoteFile::base64("!!!not base64").decode(),
            Err(SkipReason::DecodeFailed(_))
        ));
        // 0xff 0xfe is not UTF-8
        assert!(matches!(
            RemoteFile::base64("//4=").decode(),
            Err(SkipReason::DecodeFailed(_))
        ));
        let odd = RemoteFile {
            encoding: "gzip".into(),
            content: String::new(),
        };
        assert!(matches!(odd.decode(), Err(SkipReason::DecodeFailed(_))));
    }
}
