//! Line anchors (`#L10`, `#L10-20`, `#L10-L20`) and line extraction.

use crate::error::SkipReason;

/// Inclusive, 1-based line window of a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
    /// Trailing lines of the requested range were dropped.
    pub truncated: bool,
}

impl LineRange {
    /// Number of lines spanned after the start line (`end - start`).
    pub fn span(&self) -> usize {
        self.end - self.start
    }

    /// Keep the start of the range and drop whatever lies more than
    /// `max_preview_lines` past it.
    pub fn clamp_to(self, max_preview_lines: usize) -> Self {
        if self.span() > max_preview_lines {
            Self {
                start: self.start,
                end: self.start + max_preview_lines,
                truncated: true,
            }
        } else {
            self
        }
    }
}

/// Resolve a raw anchor fragment into a line window.
///
/// A single line is padded by `context` lines on each side (never before
/// line 1); a range is taken as written. An empty or malformed anchor is
/// rejected, so plain file links are never previewed.
pub fn resolve_anchor(anchor: &str, context: usize) -> Result<LineRange, SkipReason> {
    let invalid = || SkipReason::InvalidLineAnchor(anchor.to_string());

    let mut parts = anchor.split('-');
    let first = parts.next().ok_or_else(invalid)?;
    let second = parts.next();
    if parts.next().is_some() {
        return Err(invalid());
    }

    let start = parse_line(first).ok_or_else(invalid)?;
    let range = match second {
        None => LineRange {
            start: start.saturating_sub(context).max(1),
            end: start.saturating_add(context),
            truncated: false,
        },
        Some(second) => {
            let end = parse_line(second).ok_or_else(invalid)?;
            if end < start {
                return Err(invalid());
            }
            LineRange {
                start,
                end,
                truncated: false,
            }
        }
    };
    Ok(range)
}

fn parse_line(part: &str) -> Option<usize> {
    let digits = part.strip_prefix('L').unwrap_or(part);
    match digits.parse::<usize>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n),
    }
}

/// Lines `range.start..=range.end` of `content`, each newline-terminated.
///
/// A range running past the end of the file yields what exists; a range
/// starting past it is out of bounds.
pub fn extract_lines(content: &str, range: LineRange) -> Result<String, SkipReason> {
    let mut out = String::new();
    for line in content
        .lines()
        .skip(range.start - 1)
        .take(range.span() + 1)
    {
        out.push_str(line);
        out.push('\n');
    }

    if out.is_empty() {
        return Err(SkipReason::LineRangeOutOfBounds {
            start: range.start,
            end: range.end,
        });
    }
    Ok(out)
}
