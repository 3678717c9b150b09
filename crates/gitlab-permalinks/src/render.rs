//! Markdown for a code preview.

/// Render a fenced, syntax-hinted code block for `lines`.
///
/// The block is preceded by a link labelled `user/repo/path` that points
/// back at the original permalink, and ends with `...` when the preview was
/// truncated. The result starts and ends with a newline so it can be spliced
/// into running text.
pub fn render_snippet(
    user: &str,
    repo: &str,
    path: &str,
    link: &str,
    lines: &str,
    truncated: bool,
) -> String {
    let fence = "`".repeat(longest_backtick_run(lines).max(2) + 1);

    let mut out = format!("\n[{user}/{repo}/{path}]({link})\n");
    out.push_str(&fence);
    out.push_str(language_hint(path));
    out.push('\n');
    out.push_str(lines);
    if !lines.ends_with('\n') {
        out.push('\n');
    }
    if truncated {
        out.push_str("...\n");
    }
    out.push_str(&fence);
    out.push('\n');
    out
}

/// File extension of the last path segment, without the dot.
fn language_hint(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[dot + 1..],
        _ => "",
    }
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "https://gitlab.com/a/b/-/blob/abc/src/main.rs#L1-2";

    #[test]
    fn test_render_basic_block() {
        let out = render_snippet("a", "b", "src/main.rs", LINK, "fn main() {\n}\n", false);
        assert_eq!(
            out,
            format!("\n[a/b/src/main.rs]({LINK})\n```rs\nfn main() {{\n}}\n```\n")
        );
    }

    #[test]
    fn test_render_truncated_marker() {
        let out = render_snippet("a", "b", "x.go", LINK, "x\n", true);
        assert!(out.ends_with("x\n...\n```\n"));
    }

    #[test]
    fn test_language_hint() {
        assert_eq!(language_hint("src/lib.rs"), "rs");
        assert_eq!(language_hint("Makefile"), "");
        assert_eq!(language_hint("dir.d/Makefile"), "");
        assert_eq!(language_hint(".gitignore"), "");
        assert_eq!(language_hint("archive.tar.gz"), "gz");
    }

    #[test]
    fn test_fence_outgrows_embedded_backticks() {
        let lines = "```rust\nlet x = 1;\n```\n";
        let out = render_snippet("a", "b", "README.md", LINK, lines, false);
        assert!(out.contains("\n````md\n```rust\n"));
        assert!(out.ends_with("```\n````\n"));
    }
}
