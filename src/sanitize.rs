//! Markdown sanitization for tracker-supplied and agent-supplied text.
//!
//! Contract: removes or escapes unsafe markup; everything else passes
//! through unchanged. Applied to all free text before it is embedded in a
//! prompt or written to a tracker comment.

use regex::Regex;
use std::sync::OnceLock;

fn html_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("static pattern"))
}

fn unsafe_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)</?(script|style|iframe|object|embed|form)\b").expect("static pattern")
    })
}

/// Sanitize a block of untrusted markdown.
///
/// - HTML comments are removed entirely (they can smuggle instructions that
///   render invisibly).
/// - Script-capable HTML tags are neutralized by escaping their opening `<`.
/// - Control characters other than newline, carriage return, and tab are
///   stripped.
pub fn sanitize(text: &str) -> String {
    let without_comments = html_comment_re().replace_all(text, "");
    let escaped = unsafe_tag_re().replace_all(&without_comments, |caps: &regex::Captures| {
        caps[0].replacen('<', "&lt;", 1)
    });
    escaped
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}
