//! Defensive string cleanup applied to untrusted form input.

use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    script_blocks: Regex,
    tags: Regex,
    schemes: Regex,
    event_handlers: Regex,
    whitespace: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        script_blocks: Regex::new(&block_pattern(&["script", "style", "iframe", "object", "embed"]))
            .expect("valid script pattern"),
        tags: Regex::new(r"(?s)<\s*[/!]?[a-zA-Z][^>]*>?").expect("valid tag pattern"),
        schemes: Regex::new(r"(?i)(javascript|vbscript)\s*:|data\s*:\s*text/html")
            .expect("valid scheme pattern"),
        event_handlers: Regex::new(r#"(?i)\bon[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]*)"#)
            .expect("valid handler pattern"),
        whitespace: Regex::new(r"\s+").expect("valid whitespace pattern"),
    })
}

/// One alternative per element: the opening tag through its closing tag, or
/// through the end of input when the block is left unterminated.
fn block_pattern(elements: &[&str]) -> String {
    let alternatives: Vec<String> = elements
        .iter()
        .map(|name| format!(r"<\s*{name}\b.*?(?:<\s*/\s*{name}\s*>|$)"))
        .collect();
    format!("(?is){}", alternatives.join("|"))
}

/// Removes script-like blocks, HTML tags, dangerous URL schemes, inline event
/// handlers and control characters, then collapses whitespace.
pub fn sanitize_text(input: &str) -> String {
    let p = patterns();
    let without_controls: String = input
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();
    let text = p.script_blocks.replace_all(&without_controls, "");
    let text = p.tags.replace_all(&text, "");
    let text = p.event_handlers.replace_all(&text, "");
    let text = p.schemes.replace_all(&text, "");
    p.whitespace.replace_all(text.trim(), " ").into_owned()
}

pub fn normalize_email(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Keeps a leading `+` and ASCII digits.
pub fn normalize_phone(input: &str) -> String {
    let trimmed = input.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if trimmed.starts_with('+') && !digits.is_empty() {
        format!("+{}", digits)
    } else {
        digits
    }
}
