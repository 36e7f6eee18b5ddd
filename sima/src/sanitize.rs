//! Input sanitization.
//!
//! Free-text fields are cleaned before validation: plain-text fields lose
//! quotes, control characters and anything script-shaped; the observaciones
//! field permits constrained HTML and only loses active content. Email and
//! phone values get their own normalizers which return `None` when the value
//! is beyond repair (the caller then stores null rather than failing).

use regex::Regex;
use std::sync::LazyLock;

static RE_SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script>").expect("script block regex"));
static RE_EVENT_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\son\w+\s*=\s*("[^"]*"|'[^']*'|[^\s>]*)"#).expect("event attr regex"));
static RE_EVENT_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)on\w+\s*=").expect("event name regex"));
static RE_CONTROL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00\x08\x09\x0a\x0d\x1a]").expect("control char regex"));
static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static RE_EMBED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:iframe|object|embed)\b.*?</(?:iframe|object|embed)>").expect("embed block regex")
});
static RE_FORM_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(?:form|input|button|textarea|select|option)\b[^>]*>").expect("form regex"));
static RE_SCRIPT_PROTO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:|vbscript:").expect("script proto regex"));
static RE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex"));

/// Cap a string at `max` characters, respecting char boundaries.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Sanitize a plain-text field: strip script content and event handlers,
/// drop quotes and control characters, collapse whitespace, cap length.
pub fn clean_text(s: &str, max_len: usize) -> String {
    let s = RE_SCRIPT_BLOCK.replace_all(s, "");
    let s = RE_EVENT_ATTR.replace_all(&s, "");
    let s = RE_CONTROL.replace_all(&s, " ");
    let s: String = s.chars().filter(|c| *c != '\'' && *c != '"').collect();
    let s = RE_WHITESPACE.replace_all(&s, " ");
    truncate_chars(s.trim(), max_len)
}

/// Sanitize an HTML-permitting field (more permissive than [`clean_text`]):
/// markup survives, active content does not.
pub fn clean_html(s: &str, max_len: usize) -> String {
    let s = RE_SCRIPT_BLOCK.replace_all(s, "");
    let s = RE_SCRIPT_PROTO.replace_all(&s, "");
    let s = RE_EVENT_NAME.replace_all(&s, "");
    let s = RE_EMBED_BLOCK.replace_all(&s, "");
    let s = RE_FORM_ELEMENT.replace_all(&s, "");
    truncate_chars(s.trim(), max_len)
}

/// Normalize and validate an email address. Returns `None` when the value is
/// not a plausible address; callers store null in that case.
pub fn clean_email(email: &str) -> Option<String> {
    let cleaned = truncate_chars(email.trim(), 254).to_lowercase();
    if RE_EMAIL.is_match(&cleaned) { Some(cleaned) } else { None }
}

/// Normalize a phone number: keep digits, `+`, spaces, dashes and parens,
/// require at least 7 digits.
pub fn clean_phone(phone: &str) -> Option<String> {
    let cleaned: String = phone
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'))
        .collect();
    let cleaned = truncate_chars(cleaned.trim(), 20);
    let digits = cleaned.chars().filter(|c| c.is_ascii_digit()).count();
    if digits >= 7 { Some(cleaned) } else { None }
}

/// Prepare a search term for a SQL LIKE predicate: drop control characters
/// and quotes, escape wildcards with `\` (queries add `ESCAPE '\'`), cap at
/// 100 chars.
pub fn like_pattern(term: &str) -> String {
    let stripped: String = term
        .chars()
        .filter(|c| !matches!(c, '\0' | '\u{8}' | '\t' | '\n' | '\r' | '\u{1a}' | '\'' | '"' | '\\'))
        .collect();
    let mut escaped = String::with_capacity(stripped.len());
    for c in stripped.trim().chars().take(100) {
        if c == '%' || c == '_' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_strips_scripts_and_quotes() {
        let out = clean_text("  Juan <script>alert('x')</script> \"Pérez\"  ", 100);
        assert_eq!(out, "Juan Pérez");
    }

    #[test]
    fn clean_text_strips_event_handlers() {
        let out = clean_text("hola <img src=x onerror=alert(1)> mundo", 100);
        assert!(!out.to_lowercase().contains("onerror"));
    }

    #[test]
    fn clean_text_collapses_whitespace_and_caps_length() {
        let out = clean_text("a\tb\nc", 100);
        assert_eq!(out, "a b c");
        let out = clean_text(&"x".repeat(500), 10);
        assert_eq!(out.chars().count(), 10);
    }

    #[test]
    fn clean_html_keeps_markup_but_drops_active_content() {
        let input = "<b>nota</b> <script>alert(1)</script> <a href=\"javascript:evil()\">x</a>";
        let out = clean_html(input, 2000);
        assert!(out.contains("<b>nota</b>"));
        assert!(!out.to_lowercase().contains("<script"));
        assert!(!out.to_lowercase().contains("javascript:"));
    }

    #[test]
    fn clean_html_drops_embeds_and_form_elements() {
        let input = "antes <iframe src=\"x\">f</iframe> <input type=\"text\"> después";
        let out = clean_html(input, 2000);
        assert!(!out.contains("<iframe"));
        assert!(!out.contains("<input"));
        assert!(out.contains("antes"));
        assert!(out.contains("después"));
    }

    #[test]
    fn clean_email_normalizes_or_rejects() {
        assert_eq!(clean_email("  Foo@Example.COM "), Some("foo@example.com".to_string()));
        assert_eq!(clean_email("no-es-un-email"), None);
        assert_eq!(clean_email("a@b"), None);
    }

    #[test]
    fn clean_phone_requires_seven_digits() {
        assert_eq!(clean_phone("+54 (11) 4444-5555"), Some("+54 (11) 4444-5555".to_string()));
        assert_eq!(clean_phone("abc123"), None);
        // Letters are stripped, digits survive
        assert_eq!(clean_phone("tel: 1234567"), Some("1234567".to_string()));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "50\\%\\_off");
        assert_eq!(like_pattern("o'reilly"), "oreilly");
        let long = "a".repeat(300);
        assert_eq!(like_pattern(&long).len(), 100);
    }
}
