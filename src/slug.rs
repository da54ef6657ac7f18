use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn non_word_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\-]+").unwrap())
}

fn hyphen_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-{2,}").unwrap())
}

/// Turns a title into a filename and URL safe slug.
///
/// The text is lowercased, whitespace runs become a single hyphen, anything
/// that is not an ASCII word character or hyphen is dropped, hyphen runs are
/// collapsed and leading/trailing hyphens are trimmed.
///
/// Returns `None` when there is nothing to slugify: empty input, or input
/// that reduces to an empty string.
pub fn slugify(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let lowered = text.to_lowercase();
    let hyphenated = whitespace_runs().replace_all(&lowered, "-");
    let stripped = non_word_chars().replace_all(&hyphenated, "");
    let collapsed = hyphen_runs().replace_all(&stripped, "-");
    let trimmed = collapsed.trim_matches('-');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Slugifies a JSON field. `null`, `false`, `0` and `""` have no slug.
pub fn slugify_value(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) => slugify(s),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => slugify(&n.to_string()),
        other => slugify(&other.to_string()),
    }
}
