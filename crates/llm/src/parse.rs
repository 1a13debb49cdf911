//! Lenient parsing of the model's reply into slide records.

use log::{debug, warn};
use regex::Regex;
use serde_json::Value;
use slidegen_core::{Extraction, SlideRecord};
use std::sync::LazyLock;

/// Matches a reply wrapped in a Markdown code fence, capturing the body.
static CODE_FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*\n?(.*?)\n?\s*```$").unwrap());

/// Turn the raw reply into slide records.
///
/// `text` is the original input, quoted by the fallback slide when the
/// reply holds no usable JSON.
pub fn parse_response(raw: &str, text: &str) -> Extraction {
    let slides = parse_records(raw);

    if slides.is_empty() {
        warn!("LLM reply was not usable slide JSON; using fallback slide");
        debug!("unusable reply: {}", raw);
        return Extraction::Fallback(SlideRecord::fallback(text));
    }

    Extraction::Parsed(slides)
}

/// Records from the first JSON candidate that yields any, tolerating code
/// fences and surrounding prose.
///
/// Candidates are the whole body, then the first `[` to the last `]`, then
/// the first `{` to the last `}`.
fn parse_records(raw: &str) -> Vec<SlideRecord> {
    let trimmed = raw.trim();
    let body = CODE_FENCE_REGEX
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed);

    std::iter::once(Some(body))
        .chain([enclosed(body, '[', ']'), enclosed(body, '{', '}')])
        .flatten()
        .filter_map(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .map(|value| records_from_value(&value))
        .find(|records| !records.is_empty())
        .unwrap_or_default()
}

/// The substring from the first `open` to the last `close`, inclusive.
fn enclosed(s: &str, open: char, close: char) -> Option<&str> {
    let start = s.find(open)?;
    let end = s.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&s[start..=end])
}

fn records_from_value(value: &Value) -> Vec<SlideRecord> {
    match value {
        Value::Array(items) => items.iter().filter_map(SlideRecord::from_json).collect(),
        Value::Object(_) => SlideRecord::from_json(value).into_iter().collect(),
        _ => Vec::new(),
    }
}
