//! Shared field transformations: text cleanup, entity decoding and date
//! canonicalization.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x00-\x08\x0b\x0c\x0e-\x1f\x7f-\x9f]").expect("valid regex")
});
static HTML_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
        .expect("valid regex")
});

/// Canonical output format for dates
pub const CANONICAL_DATE: &str = "%Y-%m-%d";
/// Canonical output format for naive datetimes
pub const CANONICAL_DATETIME: &str = "%Y-%m-%dT%H:%M:%S";

/// Date formats understood by the market cleaners, tried in order
pub const MARKET_DATE_FORMATS: [&str; 4] = ["%Y%m%d", "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
/// Date formats understood by the factor cleaner, tried in order
pub const FACTOR_DATE_FORMATS: [&str; 3] = ["%Y%m%d", "%Y-%m-%d", "%Y/%m/%d"];

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y%m%d%H%M%S",
    "%Y-%m-%d %H:%M",
];

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ensp" => '\u{2002}',
        "emsp" => '\u{2003}',
        "thinsp" => '\u{2009}',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "laquo" => '«',
        "raquo" => '»',
        "middot" => '·',
        "bull" => '•',
        "times" => '×',
        "divide" => '÷',
        "plusmn" => '±',
        "deg" => '°',
        "permil" => '‰',
        "yen" => '¥',
        "euro" => '€',
        "pound" => '£',
        "cent" => '¢',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "sect" => '§',
        "para" => '¶',
        _ => return None,
    };
    Some(c)
}

/// Decode HTML character references. Unknown names and invalid code points
/// are left as written.
pub fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    HTML_ENTITY
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

pub fn strip_tags(text: &str) -> String {
    HTML_TAG.replace_all(text, "").into_owned()
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

pub fn strip_control_chars(text: &str) -> String {
    CONTROL_CHARS.replace_all(text, "").into_owned()
}

/// Unescape entities, strip tags, drop control characters and collapse
/// whitespace. Decoding repeats until the text stops changing, so
/// double-escaped markup is fully removed in one pass.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut current = text.to_string();
    loop {
        // every round that changes the text makes it shorter
        let next = strip_tags(&unescape_html(&strip_control_chars(&current)));
        if next == current {
            break;
        }
        current = next;
    }
    collapse_whitespace(&current)
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Parse a date string against `formats` in order
pub fn parse_date(text: &str, formats: &[&str]) -> Option<NaiveDate> {
    let text = text.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Canonicalize a date field to `YYYY-MM-DD`. Unparseable text is kept as
/// its trimmed string form; null and containers are left untouched.
pub fn normalize_date_value(value: &Value, formats: &[&str]) -> Value {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return other.clone(),
    };
    match parse_date(&text, formats) {
        Some(date) => Value::String(date.format(CANONICAL_DATE).to_string()),
        None => Value::String(text),
    }
}

/// Unix seconds at UTC midnight of a canonical `YYYY-MM-DD` date
pub fn date_timestamp(date: &str) -> Option<i64> {
    NaiveDate::parse_from_str(date, CANONICAL_DATE)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

/// Canonicalize a datetime field. Offset-carrying input stays RFC 3339,
/// naive input becomes `YYYY-MM-DDTHH:MM:SS`, Unix seconds become RFC 3339
/// UTC. Anything else is kept as text.
pub fn normalize_datetime_value(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(|dt| Value::String(dt.to_rfc3339()))
            .unwrap_or_else(|| Value::String(n.to_string())),
        Value::String(s) => Value::String(normalize_datetime_str(s)),
        other => Value::String(other.to_string()),
    }
}

fn normalize_datetime_str(text: &str) -> String {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return dt.to_rfc3339();
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return dt.format(CANONICAL_DATETIME).to_string();
    }
    if let Some(date) = parse_date(text, &FACTOR_DATE_FORMATS) {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return dt.format(CANONICAL_DATETIME).to_string();
        }
    }
    text.to_string()
}
