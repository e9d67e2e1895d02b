use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::utils::{char_len, clean_text, normalize_datetime_value, truncate_chars};
use super::Cleaner;
use crate::constants::{
    DEFAULT_NEWS_AUTHOR, DEFAULT_NEWS_CATEGORY, NEWS_CLEANER, NEWS_MIN_CONTENT_LENGTH,
    NEWS_SUMMARY_LENGTH,
};
use crate::error::Result;
use crate::types::{scalar_text, Record, RecordExt};

/// A-share prefixes: Shenzhen main/SME (00), ChiNext (30), Shanghai main (60),
/// STAR (68) and the Beijing exchange (43, 83, 87)
const STOCK_CODE_PREFIXES: [&str; 7] = ["00", "30", "60", "68", "43", "83", "87"];

// CJK text puts digits right next to word characters, so codes are found as
// ASCII digit runs not glued to ASCII letters rather than with `\b`
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

fn glued_to_ascii_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    [before, after]
        .into_iter()
        .flatten()
        .any(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Cleaner for financial news and flash updates
#[derive(Debug, Clone, Default)]
pub struct NewsCleaner;

impl NewsCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Stock codes mentioned in `text`, deduplicated in order of first appearance
    pub fn extract_stock_codes(text: &str) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for m in DIGIT_RUN.find_iter(text) {
            let run = m.as_str();
            let is_code = run.len() == 6
                && STOCK_CODE_PREFIXES.iter().any(|p| run.starts_with(p))
                && !glued_to_ascii_word(text, m.start(), m.end());
            if is_code && !codes.iter().any(|c| c == run) {
                codes.push(run.to_string());
            }
        }
        codes
    }

    fn clean_text_field(record: &mut Record, field: &str) -> Result<()> {
        if let Some(value) = record.get(field) {
            let text = scalar_text(field, value)?.unwrap_or_default();
            record.insert(field.to_string(), Value::String(clean_text(&text)));
        }
        Ok(())
    }
}

impl Cleaner for NewsCleaner {
    fn name(&self) -> &str {
        NEWS_CLEANER
    }

    fn clean(&self, mut record: Record) -> Result<Record> {
        Self::clean_text_field(&mut record, "title")?;
        Self::clean_text_field(&mut record, "content")?;

        if !record.is_present("summary") {
            if let Some(content) = record.str_field("content") {
                let summary = format!("{}...", truncate_chars(content, NEWS_SUMMARY_LENGTH));
                record.insert("summary".to_string(), Value::String(summary));
            }
        }

        if let Some(value) = record.get_mut("publish_time") {
            *value = normalize_datetime_value(value);
        }

        if !record.is_present("related_stocks") {
            let text = format!(
                "{} {}",
                record.str_field("content").unwrap_or_default(),
                record.str_field("title").unwrap_or_default()
            );
            let codes = Self::extract_stock_codes(&text)
                .into_iter()
                .map(Value::String)
                .collect();
            record.insert("related_stocks".to_string(), Value::Array(codes));
        }

        Ok(record)
    }

    fn normalize(&self, mut record: Record) -> Record {
        record
            .entry("author")
            .or_insert_with(|| Value::String(DEFAULT_NEWS_AUTHOR.to_string()));
        record
            .entry("category")
            .or_insert_with(|| Value::String(DEFAULT_NEWS_CATEGORY.to_string()));
        record
            .entry("tags")
            .or_insert_with(|| Value::Array(Vec::new()));
        record
    }

    fn validate(&self, record: &Record) -> bool {
        for field in ["title", "content", "publish_time"] {
            if !record.is_present(field) {
                debug!("News record missing required field '{}'", field);
                return false;
            }
        }
        let length = record.str_field("content").map(char_len).unwrap_or(0);
        if length < NEWS_MIN_CONTENT_LENGTH {
            debug!("News content too short: {} characters", length);
            return false;
        }
        true
    }
}
