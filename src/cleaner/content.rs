use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::utils::{char_len, clean_text, collapse_whitespace, truncate_chars};
use super::Cleaner;
use crate::config::CleanerConfig;
use crate::constants::{CONTENT_CLEANER, RISK_WARNING, RISK_WARNING_CONTENT_TYPES};
use crate::error::Result;
use crate::types::{scalar_text, Record, RecordExt};

static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[\s\S]*?```").expect("valid regex"));
static EXCESS_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Cleaner for AI-generated articles, reports and scripts
#[derive(Debug, Clone, Default)]
pub struct ContentCleaner {
    config: CleanerConfig,
}

impl ContentCleaner {
    pub fn new(config: CleanerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    /// Normalize line endings and squeeze runs of blank lines
    pub fn clean_markdown(markdown: &str) -> String {
        let unified = markdown.replace("\r\n", "\n").replace('\r', "\n");
        EXCESS_BLANK_LINES
            .replace_all(&unified, "\n\n")
            .trim()
            .to_string()
    }

    /// Bodies of fenced code blocks, without the fences
    pub fn extract_code_blocks(content: &str) -> Vec<String> {
        CODE_BLOCK
            .find_iter(content)
            .map(|m| {
                let block = m.as_str().trim();
                let block = block.strip_prefix("```").unwrap_or(block);
                let block = block.strip_suffix("```").unwrap_or(block);
                block.trim().to_string()
            })
            .collect()
    }

    fn clean_text_field(record: &mut Record, field: &str) -> Result<()> {
        if !record.is_truthy(field) {
            return Ok(());
        }
        if let Some(value) = record.get(field) {
            let text = scalar_text(field, value)?.unwrap_or_default();
            record.insert(field.to_string(), Value::String(clean_text(&text)));
        }
        Ok(())
    }
}

impl Cleaner for ContentCleaner {
    fn name(&self) -> &str {
        CONTENT_CLEANER
    }

    fn clean(&self, mut record: Record) -> Result<Record> {
        for field in ["title", "content", "summary"] {
            Self::clean_text_field(&mut record, field)?;
        }

        if self.config.remove_code_blocks {
            if let Some(content) = record.str_field("content") {
                let mut stripped = content.to_string();
                while CODE_BLOCK.is_match(&stripped) {
                    stripped = CODE_BLOCK.replace_all(&stripped, "").into_owned();
                }
                record.insert(
                    "content".to_string(),
                    Value::String(collapse_whitespace(&stripped)),
                );
            }
        }

        let needs_warning = record
            .str_field("type")
            .map_or(false, |t| RISK_WARNING_CONTENT_TYPES.contains(&t));
        if needs_warning && !record.is_truthy("risk_warning") {
            record.insert(
                "risk_warning".to_string(),
                Value::String(RISK_WARNING.to_string()),
            );
        }

        Ok(record)
    }

    fn normalize(&self, mut record: Record) -> Record {
        record
            .entry("status")
            .or_insert_with(|| Value::String("draft".to_string()));
        record
            .entry("generated_by")
            .or_insert_with(|| Value::String("AI".to_string()));

        let max_length = self.config.max_content_length;
        let truncated = record
            .str_field("content")
            .filter(|c| char_len(c) > max_length)
            .map(|c| truncate_chars(c, max_length).trim_end().to_string());
        if let Some(content) = truncated {
            warn!("Content truncated to {} characters", max_length);
            record.insert("content".to_string(), Value::String(content));
        }

        record
    }

    fn validate(&self, record: &Record) -> bool {
        if !record.is_truthy("content") {
            debug!("Content record has no content");
            return false;
        }
        let content = match record.get("content") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => return false,
        };

        let length = char_len(&content);
        if length < self.config.min_content_length {
            warn!("Content too short: {} characters", length);
            return false;
        }
        if content.trim().is_empty() {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::process_record;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn body() -> String {
        "今日A股三大指数集体收涨，沪指站上三千点，成交额较上一交易日明显放大，北向资金净流入。".repeat(2)
    }

    #[test]
    fn test_risk_warning_added_for_articles_only() {
        let cleaner = ContentCleaner::default();
        let article = cleaner
            .clean(record(json!({"type": "article", "content": body()})))
            .unwrap();
        assert_eq!(article["risk_warning"], json!(RISK_WARNING));

        let script = cleaner
            .clean(record(json!({"type": "video_script", "content": body()})))
            .unwrap();
        assert!(!script.contains_key("risk_warning"));

        let custom = cleaner
            .clean(record(json!({"type": "daily_report", "risk_warning": "自定义提示"})))
            .unwrap();
        assert_eq!(custom["risk_warning"], json!("自定义提示"));
    }

    #[test]
    fn test_code_blocks_removed_when_configured() {
        let content = format!("{} ```python\nprint(1)\n``` 结束", body());
        let keep = ContentCleaner::default()
            .clean(record(json!({"content": content.clone()})))
            .unwrap();
        assert!(keep["content"].as_str().unwrap().contains("```"));

        let cleaner = ContentCleaner::new(CleanerConfig {
            remove_code_blocks: true,
            ..CleanerConfig::default()
        });
        let stripped = cleaner.clean(record(json!({"content": content}))).unwrap();
        let text = stripped["content"].as_str().unwrap();
        assert!(!text.contains("```"));
        assert!(!text.contains("print"));
    }

    #[test]
    fn test_truncation_and_defaults() {
        let cleaner = ContentCleaner::new(CleanerConfig {
            min_content_length: 5,
            max_content_length: 10,
            remove_code_blocks: false,
        });
        let out = process_record(&cleaner, record(json!({"content": "abcdefghijklmnop"})))
            .unwrap()
            .unwrap();
        assert_eq!(out["content"], json!("abcdefghij"));
        assert_eq!(out["status"], json!("draft"));
        assert_eq!(out["generated_by"], json!("AI"));
    }

    #[test]
    fn test_truncation_at_a_space_is_stable() {
        let cleaner = ContentCleaner::new(CleanerConfig {
            min_content_length: 5,
            max_content_length: 10,
            remove_code_blocks: false,
        });
        let once = process_record(&cleaner, record(json!({"content": "abcdefghi jklmnop"})))
            .unwrap()
            .unwrap();
        assert_eq!(once["content"], json!("abcdefghi"));
        let twice = process_record(&cleaner, once.clone()).unwrap().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_code_block_removal_is_idempotent() {
        let cleaner = ContentCleaner::new(CleanerConfig {
            remove_code_blocks: true,
            ..CleanerConfig::default()
        });
        let content = format!("{} ```py\nx=1\n``` 结束", body());
        let once = process_record(&cleaner, record(json!({"content": content})))
            .unwrap()
            .unwrap();
        let text = once["content"].as_str().unwrap();
        assert!(text.ends_with("净流入。 结束"));
        assert!(!text.contains("  "));
        let twice = process_record(&cleaner, once.clone()).unwrap().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_double_escaped_markup_is_idempotent() {
        let cleaner = ContentCleaner::default();
        let content = format!("{}&amp;lt;b&amp;gt;注意&amp;lt;/b&amp;gt;", body());
        let once = process_record(&cleaner, record(json!({"content": content})))
            .unwrap()
            .unwrap();
        assert!(once["content"].as_str().unwrap().ends_with("净流入。注意"));
        let twice = process_record(&cleaner, once.clone()).unwrap().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_validation_rejects_short_and_empty() {
        let cleaner = ContentCleaner::default();
        assert!(process_record(&cleaner, record(json!({"content": "short"}))).unwrap().is_none());
        assert!(process_record(&cleaner, record(json!({"content": ""}))).unwrap().is_none());
        assert!(process_record(&cleaner, record(json!({"title": "x"}))).unwrap().is_none());

        // whitespace-only content survives the length check when the minimum is zero
        let lenient = ContentCleaner::new(CleanerConfig {
            min_content_length: 0,
            ..CleanerConfig::default()
        });
        assert!(!lenient.validate(&record(json!({"content": "   "}))));
    }

    #[test]
    fn test_clean_markdown() {
        let md = "# Title\r\n\r\n\r\n\r\nBody\rline\n\n\n\nEnd\n";
        assert_eq!(ContentCleaner::clean_markdown(md), "# Title\n\nBody\nline\n\nEnd");
    }

    #[test]
    fn test_extract_code_blocks() {
        let blocks = ContentCleaner::extract_code_blocks("a ```rust\nfn main() {}\n``` b ```\nx = 1\n```");
        assert_eq!(blocks, vec!["rust\nfn main() {}", "x = 1"]);
    }

    #[test]
    fn test_idempotent_with_unknown_keys() {
        let cleaner = ContentCleaner::default();
        let input = record(json!({
            "type": "daily_report",
            "title": "<b>日报</b>",
            "content": format!("<div>{}</div>", body()),
            "prompt_id": 7
        }));
        let once = process_record(&cleaner, input).unwrap().unwrap();
        let twice = process_record(&cleaner, once.clone()).unwrap().unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice["prompt_id"], json!(7));
    }
}
