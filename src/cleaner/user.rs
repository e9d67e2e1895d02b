use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::utils::{collapse_whitespace, truncate_chars};
use super::Cleaner;
use crate::config::PasswordPolicy;
use crate::constants::{
    DEFAULT_USER_ROLE, DEFAULT_USER_STATUS, NICKNAME_MAX_LENGTH, SENSITIVE_USER_FIELDS,
    USER_CLEANER, VALID_USER_ROLES,
};
use crate::error::Result;
use crate::types::{scalar_text, Record, RecordExt};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.+-]+@[\w.-]+\.[A-Za-z]{2,}$").expect("valid regex"));
static MOBILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^1[3-9][0-9]{9}$").expect("valid regex"));
static SPECIAL_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).expect("valid regex"));

/// Cleaner for user profiles. Credentials never survive cleaning.
#[derive(Debug, Clone, Default)]
pub struct UserDataCleaner {
    password_policy: PasswordPolicy,
}

impl UserDataCleaner {
    pub fn new(password_policy: PasswordPolicy) -> Self {
        Self { password_policy }
    }

    pub fn password_policy(&self) -> &PasswordPolicy {
        &self.password_policy
    }

    /// Check a plaintext password against the configured policy. The error
    /// names the first unmet requirement.
    pub fn validate_password(&self, password: &str) -> std::result::Result<(), String> {
        let policy = &self.password_policy;
        if password.chars().count() < policy.min_length {
            return Err(format!(
                "Password must be at least {} characters",
                policy.min_length
            ));
        }
        if policy.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err("Password must contain at least one uppercase letter".to_string());
        }
        if policy.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err("Password must contain at least one lowercase letter".to_string());
        }
        if policy.require_numbers && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err("Password must contain at least one number".to_string());
        }
        if policy.require_special && !SPECIAL_CHAR.is_match(password) {
            return Err("Password must contain at least one special character".to_string());
        }
        Ok(())
    }

    fn rewrite_text<F>(record: &mut Record, field: &str, f: F) -> Result<()>
    where
        F: FnOnce(&str) -> String,
    {
        if !record.is_truthy(field) {
            return Ok(());
        }
        if let Some(value) = record.get(field) {
            if let Some(text) = scalar_text(field, value)? {
                record.insert(field.to_string(), Value::String(f(&text)));
            }
        }
        Ok(())
    }
}

impl Cleaner for UserDataCleaner {
    fn name(&self) -> &str {
        USER_CLEANER
    }

    fn clean(&self, mut record: Record) -> Result<Record> {
        for field in SENSITIVE_USER_FIELDS {
            record.remove(field);
        }

        Self::rewrite_text(&mut record, "email", |s| s.trim().to_lowercase())?;
        Self::rewrite_text(&mut record, "phone", |s| {
            s.chars().filter(char::is_ascii_digit).collect()
        })?;
        Self::rewrite_text(&mut record, "username", |s| {
            s.trim()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect()
        })?;
        Self::rewrite_text(&mut record, "nickname", |s| {
            truncate_chars(&collapse_whitespace(s), NICKNAME_MAX_LENGTH)
                .trim_end()
                .to_string()
        })?;

        Ok(record)
    }

    fn normalize(&self, mut record: Record) -> Record {
        for field in ["email", "username"] {
            let lowered = record.str_field(field).map(str::to_lowercase);
            if let Some(lowered) = lowered {
                record.insert(field.to_string(), Value::String(lowered));
            }
        }
        record
            .entry("role")
            .or_insert_with(|| Value::String(DEFAULT_USER_ROLE.to_string()));
        record
            .entry("status")
            .or_insert_with(|| Value::String(DEFAULT_USER_STATUS.to_string()));
        record
    }

    fn validate(&self, record: &Record) -> bool {
        if !record.is_present("email") && !record.is_present("username") {
            debug!("User record has neither email nor username");
            return false;
        }

        if record.is_truthy("email") {
            let valid = record.str_field("email").map_or(false, |e| EMAIL.is_match(e));
            if !valid {
                debug!("Invalid email for user {}", record.record_id());
                return false;
            }
        }

        if record.is_truthy("phone") {
            let valid = record.str_field("phone").map_or(false, |p| MOBILE.is_match(p));
            if !valid {
                debug!("Invalid phone for user {}", record.record_id());
                return false;
            }
        }

        match record.str_field("role") {
            Some(role) if VALID_USER_ROLES.contains(&role) => true,
            _ => {
                debug!("Invalid role for user {}", record.record_id());
                false
            }
        }
    }
}
