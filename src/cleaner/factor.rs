use serde_json::Value;
use tracing::debug;

use super::utils::{normalize_date_value, FACTOR_DATE_FORMATS};
use super::Cleaner;
use crate::constants::FACTOR_CLEANER;
use crate::error::Result;
use crate::types::{coerce_f64, f64_to_value, scalar_text, Record, RecordExt};

/// Cleaner for per-stock factor values
#[derive(Debug, Clone, Default)]
pub struct FactorDataCleaner;

impl FactorDataCleaner {
    pub fn new() -> Self {
        Self
    }
}

impl Cleaner for FactorDataCleaner {
    fn name(&self) -> &str {
        FACTOR_CLEANER
    }

    fn clean(&self, mut record: Record) -> Result<Record> {
        if let Some(value) = record.get("code") {
            if let Some(code) = scalar_text("code", value)? {
                record.insert("code".to_string(), Value::String(code.trim().to_uppercase()));
            }
        }

        if let Some(value) = record.get("factor_name") {
            if let Some(name) = scalar_text("factor_name", value)? {
                record.insert(
                    "factor_name".to_string(),
                    Value::String(name.trim().to_lowercase()),
                );
            }
        }

        // non-finite values have no JSON form and land as null here
        if let Some(value) = record.get_mut("factor_value") {
            *value = f64_to_value(coerce_f64(value));
        }

        Ok(record)
    }

    fn normalize(&self, mut record: Record) -> Record {
        if let Some(value) = record.get_mut("date") {
            *value = normalize_date_value(value, &FACTOR_DATE_FORMATS);
        }
        record
    }

    fn validate(&self, record: &Record) -> bool {
        for field in ["code", "factor_name", "factor_value"] {
            if !record.is_present(field) {
                debug!("Factor record missing required field '{}'", field);
                return false;
            }
        }
        match record.f64_field("factor_value") {
            Some(v) => v.is_finite(),
            None => false,
        }
    }
}
