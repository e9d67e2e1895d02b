use serde_json::Value;
use tracing::{debug, warn};

use super::utils::{date_timestamp, normalize_date_value, MARKET_DATE_FORMATS};
use super::Cleaner;
use crate::constants::{MARKET_CLEANER, MARKET_QUANT_CLEANER, MAX_CLOSE_PRICE, MIN_CLOSE_PRICE};
use crate::error::Result;
use crate::types::{coerce_f64, f64_to_value, scalar_text, Record, RecordExt};

/// Numeric quote fields coerced to float-or-null
pub const NUMERIC_FIELDS: [&str; 6] = ["open", "high", "low", "close", "volume", "amount"];

/// How a quote whose high/low disagree with its open/close is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighLowPolicy {
    /// Drop the record when `high < low` (data collection service)
    Reject,
    /// Widen `high`/`low` to cover `open` and `close` (quant engine)
    Repair,
}

/// Cleaner for daily quotes / K-line bars
#[derive(Debug, Clone)]
pub struct MarketDataCleaner {
    name: &'static str,
    policy: HighLowPolicy,
}

impl MarketDataCleaner {
    pub fn new(policy: HighLowPolicy) -> Self {
        let name = match policy {
            HighLowPolicy::Reject => MARKET_CLEANER,
            HighLowPolicy::Repair => MARKET_QUANT_CLEANER,
        };
        Self { name, policy }
    }

    /// Variant used by the data collection service
    pub fn collection() -> Self {
        Self::new(HighLowPolicy::Reject)
    }

    /// Variant used by the quant engine
    pub fn quant() -> Self {
        Self::new(HighLowPolicy::Repair)
    }

    pub fn policy(&self) -> HighLowPolicy {
        self.policy
    }

    fn repair_high_low(&self, record: &mut Record) {
        let prices: Vec<f64> = ["open", "high", "low", "close"]
            .iter()
            .filter_map(|k| record.f64_field(k).filter(|v| *v != 0.0))
            .collect();
        let [open, high, low, close] = prices[..] else {
            return;
        };

        let max_price = open.max(close);
        let min_price = open.min(close);
        let code = record.str_field("code").unwrap_or("unknown").to_string();

        if high < max_price {
            record.insert("high".to_string(), f64_to_value(Some(max_price)));
            warn!("Adjusted high price for {}", code);
        }
        if low > min_price {
            record.insert("low".to_string(), f64_to_value(Some(min_price)));
            warn!("Adjusted low price for {}", code);
        }
    }
}

impl Default for MarketDataCleaner {
    fn default() -> Self {
        Self::collection()
    }
}

impl Cleaner for MarketDataCleaner {
    fn name(&self) -> &str {
        self.name
    }

    fn clean(&self, mut record: Record) -> Result<Record> {
        if let Some(value) = record.get("code") {
            if let Some(code) = scalar_text("code", value)? {
                record.insert("code".to_string(), Value::String(code.trim().to_uppercase()));
            }
        }

        for field in NUMERIC_FIELDS {
            if let Some(value) = record.get_mut(field) {
                *value = f64_to_value(coerce_f64(value));
            }
        }

        if self.policy == HighLowPolicy::Repair {
            self.repair_high_low(&mut record);
        }

        if let Some(value) = record.get_mut("date") {
            *value = normalize_date_value(value, &MARKET_DATE_FORMATS);
        }

        Ok(record)
    }

    fn normalize(&self, mut record: Record) -> Record {
        if !record.is_present("change_pct") {
            let open = record.f64_field("open").filter(|v| *v != 0.0);
            let close = record.f64_field("close").filter(|v| *v != 0.0);
            if let (Some(open), Some(close)) = (open, close) {
                let change = close - open;
                record
                    .entry("change")
                    .or_insert_with(|| f64_to_value(Some(change)));
                record.insert("change_pct".to_string(), f64_to_value(Some(change / open * 100.0)));
            }
        }

        if !record.is_present("timestamp") {
            if let Some(ts) = record.str_field("date").and_then(date_timestamp) {
                record.insert("timestamp".to_string(), Value::from(ts));
            }
        }

        record
    }

    fn validate(&self, record: &Record) -> bool {
        for field in ["code", "date", "close"] {
            if record.get(field).map_or(true, Value::is_null) {
                debug!("Market record missing required field '{}'", field);
                return false;
            }
        }

        let Some(close) = record.f64_field("close") else {
            return false;
        };
        if !(MIN_CLOSE_PRICE..=MAX_CLOSE_PRICE).contains(&close) {
            warn!("Invalid price: {}", close);
            return false;
        }

        if let (Some(high), Some(low)) = (record.f64_field("high"), record.f64_field("low")) {
            if high < low {
                debug!("High {} below low {}", high, low);
                return false;
            }
        }

        if let Some(volume) = record.f64_field("volume") {
            if volume < 0.0 {
                debug!("Negative volume {}", volume);
                return false;
            }
        }

        true
    }
}
