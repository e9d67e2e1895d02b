/// Component names used for logging fields, metric labels and the registry.
/// Cleaners are addressed by kind on the CLI and tagged `cleaner.<name>` in logs.
pub const MARKET_CLEANER: &str = "market";
pub const MARKET_QUANT_CLEANER: &str = "market-quant";
pub const NEWS_CLEANER: &str = "news";
pub const CONTENT_CLEANER: &str = "content";
pub const FACTOR_CLEANER: &str = "factor";
pub const USER_CLEANER: &str = "user";

pub const MARKET_CRAWLER: &str = "market";
pub const MARKET_QUANT_CRAWLER: &str = "market-quant";
pub const NEWS_CRAWLER: &str = "news";
pub const FACTOR_CRAWLER: &str = "factor";
pub const PROMPT_CRAWLER: &str = "prompt";
pub const VECTOR_CRAWLER: &str = "vector";
pub const WECHAT_CRAWLER: &str = "wechat";
pub const EXTERNAL_USER_CRAWLER: &str = "external";

// Content cleaner defaults
pub const DEFAULT_MIN_CONTENT_LENGTH: usize = 50;
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 50_000;

// News cleaner rules
pub const NEWS_MIN_CONTENT_LENGTH: usize = 50;
pub const NEWS_SUMMARY_LENGTH: usize = 200;
pub const DEFAULT_NEWS_AUTHOR: &str = "Unknown";
pub const DEFAULT_NEWS_CATEGORY: &str = "finance";

// Market price bounds, inclusive
pub const MIN_CLOSE_PRICE: f64 = 0.01;
pub const MAX_CLOSE_PRICE: f64 = 10_000.0;

// User cleaner rules
pub const NICKNAME_MAX_LENGTH: usize = 50;
pub const SENSITIVE_USER_FIELDS: [&str; 3] = ["password", "password_hash", "token"];
pub const VALID_USER_ROLES: [&str; 4] = ["user", "admin", "vip", "premium"];
pub const DEFAULT_USER_ROLE: &str = "user";
pub const DEFAULT_USER_STATUS: &str = "active";

// Content types that must carry the risk disclaimer
pub const RISK_WARNING_CONTENT_TYPES: [&str; 2] = ["article", "daily_report"];
pub const RISK_WARNING: &str = "以上内容不构成投资建议，股市有风险，投资需谨慎。";

pub const DEFAULT_DATA_SERVICE_URL: &str = "http://data-service:8001";

/// Get all cleaner kinds accepted by the registry
pub fn get_supported_cleaners() -> Vec<&'static str> {
    vec![
        MARKET_CLEANER,
        MARKET_QUANT_CLEANER,
        NEWS_CLEANER,
        CONTENT_CLEANER,
        FACTOR_CLEANER,
        USER_CLEANER,
    ]
}

/// Get all crawler names accepted by the registry
pub fn get_supported_crawlers() -> Vec<&'static str> {
    vec![
        MARKET_CRAWLER,
        MARKET_QUANT_CRAWLER,
        NEWS_CRAWLER,
        FACTOR_CRAWLER,
        PROMPT_CRAWLER,
        VECTOR_CRAWLER,
        WECHAT_CRAWLER,
        EXTERNAL_USER_CRAWLER,
    ]
}
