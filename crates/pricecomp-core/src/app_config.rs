use std::net::SocketAddr;

use crate::region::Region;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Region used when a request names none.
    pub default_region: Region,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
    /// Single deadline applied to the whole retriever fan-out.
    pub fanout_timeout_secs: u64,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_secs: u64,
    pub rate_limit_per_sec: u32,
    pub rate_limit_burst: u32,
    /// Most callers the rate limiter tracks at once.
    pub rate_limit_max_clients: u64,
    /// Identify callers by `x-forwarded-for`. Only safe behind a proxy that
    /// overwrites the header.
    pub trust_forwarded_for: bool,
}
