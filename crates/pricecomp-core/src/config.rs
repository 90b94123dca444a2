use crate::app_config::{AppConfig, Environment};
use crate::region::Region;
use crate::ConfigError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Does not read `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Builds configuration from an arbitrary env-var lookup so tests can drive
/// it from a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let env = parse_environment(&or_default("PRICECOMP_ENV", "development"));
    let bind_addr = parse_addr("PRICECOMP_BIND_ADDR", "0.0.0.0:8085")?;
    let log_level = or_default("PRICECOMP_LOG_LEVEL", "info");

    let default_region = Region::parse(&or_default("PRICECOMP_DEFAULT_REGION", "IN"))
        .ok_or_else(|| invalid("PRICECOMP_DEFAULT_REGION", "must not be blank".to_string()))?;

    let cache_enabled = parse_bool("PRICECOMP_CACHE_ENABLED", "true")?;
    let cache_ttl_secs = parse_u64("PRICECOMP_CACHE_TTL_SECS", "600")?;
    let cache_max_entries = parse_u64("PRICECOMP_CACHE_MAX_ENTRIES", "10000")?;

    let fanout_timeout_secs = parse_u64("PRICECOMP_FANOUT_TIMEOUT_SECS", "25")?;
    if fanout_timeout_secs == 0 {
        return Err(invalid(
            "PRICECOMP_FANOUT_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    let scraper_request_timeout_secs = parse_u64("PRICECOMP_SCRAPER_REQUEST_TIMEOUT_SECS", "15")?;
    let scraper_user_agent = or_default("PRICECOMP_SCRAPER_USER_AGENT", DEFAULT_USER_AGENT);
    let scraper_max_retries = parse_u32("PRICECOMP_SCRAPER_MAX_RETRIES", "1")?;
    let scraper_retry_backoff_base_secs =
        parse_u64("PRICECOMP_SCRAPER_RETRY_BACKOFF_BASE_SECS", "1")?;

    let rate_limit_per_sec = parse_u32("PRICECOMP_RATE_LIMIT_PER_SEC", "10")?;
    let rate_limit_burst = parse_u32("PRICECOMP_RATE_LIMIT_BURST", "20")?;
    if rate_limit_burst == 0 {
        return Err(invalid(
            "PRICECOMP_RATE_LIMIT_BURST",
            "must be greater than zero".to_string(),
        ));
    }
    let rate_limit_max_clients = parse_u64("PRICECOMP_RATE_LIMIT_MAX_CLIENTS", "100000")?;
    if rate_limit_max_clients == 0 {
        return Err(invalid(
            "PRICECOMP_RATE_LIMIT_MAX_CLIENTS",
            "must be greater than zero".to_string(),
        ));
    }
    let trust_forwarded_for = parse_bool("PRICECOMP_TRUST_FORWARDED_FOR", "false")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        default_region,
        cache_enabled,
        cache_ttl_secs,
        cache_max_entries,
        fanout_timeout_secs,
        scraper_request_timeout_secs,
        scraper_user_agent,
        scraper_max_retries,
        scraper_retry_backoff_base_secs,
        rate_limit_per_sec,
        rate_limit_burst,
        rate_limit_max_clients,
        trust_forwarded_for,
    })
}

/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
