use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing is decoupled from the process environment so it can be tested with
/// a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let proxy_url = optional("FDCDB_PROXY_URL");
    let proxy_key = optional("FDCDB_PROXY_KEY");
    let database_url = optional("DATABASE_URL");

    let env = parse_environment(&or_default("FDCDB_ENV", "development"))?;
    let log_level = or_default("FDCDB_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("FDCDB_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("FDCDB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("FDCDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let request_timeout_secs = parse_u64("FDCDB_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("FDCDB_USER_AGENT", "fdcdb/0.1 (food-data-cache)");

    let max_attempts = parse_u32("FDCDB_MAX_ATTEMPTS", "3")?;
    if max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "FDCDB_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let retry_delay_ms = parse_u64("FDCDB_RETRY_DELAY_MS", "400")?;
    let cache_ttl_days = parse_u32("FDCDB_CACHE_TTL_DAYS", "30")?;

    let search_page_size = parse_u32("FDCDB_SEARCH_PAGE_SIZE", "25")?;
    if !(1..=200).contains(&search_page_size) {
        return Err(ConfigError::InvalidEnvVar {
            var: "FDCDB_SEARCH_PAGE_SIZE".to_string(),
            reason: format!("{search_page_size} is outside 1..=200"),
        });
    }
    let search_sort_by = optional("FDCDB_SEARCH_SORT_BY");
    let search_sort_order = optional("FDCDB_SEARCH_SORT_ORDER")
        .map(|order| parse_sort_order(&order))
        .transpose()?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        proxy_url,
        proxy_key,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        request_timeout_secs,
        user_agent,
        max_attempts,
        retry_delay_ms,
        cache_ttl_days,
        search_page_size,
        search_sort_by,
        search_sort_order,
    })
}

/// Normalizes a search sort order to `asc` or `desc`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for any other value.
fn parse_sort_order(s: &str) -> Result<String, ConfigError> {
    match s.to_ascii_lowercase().as_str() {
        order @ ("asc" | "desc") => Ok(order.to_string()),
        _ => Err(ConfigError::InvalidEnvVar {
            var: "FDCDB_SEARCH_SORT_ORDER".to_string(),
            reason: format!("expected 'asc' or 'desc', got '{s}'"),
        }),
    }
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FDCDB_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
