use crate::config::types::{Config, HttpConfig, PolitenessConfig, StorageConfig};
use crate::ConfigError;

/// Upper bound on the configured per-domain request rate
const MAX_RPS: f64 = 100.0;

/// Longest robots.txt cache lifetime accepted (one year)
pub const MAX_ROBOTS_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_politeness_config(&config.politeness)?;
    validate_http_config(&config.http)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates rate limiting and robots settings
fn validate_politeness_config(config: &PolitenessConfig) -> Result<(), ConfigError> {
    let rps = config.requests_per_second;
    if !rps.is_finite() || rps <= 0.0 || rps > MAX_RPS {
        return Err(ConfigError::Validation(format!(
            "requests_per_second must be in (0, {}], got {}",
            MAX_RPS, rps
        )));
    }

    if config.burst < 1 {
        return Err(ConfigError::Validation(format!(
            "burst must be >= 1, got {}",
            config.burst
        )));
    }

    if let Some(ttl) = config.robots_ttl_secs {
        if ttl > MAX_ROBOTS_TTL_SECS {
            return Err(ConfigError::Validation(format!(
                "robots_ttl_secs must be <= {}, got {}",
                MAX_ROBOTS_TTL_SECS, ttl
            )));
        }
    }

    let agent = config.robots_user_agent.trim();
    if agent.is_empty() {
        return Err(ConfigError::Validation(
            "robots_user_agent cannot be empty".to_string(),
        ));
    }

    // robots.txt matching works on product tokens, not full UA strings
    if agent.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "robots_user_agent must be a single token, got '{}'",
            config.robots_user_agent
        )));
    }

    Ok(())
}

/// Validates HTTP client settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if let Some(ua) = &config.user_agent {
        if ua.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_agent cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates storage paths
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.state_path.is_empty() {
        return Err(ConfigError::Validation(
            "state_path cannot be empty".to_string(),
        ));
    }

    if config.robots_cache_path.is_empty() {
        return Err(ConfigError::Validation(
            "robots_cache_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
