use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable overriding the default requests-per-second
pub const ENV_DEFAULT_RPS: &str = "GLEANER_DEFAULT_RPS";

/// Environment variable that disables robots.txt checks when truthy
pub const ENV_IGNORE_ROBOTS: &str = "GLEANER_IGNORE_ROBOTS";

/// Environment variable overriding the state database path
pub const ENV_STATE_DB: &str = "GLEANER_STATE_DB";

/// Loads and parses a configuration file from the given path
///
/// Environment overrides are applied after parsing and before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;

    Ok(config)
}

/// Builds the effective configuration when no file was given
///
/// Starts from defaults and applies the same environment overrides as
/// [`load_config`].
pub fn default_config() -> Result<Config, ConfigError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// Overlays environment variables onto a parsed configuration
///
/// `lookup` abstracts `std::env::var` so tests can supply their own values.
/// An unparsable or non-positive rate is ignored with a warning and the
/// configured value is kept.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ENV_DEFAULT_RPS) {
        match raw.trim().parse::<f64>() {
            Ok(rps) if rps.is_finite() && rps > 0.0 => {
                config.politeness.requests_per_second = rps;
            }
            _ => {
                tracing::warn!(
                    "Ignoring invalid {}={:?}, keeping {} req/s",
                    ENV_DEFAULT_RPS,
                    raw,
                    config.politeness.requests_per_second
                );
            }
        }
    }

    if let Some(raw) = lookup(ENV_IGNORE_ROBOTS) {
        config.politeness.ignore_robots = is_truthy(&raw);
    }

    if let Some(path) = lookup(ENV_STATE_DB) {
        if !path.trim().is_empty() {
            config.storage.state_path = path;
        }
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so two runs can be compared for configuration drift.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
