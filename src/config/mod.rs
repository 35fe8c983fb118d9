//! Configuration module for Gleaner
//!
//! This module handles loading, parsing, and validating the TOML
//! configuration file and the environment overrides layered on top of it.
//!
//! # Example
//!
//! ```no_run
//! use gleaner::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("gleaner.toml")).unwrap();
//! println!("Default rate: {} req/s", config.politeness.requests_per_second);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, HttpConfig, PolitenessConfig, StorageConfig};
pub use validation::{validate, MAX_ROBOTS_TTL_SECS};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, default_config, load_config,
    load_config_with_hash, ENV_DEFAULT_RPS, ENV_IGNORE_ROBOTS, ENV_STATE_DB,
};
