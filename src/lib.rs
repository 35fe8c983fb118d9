//! Gleaner: a polite crawl and extraction engine
//!
//! This crate fetches pages politely (per-domain rate limits, robots.txt,
//! retry with backoff), applies a declarative item/field schema to the HTML,
//! follows pagination with a cycle guard, and keeps per-job state in SQLite
//! so runs can resume and deduplicate.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod framework;
pub mod output;
pub mod robots;
pub mod schema;
pub mod selector;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Gleaner operations
#[derive(Debug, Error)]
pub enum GleanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while loading an extraction schema document
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML schema: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid schema '{name}': {message}")]
    Invalid { name: String, message: String },
}

/// Result type alias for Gleaner operations
pub type Result<T> = std::result::Result<T, GleanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for schema loading
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, FetchError, HttpFetcher, PageSource, RateLimiter};
pub use extract::{Record, SchemaParser};
pub use robots::RobotsPolicy;
pub use schema::{load_schema, ExtractionSchema, FieldSpec, PaginationSpec};
pub use storage::{SqliteStateStore, StateStore};
