//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

use crate::cache::CacheConfig;
use crate::query::MAX_QUERY_LIMIT;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL (default: `sqlite::memory:`).
    pub database_url: String,

    /// Maximum database connections in pool (default: 5).
    pub database_max_connections: u32,

    /// Cap applied to `limit` parsed from query strings (default: 1000).
    pub query_max_limit: i64,

    /// Default cache TTL in seconds (default: 300).
    pub cache_ttl_secs: u64,

    /// Prefix for generated cache keys (default: "api").
    pub cache_key_prefix: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite::memory:".to_string());

        let database_max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let query_max_limit = match lookup("QUERY_MAX_LIMIT") {
            Some(raw) => raw
                .parse()
                .context("QUERY_MAX_LIMIT must be a valid integer")?,
            None => MAX_QUERY_LIMIT,
        };

        let cache_ttl_secs = lookup("CACHE_TTL_SECS")
            .unwrap_or_else(|| "300".to_string())
            .parse()
            .context("CACHE_TTL_SECS must be a valid u64")?;

        let cache_key_prefix = lookup("CACHE_KEY_PREFIX").unwrap_or_else(|| "api".to_string());

        Ok(Self {
            database_url,
            database_max_connections,
            query_max_limit,
            cache_ttl_secs,
            cache_key_prefix,
        })
    }

    /// Cache settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(self.cache_ttl_secs, self.cache_key_prefix.clone())
    }
}
