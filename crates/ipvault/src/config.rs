use std::{env, time::Duration};

use crate::pool::PoolConfig;

/// Store configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file (default: "ipvault.db")
    pub database_path: String,
    /// Connections kept persistently in the pool (default: 5)
    pub pool_size: usize,
    /// Extra transient connections allowed beyond `pool_size` (default: 10)
    pub pool_max_overflow: usize,
    /// Maximum wait for a connection, in seconds (default: 30)
    pub pool_timeout_seconds: u64,
    /// Maximum connection age before forced replacement, in seconds
    /// (default: 3600)
    pub pool_recycle_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `IPVAULT_DB_PATH` - SQLite database path (default: "ipvault.db")
    /// - `IPVAULT_POOL_SIZE` - Persistent pool size (default: 5)
    /// - `IPVAULT_POOL_MAX_OVERFLOW` - Transient overflow allowance (default: 10)
    /// - `IPVAULT_POOL_TIMEOUT_SECONDS` - Acquire timeout (default: 30)
    /// - `IPVAULT_POOL_RECYCLE_SECONDS` - Connection max age (default: 3600)
    pub fn from_env() -> Self {
        Self {
            database_path: env::var("IPVAULT_DB_PATH").unwrap_or_else(|_| "ipvault.db".to_string()),
            pool_size: env::var("IPVAULT_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            pool_max_overflow: env::var("IPVAULT_POOL_MAX_OVERFLOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            pool_timeout_seconds: env::var("IPVAULT_POOL_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            pool_recycle_seconds: env::var("IPVAULT_POOL_RECYCLE_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
        }
    }

    /// Pool parameters as a [`PoolConfig`].
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            size: self.pool_size,
            max_overflow: self.pool_max_overflow,
            timeout: Duration::from_secs(self.pool_timeout_seconds),
            recycle: Duration::from_secs(self.pool_recycle_seconds),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
