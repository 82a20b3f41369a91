//! SQLite backend for the ipvault address store.
//!
//! Provides the bounded connection pool and the repository implementation
//! over two per-version address tables plus their linking tables. The
//! domain types and traits live in [`ipvault_core`].

pub mod config;
pub mod pool;
pub mod storage;

pub use config::Config;
pub use pool::{ConnectionPool, PoolConfig, PooledConnection};
pub use storage::sqlite::SqliteRepository;
