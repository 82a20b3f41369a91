//! SQLite storage backend.
//!
//! Implements the repository traits from `ipvault_core::storage` over two
//! per-version address tables plus the source and list linking tables.
//! Every statement is parameterized; the only text substituted into SQL
//! is the fixed table/column name picked by the version dispatch in
//! `schema`.

mod conversions;
mod error;
mod repository;
mod schema;

pub use repository::SqliteRepository;
