//! Core domain layer for the ipvault project.
//!
//! Contains the address codec, the record types, the closed error
//! enumeration, and the repository traits that storage backends implement.
//! This crate performs no I/O; everything here is pure and testable in
//! isolation.

pub mod address;
pub mod error;
pub mod storage;

pub use error::{Result, StoreError};
