//! Storage traits and the types flowing through them.

mod traits;
mod types;

pub use traits::{AddressRepository, ListRepository, SourceRepository};
pub use types::{Address, DateRange, Limit, ListKind, Rank, Source};

pub use crate::error::{Result, StoreError};
