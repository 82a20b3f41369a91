use async_trait::async_trait;

use crate::error::Result;

use super::types::{Address, DateRange, Limit, ListKind, Source};

/// Repository for address range, membership, and provenance queries.
///
/// Textual address arguments are decoded by the codec inside the
/// implementation; queries dispatch across both per-version stores and
/// concatenate v4 rows before v6 rows, each in insertion order.
#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// Addresses linked to the source with the given exact name.
    ///
    /// An unknown name yields an empty vec, not an error.
    async fn find_by_source(&self, name: &str, limit: Option<Limit>) -> Result<Vec<Address>>;

    /// Addresses with a value inclusively between the two endpoints.
    ///
    /// Fails with `RangeVersionMismatch` when the endpoint versions
    /// differ; only the matching version's store is searched.
    async fn find_in_range(&self, start: &str, end: &str, limit: Option<Limit>)
        -> Result<Vec<Address>>;

    /// Addresses from both stores whose `date_added` falls in the range.
    async fn find_added_between(&self, range: DateRange, limit: Option<Limit>)
        -> Result<Vec<Address>>;

    /// Addresses with no source link.
    async fn find_without_source(&self, limit: Option<Limit>) -> Result<Vec<Address>>;

    /// Whether the address is present in its version's store.
    async fn exists(&self, address: &str) -> Result<bool>;

    /// Inserts an address into the version-appropriate store with
    /// `date_added` set to the current date. Returns the row id; inserting
    /// an already-stored address returns the existing id.
    async fn insert(&self, address: &str) -> Result<i64>;

    /// Removes the address, its list membership, and its source links in
    /// one atomic unit. Fails with `AddressNotFound` when absent.
    async fn delete_address(&self, address: &str) -> Result<()>;

    /// Applies the same cascading delete to every address in the range,
    /// atomically for the whole range. Returns the number of addresses
    /// removed.
    async fn delete_range(&self, start: &str, end: &str) -> Result<u64>;
}

/// Repository for source provenance records.
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Inserts a source. Fails with `InvalidRank` outside `[1, 10]` and
    /// `DuplicateSource` when the name is already present.
    async fn insert_source(&self, name: &str, url: &str, rank: i64) -> Result<i64>;

    /// The full source record for an exact name, if any.
    async fn find_source_by_name(&self, name: &str) -> Result<Option<Source>>;

    /// Sources whose `date_modified` falls in the range.
    async fn find_sources_modified_between(
        &self,
        range: DateRange,
        limit: Option<Limit>,
    ) -> Result<Vec<Source>>;

    /// Links an existing address to an existing source.
    async fn link_source(&self, address: &str, source_name: &str) -> Result<()>;
}

/// Repository enforcing the allow/deny exclusivity invariant.
#[async_trait]
pub trait ListRepository: Send + Sync {
    /// The list holding the address, if any.
    ///
    /// Membership in both lists at once signals broken data and fails
    /// with `ListConflict`; it is reported, never silently repaired.
    async fn classify(&self, address: &str) -> Result<Option<ListKind>>;

    /// Adds the address to a list. Fails with `AddressNotFound` when the
    /// address is not stored and with `ListConflict` when the opposite
    /// list already holds it. Re-adding to the same list is a no-op.
    async fn add_to_list(&self, address: &str, kind: ListKind) -> Result<()>;

    /// Removes the matching membership row if present; no-op otherwise.
    async fn remove_from_list(&self, address: &str, kind: ListKind) -> Result<()>;
}
