//! SQLite repository implementation.
//!
//! Implements the repository traits from `ipvault_core::storage`. Each
//! operation acquires one pooled connection; multi-statement units run
//! inside a single transaction on that connection, so the connection is
//! always released outside any transactional state.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use ipvault_core::address::{self, IpVersion};
use ipvault_core::storage::{
    Address, AddressRepository, DateRange, Limit, ListKind, ListRepository, Rank, Result, Source,
    SourceRepository, StoreError,
};

use crate::pool::ConnectionPool;

use super::conversions::{
    encode_value, format_date, limit_params, row_to_address, row_to_source,
};
use super::error::{map_source_insert_error, map_sqlite_error};
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// How an add-to-list attempt resolved inside its transaction.
enum AddOutcome {
    NoAddress,
    Conflict,
    Done,
}

/// How a link attempt resolved inside its transaction.
enum LinkOutcome {
    NoAddress,
    NoSource,
    Done,
}

/// SQLite-based repository over the two per-version address tables.
pub struct SqliteRepository {
    pool: ConnectionPool,
}

impl SqliteRepository {
    /// Creates a repository over the pool and bootstraps the schema.
    pub async fn new(pool: ConnectionPool) -> Result<Self> {
        let conn = pool.acquire().await?;
        conn.call(|conn| conn.execute_batch(schema::CREATE_TABLES).map_err(wrap_err))
            .await
            .map_err(map_sqlite_error)?;
        drop(conn);

        Ok(Self { pool })
    }

    /// The pool behind this repository, for lifecycle control.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

// ============================================================================
// AddressRepository implementation
// ============================================================================

#[async_trait]
impl AddressRepository for SqliteRepository {
    async fn find_by_source(&self, name: &str, limit: Option<Limit>) -> Result<Vec<Address>> {
        let conn = self.pool.acquire().await?;
        let name_arg = name.to_string();
        let (count, offset) = limit_params(limit);

        let addresses = conn
            .call(move |conn| {
                let mut out = Vec::new();
                for version in IpVersion::ALL {
                    let mut stmt = conn
                        .prepare(&schema::select_by_source(version))
                        .map_err(wrap_err)?;
                    let rows = stmt
                        .query_map(params![name_arg, count, offset], |row| {
                            row_to_address(version, row)
                        })
                        .map_err(wrap_err)?;
                    for row in rows {
                        out.push(row.map_err(wrap_err)?);
                    }
                }
                Ok(out)
            })
            .await
            .map_err(map_sqlite_error)?;

        tracing::debug!(source = name, matches = addresses.len(), "Searched addresses by source");
        Ok(addresses)
    }

    async fn find_in_range(
        &self,
        start: &str,
        end: &str,
        limit: Option<Limit>,
    ) -> Result<Vec<Address>> {
        let start_value = address::parse(start)?;
        let end_value = address::parse(end)?;
        let version = start_value.version();
        if version != end_value.version() {
            return Err(StoreError::RangeVersionMismatch);
        }

        let conn = self.pool.acquire().await?;
        let (count, offset) = limit_params(limit);
        let (start_enc, end_enc) = (encode_value(start_value), encode_value(end_value));

        let addresses = conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&schema::select_in_range(version))
                    .map_err(wrap_err)?;
                let rows = stmt
                    .query_map(params![start_enc, end_enc, count, offset], |row| {
                        row_to_address(version, row)
                    })
                    .map_err(wrap_err)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(wrap_err)?);
                }
                Ok(out)
            })
            .await
            .map_err(map_sqlite_error)?;

        tracing::debug!(start, end, matches = addresses.len(), "Searched addresses in range");
        Ok(addresses)
    }

    async fn find_added_between(
        &self,
        range: DateRange,
        limit: Option<Limit>,
    ) -> Result<Vec<Address>> {
        let conn = self.pool.acquire().await?;
        let (count, offset) = limit_params(limit);
        let (start, end) = (format_date(range.start), format_date(range.end));

        let addresses = conn
            .call(move |conn| {
                let mut out = Vec::new();
                for version in IpVersion::ALL {
                    let mut stmt = conn
                        .prepare(&schema::select_added_between(version))
                        .map_err(wrap_err)?;
                    let rows = stmt
                        .query_map(params![start, end, count, offset], |row| {
                            row_to_address(version, row)
                        })
                        .map_err(wrap_err)?;
                    for row in rows {
                        out.push(row.map_err(wrap_err)?);
                    }
                }
                Ok(out)
            })
            .await
            .map_err(map_sqlite_error)?;

        tracing::debug!(
            start = %range.start,
            end = %range.end,
            matches = addresses.len(),
            "Searched addresses by date added"
        );
        Ok(addresses)
    }

    async fn find_without_source(&self, limit: Option<Limit>) -> Result<Vec<Address>> {
        let conn = self.pool.acquire().await?;
        let (count, offset) = limit_params(limit);

        let addresses = conn
            .call(move |conn| {
                let mut out = Vec::new();
                for version in IpVersion::ALL {
                    let mut stmt = conn
                        .prepare(&schema::select_without_source(version))
                        .map_err(wrap_err)?;
                    let rows = stmt
                        .query_map(params![count, offset], |row| row_to_address(version, row))
                        .map_err(wrap_err)?;
                    for row in rows {
                        out.push(row.map_err(wrap_err)?);
                    }
                }
                Ok(out)
            })
            .await
            .map_err(map_sqlite_error)?;

        tracing::debug!(matches = addresses.len(), "Searched addresses without a source");
        Ok(addresses)
    }

    async fn exists(&self, address: &str) -> Result<bool> {
        let value = address::parse(address)?;
        let version = value.version();

        let conn = self.pool.acquire().await?;
        let encoded = encode_value(value);

        let found: i64 = conn
            .call(move |conn| {
                conn.query_row(&schema::count_by_value(version), params![encoded], |row| {
                    row.get(0)
                })
                .map_err(wrap_err)
            })
            .await
            .map_err(map_sqlite_error)?;

        tracing::debug!(address, found = found > 0, "Checked address presence");
        Ok(found > 0)
    }

    async fn insert(&self, address: &str) -> Result<i64> {
        let value = address::parse(address)?;
        let version = value.version();
        let today = format_date(Utc::now().date_naive());

        let conn = self.pool.acquire().await?;
        let encoded = encode_value(value);

        let id = conn
            .call(move |conn| {
                conn.execute(
                    &schema::insert_address(version),
                    params![encoded.clone(), today],
                )
                .map_err(wrap_err)?;
                conn.query_row(&schema::select_id_by_value(version), params![encoded], |row| {
                    row.get(0)
                })
                .map_err(wrap_err)
            })
            .await
            .map_err(map_sqlite_error)?;

        tracing::debug!(address, id, "Inserted address");
        Ok(id)
    }

    async fn delete_address(&self, address: &str) -> Result<()> {
        let value = address::parse(address)?;
        let version = value.version();

        let conn = self.pool.acquire().await?;
        let encoded = encode_value(value);

        let deleted = conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let id: Option<i64> = tx
                    .query_row(&schema::select_id_by_value(version), params![encoded], |row| {
                        row.get(0)
                    })
                    .optional()
                    .map_err(wrap_err)?;
                let Some(id) = id else {
                    return Ok(false);
                };

                // Dependency order: memberships, links, then the address.
                for kind in [ListKind::Allow, ListKind::Deny] {
                    tx.execute(&schema::delete_membership(version, kind), params![id])
                        .map_err(wrap_err)?;
                }
                tx.execute(&schema::delete_links(version), params![id])
                    .map_err(wrap_err)?;
                tx.execute(&schema::delete_address_row(version), params![id])
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(true)
            })
            .await
            .map_err(map_sqlite_error)?;

        if !deleted {
            return Err(StoreError::AddressNotFound(address.to_string()));
        }
        tracing::debug!(address, "Deleted address with its links and memberships");
        Ok(())
    }

    async fn delete_range(&self, start: &str, end: &str) -> Result<u64> {
        let start_value = address::parse(start)?;
        let end_value = address::parse(end)?;
        let version = start_value.version();
        if version != end_value.version() {
            return Err(StoreError::RangeVersionMismatch);
        }

        let conn = self.pool.acquire().await?;
        let (start_enc, end_enc) = (encode_value(start_value), encode_value(end_value));

        // One transaction for the whole range: either every address in the
        // range is fully removed or none is.
        let removed = conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let ids: Vec<i64> = {
                    let mut stmt = tx
                        .prepare(&schema::select_ids_in_range(version))
                        .map_err(wrap_err)?;
                    let rows = stmt
                        .query_map(params![start_enc, end_enc], |row| row.get(0))
                        .map_err(wrap_err)?;
                    let mut ids = Vec::new();
                    for row in rows {
                        ids.push(row.map_err(wrap_err)?);
                    }
                    ids
                };

                for &id in &ids {
                    for kind in [ListKind::Allow, ListKind::Deny] {
                        tx.execute(&schema::delete_membership(version, kind), params![id])
                            .map_err(wrap_err)?;
                    }
                    tx.execute(&schema::delete_links(version), params![id])
                        .map_err(wrap_err)?;
                    tx.execute(&schema::delete_address_row(version), params![id])
                        .map_err(wrap_err)?;
                }
                tx.commit().map_err(wrap_err)?;
                Ok(ids.len() as u64)
            })
            .await
            .map_err(map_sqlite_error)?;

        tracing::debug!(start, end, removed, "Deleted address range");
        Ok(removed)
    }
}

// ============================================================================
// SourceRepository implementation
// ============================================================================

#[async_trait]
impl SourceRepository for SqliteRepository {
    async fn insert_source(&self, name: &str, url: &str, rank: i64) -> Result<i64> {
        let rank = Rank::new(rank)?;
        let today = format_date(Utc::now().date_naive());

        let conn = self.pool.acquire().await?;
        let (name_arg, url_arg) = (name.to_string(), url.to_string());

        let id = conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_SOURCE,
                    params![name_arg, url_arg, today.clone(), today, i64::from(rank)],
                )
                .map_err(wrap_err)?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(|e| map_source_insert_error(e, name))?;

        tracing::debug!(source = name, id, "Inserted source");
        Ok(id)
    }

    async fn find_source_by_name(&self, name: &str) -> Result<Option<Source>> {
        let conn = self.pool.acquire().await?;
        let name_arg = name.to_string();

        let source = conn
            .call(move |conn| {
                conn.query_row(schema::SELECT_SOURCE_BY_NAME, params![name_arg], row_to_source)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(map_sqlite_error)?;

        tracing::debug!(source = name, found = source.is_some(), "Searched source by name");
        Ok(source)
    }

    async fn find_sources_modified_between(
        &self,
        range: DateRange,
        limit: Option<Limit>,
    ) -> Result<Vec<Source>> {
        let conn = self.pool.acquire().await?;
        let (count, offset) = limit_params(limit);
        let (start, end) = (format_date(range.start), format_date(range.end));

        let sources = conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_SOURCES_MODIFIED_BETWEEN)
                    .map_err(wrap_err)?;
                let rows = stmt
                    .query_map(params![start, end, count, offset], row_to_source)
                    .map_err(wrap_err)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(wrap_err)?);
                }
                Ok(out)
            })
            .await
            .map_err(map_sqlite_error)?;

        tracing::debug!(
            start = %range.start,
            end = %range.end,
            matches = sources.len(),
            "Searched sources by modification date"
        );
        Ok(sources)
    }

    async fn link_source(&self, address: &str, source_name: &str) -> Result<()> {
        let value = address::parse(address)?;
        let version = value.version();

        let conn = self.pool.acquire().await?;
        let encoded = encode_value(value);
        let name_arg = source_name.to_string();

        let outcome = conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let address_id: Option<i64> = tx
                    .query_row(&schema::select_id_by_value(version), params![encoded], |row| {
                        row.get(0)
                    })
                    .optional()
                    .map_err(wrap_err)?;
                let Some(address_id) = address_id else {
                    return Ok(LinkOutcome::NoAddress);
                };
                let source_id: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM sources WHERE source_name = ?1",
                        params![name_arg],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(wrap_err)?;
                let Some(source_id) = source_id else {
                    return Ok(LinkOutcome::NoSource);
                };
                tx.execute(&schema::insert_link(version), params![source_id, address_id])
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(LinkOutcome::Done)
            })
            .await
            .map_err(map_sqlite_error)?;

        match outcome {
            LinkOutcome::NoAddress => Err(StoreError::AddressNotFound(address.to_string())),
            LinkOutcome::NoSource => Err(StoreError::SourceNotFound(source_name.to_string())),
            LinkOutcome::Done => {
                tracing::debug!(address, source = source_name, "Linked address to source");
                Ok(())
            }
        }
    }
}

// ============================================================================
// ListRepository implementation
// ============================================================================

#[async_trait]
impl ListRepository for SqliteRepository {
    async fn classify(&self, address: &str) -> Result<Option<ListKind>> {
        let value = address::parse(address)?;
        let version = value.version();

        let conn = self.pool.acquire().await?;
        let encoded = encode_value(value);

        let counts: Option<(i64, i64)> = conn
            .call(move |conn| {
                let id: Option<i64> = conn
                    .query_row(&schema::select_id_by_value(version), params![encoded], |row| {
                        row.get(0)
                    })
                    .optional()
                    .map_err(wrap_err)?;
                let Some(id) = id else {
                    return Ok(None);
                };
                let allow: i64 = conn
                    .query_row(
                        &schema::count_membership(version, ListKind::Allow),
                        params![id],
                        |row| row.get(0),
                    )
                    .map_err(wrap_err)?;
                let deny: i64 = conn
                    .query_row(
                        &schema::count_membership(version, ListKind::Deny),
                        params![id],
                        |row| row.get(0),
                    )
                    .map_err(wrap_err)?;
                Ok(Some((allow, deny)))
            })
            .await
            .map_err(map_sqlite_error)?;

        let kind = match counts {
            None | Some((0, 0)) => None,
            // Membership in both lists is a data-integrity alarm, not a
            // normal outcome; report it instead of picking one.
            Some((allow, deny)) if allow > 0 && deny > 0 => {
                return Err(StoreError::ListConflict(address.to_string()));
            }
            Some((allow, _)) if allow > 0 => Some(ListKind::Allow),
            Some(_) => Some(ListKind::Deny),
        };

        tracing::debug!(address, ?kind, "Classified address");
        Ok(kind)
    }

    async fn add_to_list(&self, address: &str, kind: ListKind) -> Result<()> {
        let value = address::parse(address)?;
        let version = value.version();

        let conn = self.pool.acquire().await?;
        let encoded = encode_value(value);

        let outcome = conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let id: Option<i64> = tx
                    .query_row(&schema::select_id_by_value(version), params![encoded], |row| {
                        row.get(0)
                    })
                    .optional()
                    .map_err(wrap_err)?;
                let Some(id) = id else {
                    return Ok(AddOutcome::NoAddress);
                };

                // Exclusivity check before the write.
                let opposite: i64 = tx
                    .query_row(
                        &schema::count_membership(version, kind.opposite()),
                        params![id],
                        |row| row.get(0),
                    )
                    .map_err(wrap_err)?;
                if opposite > 0 {
                    return Ok(AddOutcome::Conflict);
                }

                let already: i64 = tx
                    .query_row(
                        &schema::count_membership(version, kind),
                        params![id],
                        |row| row.get(0),
                    )
                    .map_err(wrap_err)?;
                if already == 0 {
                    tx.execute(&schema::insert_membership(version, kind), params![id])
                        .map_err(wrap_err)?;
                }
                tx.commit().map_err(wrap_err)?;
                Ok(AddOutcome::Done)
            })
            .await
            .map_err(map_sqlite_error)?;

        match outcome {
            AddOutcome::NoAddress => Err(StoreError::AddressNotFound(address.to_string())),
            AddOutcome::Conflict => Err(StoreError::ListConflict(address.to_string())),
            AddOutcome::Done => {
                tracing::debug!(address, ?kind, "Added address to list");
                Ok(())
            }
        }
    }

    async fn remove_from_list(&self, address: &str, kind: ListKind) -> Result<()> {
        let value = address::parse(address)?;
        let version = value.version();

        let conn = self.pool.acquire().await?;
        let encoded = encode_value(value);

        let removed: usize = conn
            .call(move |conn| {
                let id: Option<i64> = conn
                    .query_row(&schema::select_id_by_value(version), params![encoded], |row| {
                        row.get(0)
                    })
                    .optional()
                    .map_err(wrap_err)?;
                let Some(id) = id else {
                    return Ok(0);
                };
                conn.execute(&schema::delete_membership(version, kind), params![id])
                    .map_err(wrap_err)
            })
            .await
            .map_err(map_sqlite_error)?;

        tracing::debug!(address, ?kind, removed, "Removed address from list");
        Ok(())
    }
}
