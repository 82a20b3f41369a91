//! Schema definition and SQL statement builders.
//!
//! The two address families live in physically separate tables that share
//! one logical shape, so most statements exist in a v4 and a v6 variant.
//! Builders substitute only the fixed identifiers returned by the dispatch
//! functions below; every value travels through parameter binding.
//!
//! Statements that support pagination always end in `LIMIT ?n OFFSET ?m`;
//! callers bind `(-1, 0)` when no limit was requested (SQLite treats a
//! negative LIMIT as unbounded).

use ipvault_core::address::IpVersion;
use ipvault_core::storage::ListKind;

/// SQL batch to create all tables.
pub const CREATE_TABLES: &str = r#"
-- Per-version address tables; v6 values are 16-byte big-endian blobs so
-- memcmp ordering coincides with integer ordering.
CREATE TABLE IF NOT EXISTS ipv4_addresses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address INTEGER NOT NULL UNIQUE,
    date_added TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ipv6_addresses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address BLOB NOT NULL UNIQUE,
    date_added TEXT NOT NULL
);

-- Provenance records
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_name TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    source_date_added TEXT NOT NULL,
    url_date_modified TEXT NOT NULL,
    rank INTEGER NOT NULL CHECK (rank BETWEEN 1 AND 10)
);

-- Many sources to many addresses; exactly one of v4_id/v6_id is set
CREATE TABLE IF NOT EXISTS source_to_addresses (
    source_id INTEGER NOT NULL,
    v4_id INTEGER,
    v6_id INTEGER
);

-- Mutually exclusive list memberships
CREATE TABLE IF NOT EXISTS whitelist (
    v4_id_whitelist INTEGER,
    v6_id_whitelist INTEGER
);

CREATE TABLE IF NOT EXISTS blacklist (
    v4_id_blacklist INTEGER,
    v6_id_blacklist INTEGER
);

CREATE INDEX IF NOT EXISTS idx_s2a_source_id ON source_to_addresses(source_id);
CREATE INDEX IF NOT EXISTS idx_s2a_v4_id ON source_to_addresses(v4_id);
CREATE INDEX IF NOT EXISTS idx_s2a_v6_id ON source_to_addresses(v6_id);
"#;

// ============================================================================
// Version/kind dispatch (fixed identifiers only)
// ============================================================================

/// Physical address table for a version.
pub fn address_table(version: IpVersion) -> &'static str {
    match version {
        IpVersion::V4 => "ipv4_addresses",
        IpVersion::V6 => "ipv6_addresses",
    }
}

/// Link column in `source_to_addresses` for a version.
pub fn link_column(version: IpVersion) -> &'static str {
    match version {
        IpVersion::V4 => "v4_id",
        IpVersion::V6 => "v6_id",
    }
}

/// Physical list table for a kind.
pub fn list_table(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Allow => "whitelist",
        ListKind::Deny => "blacklist",
    }
}

/// Id column in a list table for a version and kind.
pub fn list_column(version: IpVersion, kind: ListKind) -> &'static str {
    match (version, kind) {
        (IpVersion::V4, ListKind::Allow) => "v4_id_whitelist",
        (IpVersion::V6, ListKind::Allow) => "v6_id_whitelist",
        (IpVersion::V4, ListKind::Deny) => "v4_id_blacklist",
        (IpVersion::V6, ListKind::Deny) => "v6_id_blacklist",
    }
}

// ============================================================================
// Address queries
// ============================================================================

pub fn select_by_source(version: IpVersion) -> String {
    format!(
        "SELECT id, address, date_added FROM {table} \
         WHERE id IN ( \
             SELECT s2a.{col} FROM source_to_addresses s2a \
             JOIN sources ON s2a.source_id = sources.id \
             WHERE sources.source_name = ?1 \
         ) \
         ORDER BY id LIMIT ?2 OFFSET ?3",
        table = address_table(version),
        col = link_column(version),
    )
}

pub fn select_in_range(version: IpVersion) -> String {
    format!(
        "SELECT id, address, date_added FROM {table} \
         WHERE address BETWEEN ?1 AND ?2 \
         ORDER BY id LIMIT ?3 OFFSET ?4",
        table = address_table(version),
    )
}

pub fn select_added_between(version: IpVersion) -> String {
    format!(
        "SELECT id, address, date_added FROM {table} \
         WHERE date_added BETWEEN ?1 AND ?2 \
         ORDER BY id LIMIT ?3 OFFSET ?4",
        table = address_table(version),
    )
}

pub fn select_without_source(version: IpVersion) -> String {
    format!(
        "SELECT id, address, date_added FROM {table} \
         WHERE id NOT IN ( \
             SELECT {col} FROM source_to_addresses WHERE {col} IS NOT NULL \
         ) \
         ORDER BY id LIMIT ?1 OFFSET ?2",
        table = address_table(version),
        col = link_column(version),
    )
}

pub fn select_id_by_value(version: IpVersion) -> String {
    format!(
        "SELECT id FROM {table} WHERE address = ?1",
        table = address_table(version),
    )
}

pub fn select_ids_in_range(version: IpVersion) -> String {
    format!(
        "SELECT id FROM {table} WHERE address BETWEEN ?1 AND ?2 ORDER BY id",
        table = address_table(version),
    )
}

pub fn count_by_value(version: IpVersion) -> String {
    format!(
        "SELECT count(id) FROM {table} WHERE address = ?1",
        table = address_table(version),
    )
}

pub fn insert_address(version: IpVersion) -> String {
    format!(
        "INSERT OR IGNORE INTO {table} (address, date_added) VALUES (?1, ?2)",
        table = address_table(version),
    )
}

pub fn delete_address_row(version: IpVersion) -> String {
    format!(
        "DELETE FROM {table} WHERE id = ?1",
        table = address_table(version),
    )
}

// ============================================================================
// Source queries
// ============================================================================

pub const INSERT_SOURCE: &str = "INSERT INTO sources \
     (source_name, url, source_date_added, url_date_modified, rank) \
     VALUES (?1, ?2, ?3, ?4, ?5)";

pub const SELECT_SOURCE_BY_NAME: &str = "SELECT id, source_name, url, source_date_added, url_date_modified, rank \
     FROM sources WHERE source_name = ?1";

pub const SELECT_SOURCES_MODIFIED_BETWEEN: &str = "SELECT id, source_name, url, source_date_added, url_date_modified, rank \
     FROM sources WHERE url_date_modified BETWEEN ?1 AND ?2 \
     ORDER BY id LIMIT ?3 OFFSET ?4";

pub fn insert_link(version: IpVersion) -> String {
    format!(
        "INSERT INTO source_to_addresses (source_id, {col}) VALUES (?1, ?2)",
        col = link_column(version),
    )
}

pub fn delete_links(version: IpVersion) -> String {
    format!(
        "DELETE FROM source_to_addresses WHERE {col} = ?1",
        col = link_column(version),
    )
}

// ============================================================================
// List queries
// ============================================================================

pub fn count_membership(version: IpVersion, kind: ListKind) -> String {
    format!(
        "SELECT count(*) FROM {table} WHERE {col} = ?1",
        table = list_table(kind),
        col = list_column(version, kind),
    )
}

pub fn insert_membership(version: IpVersion, kind: ListKind) -> String {
    format!(
        "INSERT INTO {table} ({col}) VALUES (?1)",
        table = list_table(kind),
        col = list_column(version, kind),
    )
}

pub fn delete_membership(version: IpVersion, kind: ListKind) -> String {
    format!(
        "DELETE FROM {table} WHERE {col} = ?1",
        table = list_table(kind),
        col = list_column(version, kind),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_covers_all_tables() {
        for table in [
            "ipv4_addresses",
            "ipv6_addresses",
            "sources",
            "source_to_addresses",
            "whitelist",
            "blacklist",
        ] {
            assert!(CREATE_TABLES.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")));
        }
    }

    #[test]
    fn test_version_dispatch_picks_physical_names() {
        assert_eq!(address_table(IpVersion::V4), "ipv4_addresses");
        assert_eq!(address_table(IpVersion::V6), "ipv6_addresses");
        assert_eq!(link_column(IpVersion::V4), "v4_id");
        assert_eq!(link_column(IpVersion::V6), "v6_id");
        assert_eq!(list_column(IpVersion::V6, ListKind::Deny), "v6_id_blacklist");
    }

    #[test]
    fn test_builders_only_bind_values() {
        // No builder ever interpolates a value; spot-check the shapes.
        let sql = select_by_source(IpVersion::V4);
        assert!(sql.contains("source_name = ?1"));
        assert!(sql.ends_with("LIMIT ?2 OFFSET ?3"));

        let sql = select_in_range(IpVersion::V6);
        assert!(sql.contains("ipv6_addresses"));
        assert!(sql.contains("BETWEEN ?1 AND ?2"));

        let sql = insert_membership(IpVersion::V4, ListKind::Allow);
        assert_eq!(sql, "INSERT INTO whitelist (v4_id_whitelist) VALUES (?1)");
    }

    #[test]
    fn test_queries_order_within_a_version_by_insertion() {
        for sql in [
            select_by_source(IpVersion::V4),
            select_in_range(IpVersion::V4),
            select_added_between(IpVersion::V6),
            select_without_source(IpVersion::V6),
        ] {
            assert!(sql.contains("ORDER BY id"));
        }
    }
}
