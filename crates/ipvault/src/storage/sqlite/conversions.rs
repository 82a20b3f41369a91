//! SQLite row and value conversions.
//!
//! Pure functions between the domain types and their physical encodings:
//! v4 values as integers, v6 values as 16-byte big-endian blobs, dates as
//! ISO-8601 text. Testable without database access.

use chrono::NaiveDate;
use ipvault_core::address::{IpValue, IpVersion};
use ipvault_core::storage::{Address, Limit, Rank, Source};
use rusqlite::types::{Type, Value};
use rusqlite::Row;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Encode an address value for binding.
pub fn encode_value(value: IpValue) -> Value {
    match value {
        IpValue::V4(v) => Value::Integer(i64::from(v)),
        IpValue::V6(v) => Value::Blob(v.to_be_bytes().to_vec()),
    }
}

/// Bind values for the trailing `LIMIT ?n OFFSET ?m` clause.
///
/// `None` binds `(-1, 0)`: SQLite treats a negative LIMIT as unbounded.
pub fn limit_params(limit: Option<Limit>) -> (i64, i64) {
    match limit {
        Some(limit) => (limit.count as i64, limit.offset as i64),
        None => (-1, 0),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(text: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Convert a SQLite row to an Address.
///
/// Expected columns: id, address, date_added
pub fn row_to_address(version: IpVersion, row: &Row) -> rusqlite::Result<Address> {
    let id: i64 = row.get(0)?;
    let value = match version {
        IpVersion::V4 => {
            let raw: i64 = row.get(1)?;
            let raw = u32::try_from(raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, Type::Integer, Box::new(e))
            })?;
            IpValue::V4(raw)
        }
        IpVersion::V6 => {
            let raw: Vec<u8> = row.get(1)?;
            let raw: [u8; 16] = raw.as_slice().try_into().map_err(|_| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    Type::Blob,
                    format!("expected a 16-byte v6 value, got {} bytes", raw.len()).into(),
                )
            })?;
            IpValue::V6(u128::from_be_bytes(raw))
        }
    };
    let date_added: String = row.get(2)?;

    Ok(Address {
        id,
        value,
        date_added: parse_date(&date_added)?,
    })
}

/// Convert a SQLite row to a Source.
///
/// Expected columns: id, source_name, url, source_date_added,
/// url_date_modified, rank
pub fn row_to_source(row: &Row) -> rusqlite::Result<Source> {
    let id: i64 = row.get(0)?;
    let name: String = row.get(1)?;
    let url: String = row.get(2)?;
    let date_added: String = row.get(3)?;
    let date_modified: String = row.get(4)?;
    let rank: i64 = row.get(5)?;

    Ok(Source {
        id,
        name,
        url,
        date_added: parse_date(&date_added)?,
        date_modified: parse_date(&date_modified)?,
        rank: Rank::new(rank).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, Type::Integer, e.to_string().into())
        })?,
    })
}
