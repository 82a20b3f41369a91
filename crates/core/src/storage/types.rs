use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::address::IpValue;
use crate::error::StoreError;

/// A stored address row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub value: IpValue,
    pub date_added: NaiveDate,
}

/// A provenance record describing where addresses were collected from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub date_added: NaiveDate,
    pub date_modified: NaiveDate,
    pub rank: Rank,
}

/// Mutually exclusive classification of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    Allow,
    Deny,
}

impl ListKind {
    pub fn opposite(&self) -> ListKind {
        match self {
            ListKind::Allow => ListKind::Deny,
            ListKind::Deny => ListKind::Allow,
        }
    }
}

/// Source rank, constrained to `[1, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rank(u8);

impl Rank {
    pub fn new(rank: i64) -> Result<Self, StoreError> {
        if !(1..=10).contains(&rank) {
            return Err(StoreError::InvalidRank(rank));
        }
        Ok(Self(rank as u8))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rank {
    type Error = StoreError;

    fn try_from(rank: i64) -> Result<Self, StoreError> {
        Rank::new(rank)
    }
}

impl From<Rank> for i64 {
    fn from(rank: Rank) -> i64 {
        i64::from(rank.0)
    }
}

/// An `(offset, count)` pagination window.
///
/// Constructed from signed caller input so that negative values surface
/// as `InvalidLimit` instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: u64,
    pub count: u64,
}

impl Limit {
    pub fn new(offset: i64, count: i64) -> Result<Self, StoreError> {
        if offset < 0 || count < 0 {
            return Err(StoreError::InvalidLimit);
        }
        Ok(Self {
            offset: offset as u64,
            count: count as u64,
        })
    }
}

/// A date range with inclusive endpoints, validated so start <= end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, StoreError> {
        if start > end {
            return Err(StoreError::InvalidRange);
        }
        Ok(Self { start, end })
    }
}
