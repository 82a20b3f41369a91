use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Address family of a stored value.
///
/// Each family maps to its own physical table; the two stores are unified
/// only at the API surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Both families, in the order results are concatenated: v4 first.
    pub const ALL: [IpVersion; 2] = [IpVersion::V4, IpVersion::V6];
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => write!(f, "4"),
            IpVersion::V6 => write!(f, "6"),
        }
    }
}

/// An ip address value tagged with its family.
///
/// V4 values are 32-bit, V6 values 128-bit. Ordering is only defined
/// between values of the same family, so this type deliberately does not
/// implement `Ord`; use [`IpValue::same_version_cmp`] and reject mixed
/// families explicitly at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpValue {
    V4(u32),
    V6(u128),
}

impl IpValue {
    pub fn version(&self) -> IpVersion {
        match self {
            IpValue::V4(_) => IpVersion::V4,
            IpValue::V6(_) => IpVersion::V6,
        }
    }

    /// Natural integer order between two values of the same family.
    ///
    /// Returns `None` when the families differ; comparing across families
    /// is undefined.
    pub fn same_version_cmp(&self, other: &IpValue) -> Option<Ordering> {
        match (self, other) {
            (IpValue::V4(a), IpValue::V4(b)) => Some(a.cmp(b)),
            (IpValue::V6(a), IpValue::V6(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_tags() {
        assert_eq!(IpValue::V4(0).version(), IpVersion::V4);
        assert_eq!(IpValue::V6(0).version(), IpVersion::V6);
    }

    #[test]
    fn test_same_version_ordering_is_integer_order() {
        let low = IpValue::V4(u32::from(std::net::Ipv4Addr::new(192, 168, 1, 1)));
        let high = IpValue::V4(u32::from(std::net::Ipv4Addr::new(192, 168, 1, 15)));

        assert_eq!(low.same_version_cmp(&high), Some(Ordering::Less));
        assert_eq!(high.same_version_cmp(&low), Some(Ordering::Greater));
        assert_eq!(low.same_version_cmp(&low), Some(Ordering::Equal));
    }

    #[test]
    fn test_cross_version_comparison_is_undefined() {
        let v4 = IpValue::V4(1);
        let v6 = IpValue::V6(1);

        assert_eq!(v4.same_version_cmp(&v6), None);
        assert_eq!(v6.same_version_cmp(&v4), None);
    }

    #[test]
    fn test_version_display() {
        assert_eq!(IpVersion::V4.to_string(), "4");
        assert_eq!(IpVersion::V6.to_string(), "6");
    }
}
