//! Textual address codec.
//!
//! Parses textual addresses into tagged values and renders them back.
//! `render(parse(x))` is the identity on canonical inputs; non-canonical
//! spellings (leading zeros, uncompressed v6) normalize to the canonical
//! form on the way through.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{Result, StoreError};

use super::types::IpValue;

/// Parses a textual address into a `(value, version)` tagged union.
pub fn parse(text: &str) -> Result<IpValue> {
    let addr: IpAddr = text
        .trim()
        .parse()
        .map_err(|_| StoreError::AddressFormat(text.to_string()))?;

    Ok(match addr {
        IpAddr::V4(v4) => IpValue::V4(u32::from(v4)),
        IpAddr::V6(v6) => IpValue::V6(u128::from(v6)),
    })
}

/// Renders a tagged value back to its canonical textual form.
pub fn render(value: IpValue) -> String {
    match value {
        IpValue::V4(v) => Ipv4Addr::from(v).to_string(),
        IpValue::V6(v) => Ipv6Addr::from(v).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v4() {
        let value = parse("192.168.1.1").unwrap();
        assert_eq!(value, IpValue::V4(0xC0A80101));
    }

    #[test]
    fn test_parse_v6() {
        let value = parse("::1").unwrap();
        assert_eq!(value, IpValue::V6(1));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse("  10.0.0.1 ").unwrap(), parse("10.0.0.1").unwrap());
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for text in ["", "999.0.0.1", "10.0.0", "not-an-address", "1.2.3.4.5"] {
            let result = parse(text);
            assert_eq!(result, Err(StoreError::AddressFormat(text.to_string())));
        }
    }

    #[test]
    fn test_round_trip_on_canonical_inputs() {
        for text in [
            "0.0.0.0",
            "10.0.0.1",
            "192.168.1.15",
            "255.255.255.255",
            "::",
            "::1",
            "2001:db8::1",
            "fe80::1:2:3:4",
            "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff",
        ] {
            assert_eq!(render(parse(text).unwrap()), text);
        }
    }

    #[test]
    fn test_non_canonical_v6_normalizes() {
        let value = parse("2001:0db8:0000:0000:0000:0000:0000:0001").unwrap();
        assert_eq!(render(value), "2001:db8::1");
    }
}
