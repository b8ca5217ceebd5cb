// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

//! Address and token amount normalization.
//!
//! Wallets hand us addresses in two shapes: the 20-byte EVM form (40 hex chars) and the
//! 32-byte chain-native form (64 hex chars). Every storage and lookup key uses the
//! canonical form produced by [`to_canonical_address`]: `0x` + 64 lower-case hex chars.

use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of hex characters in a canonical (32-byte) address, without the prefix
pub const CANONICAL_HEX_LEN: usize = 64;

/// Number of hex characters in a 20-byte EVM-style address, without the prefix
pub const EVM_HEX_LEN: usize = 40;

/// Decimal places of the native token
pub const TOKEN_DECIMALS: i64 = 8;

/// Base units per whole token (10^8)
pub const BASE_UNITS_PER_TOKEN: u64 = 100_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("address contains non-hex characters: {0}")]
    NotHex(String),
    #[error("address is longer than 32 bytes: {0}")]
    TooLong(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount must not be negative")]
    Negative,
    #[error("amount has more than {TOKEN_DECIMALS} decimal places")]
    TooPrecise,
    #[error("amount does not fit in 64-bit base units")]
    Overflow,
    #[error("invalid amount: {0}")]
    Invalid(String),
}

fn strip_prefix(address: &str) -> &str {
    let trimmed = address.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
}

/// Convert an address of either width into the canonical `0x` + 64 hex form.
///
/// Empty input yields an empty string. No hex validation happens here; see
/// [`is_valid_address`] and [`Address::parse`] for that.
pub fn to_canonical_address(address: &str) -> String {
    let hex = strip_prefix(address);
    if hex.is_empty() {
        return String::new();
    }

    let hex = hex.to_ascii_lowercase();
    if hex.len() >= CANONICAL_HEX_LEN {
        return format!("0x{}", hex);
    }
    format!("0x{:0>width$}", hex, width = CANONICAL_HEX_LEN)
}

/// True only for the 20-byte wallet form: exactly 40 hex characters, `0x` optional.
pub fn is_valid_address(address: &str) -> bool {
    let hex = strip_prefix(address);
    hex.len() == EVM_HEX_LEN && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// Compare two addresses after canonicalization (case and prefix insensitive)
pub fn addresses_match(a: &str, b: &str) -> bool {
    let a = to_canonical_address(a);
    !a.is_empty() && a == to_canonical_address(b)
}

/// A validated, canonical chain address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Validate hex-ness and width, then canonicalize
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let hex = strip_prefix(input);
        if hex.is_empty() {
            return Err(AddressError::Empty);
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressError::NotHex(input.to_string()));
        }
        if hex.len() > CANONICAL_HEX_LEN {
            return Err(AddressError::TooLong(input.to_string()));
        }
        Ok(Self(to_canonical_address(hex)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Base units (octas) to a decimal token amount. Exact: the result carries scale 8.
pub fn base_units_to_decimal(units: u64) -> BigDecimal {
    BigDecimal::new(units.into(), TOKEN_DECIMALS)
}

/// Decimal token amount to base units. Rejects negatives and sub-unit precision.
pub fn decimal_to_base_units(amount: &BigDecimal) -> Result<u64, AmountError> {
    if amount < &BigDecimal::zero() {
        return Err(AmountError::Negative);
    }
    let scaled = amount * BigDecimal::from(BASE_UNITS_PER_TOKEN);
    if !scaled.is_integer() {
        return Err(AmountError::TooPrecise);
    }
    scaled.to_u64().ok_or(AmountError::Overflow)
}

/// Parse a human-entered amount such as `"1.5"` into base units
pub fn parse_amount(input: &str) -> Result<u64, AmountError> {
    let amount = BigDecimal::from_str(input.trim())
        .map_err(|_| AmountError::Invalid(input.to_string()))?;
    decimal_to_base_units(&amount)
}

/// Render base units as a decimal string without trailing zeros (`150000000` -> `"1.5"`)
pub fn format_amount(units: u64) -> String {
    let whole = units / BASE_UNITS_PER_TOKEN;
    let frac = units % BASE_UNITS_PER_TOKEN;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:08}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVM: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
    const NATIVE: &str = "0x00000000000000000000000052908400098527886e0f7030069857d2e4169ee7";

    #[test]
    fn canonicalizes_both_widths() {
        assert_eq!(to_canonical_address(EVM), NATIVE);
        assert_eq!(to_canonical_address(NATIVE), NATIVE);
        assert_eq!(to_canonical_address(&NATIVE[2..]), NATIVE);
        assert_eq!(to_canonical_address("0x1").len(), 66);
    }

    #[test]
    fn canonicalization_is_idempotent() {
        for input in [EVM, NATIVE, "0xabc", "1", "0XDEADBEEF"] {
            let once = to_canonical_address(input);
            assert_eq!(to_canonical_address(&once), once);
            assert_eq!(once.len(), 66);
            assert!(once.starts_with("0x"));
        }
    }

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(to_canonical_address(""), "");
        assert_eq!(to_canonical_address("0x"), "");
    }

    #[test]
    fn validity_only_accepts_evm_width() {
        assert!(is_valid_address(EVM));
        assert!(is_valid_address(&EVM[2..]));
        assert!(!is_valid_address(NATIVE));
        assert!(!is_valid_address("0x52908400098527886E0F7030069857D2E4169EEZ"));
    }

    #[test]
    fn addresses_match_across_forms() {
        assert!(addresses_match(EVM, NATIVE));
        assert!(addresses_match("0xABC", "abc"));
        assert!(!addresses_match("", ""));
        assert!(!addresses_match("0x1", "0x2"));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(Address::parse(""), Err(AddressError::Empty));
        assert!(matches!(Address::parse("0xnothex"), Err(AddressError::NotHex(_))));
        let long = format!("0x{}", "a".repeat(65));
        assert!(matches!(Address::parse(&long), Err(AddressError::TooLong(_))));
        assert_eq!(Address::parse(EVM).unwrap().as_str(), NATIVE);
    }

    #[test]
    fn amounts_round_trip_without_drift() {
        for units in [0u64, 1, 99, 100_000_000, 123_456_789, 1_999_999_999_999, u64::MAX / 2] {
            let decimal = base_units_to_decimal(units);
            assert_eq!(decimal_to_base_units(&decimal).unwrap(), units);
        }
    }

    #[test]
    fn parse_and_format_amounts() {
        assert_eq!(parse_amount("1.5").unwrap(), 150_000_000);
        assert_eq!(parse_amount("0.00000001").unwrap(), 1);
        assert_eq!(parse_amount("0.1").unwrap(), 10_000_000);
        assert_eq!(parse_amount("-1"), Err(AmountError::Negative));
        assert_eq!(parse_amount("0.000000001"), Err(AmountError::TooPrecise));
        assert!(matches!(parse_amount("abc"), Err(AmountError::Invalid(_))));

        assert_eq!(format_amount(150_000_000), "1.5");
        assert_eq!(format_amount(200_000_000), "2");
        assert_eq!(format_amount(1), "0.00000001");
    }
}
