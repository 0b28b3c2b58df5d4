//! Scalar field elements of the claim circuit (BN254).
//!
//! Every value crossing the prover boundary is a field element. They are accepted as decimal or
//! `0x`-prefixed hex literals and always rendered as canonical decimal, so two renderings of the
//! same value compare equal.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// BN254 scalar field modulus as little-endian 32-bit limbs.
const MODULUS_LIMBS: [u32; 8] = [
    0xf000_0001,
    0x43e1_f593,
    0x79b9_7091,
    0x2833_e848,
    0x8181_585d,
    0xb850_45b6,
    0xe131_a029,
    0x3064_4e72,
];

static MODULUS: LazyLock<BigUint> = LazyLock::new(|| BigUint::from_slice(&MODULUS_LIMBS));

/// Size of a field element in its fixed-width big-endian encoding.
pub const FIELD_ELEMENT_SIZE: usize = 32;

/// Errors produced while parsing a field element.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The literal has no digits.
    #[error("field element literal is empty")]
    Empty,

    /// The literal contains a character outside its radix.
    #[error("field element literal {0:?} contains an invalid digit")]
    InvalidDigit(String),

    /// The value is not below the field modulus.
    #[error("field element {0} is not below the field modulus")]
    OutOfRange(String),
}

/// An integer strictly below the BN254 scalar field modulus.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldElement(BigUint);

impl FieldElement {
    /// The zero element.
    #[must_use]
    pub fn zero() -> Self {
        Self(BigUint::ZERO)
    }

    /// Build a field element from a small integer. Every `u64` is below the modulus.
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self(BigUint::from(value))
    }

    /// Interpret big-endian bytes as an integer.
    ///
    /// # Errors
    /// Returns [`FieldError::OutOfRange`] if the integer is not below the modulus.
    pub fn from_bytes_be(bytes: &[u8]) -> Result<Self, FieldError> {
        Self::try_from(BigUint::from_bytes_be(bytes))
    }

    /// Parse a decimal or `0x`-prefixed hex literal.
    ///
    /// # Errors
    /// Returns an error if the literal is empty, has a digit outside its radix, or is not below
    /// the modulus.
    pub fn parse(literal: &str) -> Result<Self, FieldError> {
        Self::try_from(parse_uint(literal)?)
    }

    /// The value as a `u64`, if it fits.
    #[must_use]
    pub fn to_u64(&self) -> Option<u64> {
        u64::try_from(&self.0).ok()
    }

    /// Fixed-width 32-byte big-endian encoding.
    #[must_use]
    pub fn to_bytes_be(&self) -> [u8; FIELD_ELEMENT_SIZE] {
        let digits = self.0.to_bytes_be();
        let mut out = [0_u8; FIELD_ELEMENT_SIZE];
        // Below the 254-bit modulus, so the encoding never exceeds 32 bytes.
        let offset = FIELD_ELEMENT_SIZE.saturating_sub(digits.len());
        if let Some(tail) = out.get_mut(offset..) {
            tail.copy_from_slice(digits.get(..tail.len()).unwrap_or_default());
        }
        out
    }
}

impl TryFrom<BigUint> for FieldElement {
    type Error = FieldError;

    fn try_from(value: BigUint) -> Result<Self, Self::Error> {
        if value < *MODULUS {
            Ok(Self(value))
        } else {
            Err(FieldError::OutOfRange(value.to_string()))
        }
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl FromStr for FieldElement {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let literal = String::deserialize(deserializer)?;
        Self::parse(&literal).map_err(serde::de::Error::custom)
    }
}

/// Parse an unsigned integer literal, `0x`-prefixed hex or plain decimal.
///
/// Only ASCII digits of the radix are accepted: no sign, whitespace or separators.
pub(crate) fn parse_uint(literal: &str) -> Result<BigUint, FieldError> {
    let (digits, radix) = match literal
        .strip_prefix("0x")
        .or_else(|| literal.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (literal, 10),
    };

    if digits.is_empty() {
        return Err(FieldError::Empty);
    }
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(FieldError::InvalidDigit(literal.to_owned()));
    }

    BigUint::parse_bytes(digits.as_bytes(), radix)
        .ok_or_else(|| FieldError::InvalidDigit(literal.to_owned()))
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::arithmetic_side_effects,
        clippy::indexing_slicing,
        reason = "Test code - relax these lints for clarity"
    )]

    use super::*;

    const MODULUS_DEC: &str =
        "21888242871839275222246405745257275088548364400416034343698204186575808495617";

    #[test]
    fn modulus_limbs_match_decimal() {
        assert_eq!(MODULUS.to_string(), MODULUS_DEC);
    }

    #[test]
    fn hex_and_decimal_are_the_same_element() {
        let hex = FieldElement::parse("0x00000000000000000000000000000000000000000000000000000000000000ff");
        let dec = FieldElement::parse("255");
        assert_eq!(hex, dec);
        assert!(matches!(hex, Ok(fe) if fe.to_string() == "255"));
    }

    #[test]
    fn rejects_modulus_and_above() {
        assert!(matches!(
            FieldElement::parse(MODULUS_DEC),
            Err(FieldError::OutOfRange(_))
        ));
        assert!(FieldElement::parse(
            "21888242871839275222246405745257275088548364400416034343698204186575808495616"
        )
        .is_ok());
    }

    #[test]
    fn rejects_malformed_literals() {
        assert_eq!(FieldElement::parse(""), Err(FieldError::Empty));
        assert_eq!(FieldElement::parse("0x"), Err(FieldError::Empty));
        assert!(matches!(
            FieldElement::parse("12_3"),
            Err(FieldError::InvalidDigit(_))
        ));
        assert!(matches!(
            FieldElement::parse("+1"),
            Err(FieldError::InvalidDigit(_))
        ));
        assert!(matches!(
            FieldElement::parse(" 1"),
            Err(FieldError::InvalidDigit(_))
        ));
        assert!(matches!(
            FieldElement::parse("0xfg"),
            Err(FieldError::InvalidDigit(_))
        ));
    }

    #[test]
    fn fixed_width_encoding() {
        let bytes = FieldElement::from_u64(0x0102).to_bytes_be();
        assert_eq!(bytes[30], 0x01);
        assert_eq!(bytes[31], 0x02);
        assert!(bytes[..30].iter().all(|b| *b == 0));
        assert_eq!(FieldElement::from_bytes_be(&bytes), Ok(FieldElement::from_u64(0x0102)));
    }

    #[test]
    fn serde_uses_decimal_strings() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&FieldElement::from_u64(42))?;
        assert_eq!(json, "\"42\"");
        let back: FieldElement = serde_json::from_str("\"0x2a\"")?;
        assert_eq!(back, FieldElement::from_u64(42));
        Ok(())
    }
}
