//! Wallet addresses bound into a claim proof.

use std::fmt;

use thiserror::Error;

use crate::field::{FieldElement, FieldError, parse_uint};

/// Maximum number of hex digits in a `0x` wallet address (20 bytes).
pub const MAX_HEX_DIGITS: usize = 40;

/// Errors produced while parsing a wallet address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// The address is not an unsigned integer literal.
    #[error("wallet address {input:?} is not an integer literal: {source}")]
    Malformed {
        /// The rejected input.
        input: String,
        /// Why the literal was rejected.
        source: FieldError,
    },

    /// A hex address longer than 20 bytes.
    #[error("wallet address has {digits} hex digits, at most {MAX_HEX_DIGITS} are allowed")]
    TooLong {
        /// Number of hex digits in the input.
        digits: usize,
    },
}

/// A wallet address re-encoded as a field element.
///
/// Accepts a `0x`-prefixed hex literal of at most 20 bytes or a decimal literal below the field
/// modulus. The canonical rendering is decimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WalletAddress(FieldElement);

impl WalletAddress {
    /// Parse a wallet address literal. Nothing is coerced: surrounding whitespace is an error.
    ///
    /// # Errors
    /// Returns [`WalletError`] if the literal is malformed, too long, or outside the field.
    pub fn parse(input: &str) -> Result<Self, WalletError> {
        let malformed = |source| WalletError::Malformed {
            input: input.to_owned(),
            source,
        };

        if let Some(hex) = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            && hex.len() > MAX_HEX_DIGITS
        {
            return Err(WalletError::TooLong { digits: hex.len() });
        }

        let value = parse_uint(input).map_err(malformed)?;
        FieldElement::try_from(value)
            .map(Self)
            .map_err(malformed)
    }

    /// Consume into the underlying field element.
    #[must_use]
    pub fn into_field(self) -> FieldElement {
        self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
