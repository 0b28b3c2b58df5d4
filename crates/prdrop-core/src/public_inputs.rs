//! Public inputs of a claim proof.
//!
//! Layout (protocol version 1):
//!
//! | index     | value                               |
//! |-----------|-------------------------------------|
//! | `0`       | nullifier                           |
//! | `1..=50`  | repository name bytes, zero padded  |
//! | `51`      | repository name length              |
//! | `52`      | wallet address                      |
//!
//! The repository identity is read from these proof-bound values, never from a client claim.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canonical::REPO_NAME_CAPACITY;
use crate::field::{FIELD_ELEMENT_SIZE, FieldElement, FieldError};

/// Position of the nullifier.
pub const NULLIFIER_INDEX: usize = 0;
/// Position of the first repository name byte.
pub const REPO_NAME_OFFSET: usize = 1;
/// Position of the repository name length.
pub const REPO_NAME_LEN_INDEX: usize = REPO_NAME_OFFSET + REPO_NAME_CAPACITY;
/// Position of the wallet address.
pub const WALLET_INDEX: usize = REPO_NAME_LEN_INDEX + 1;
/// Number of public inputs.
pub const PUBLIC_INPUT_COUNT: usize = WALLET_INDEX + 1;

/// Violations of the public input layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublicInputError {
    /// A value is not a field element literal.
    #[error("public input {index} is not a field element: {source}")]
    NotAFieldElement {
        /// Position of the value.
        index: usize,
        /// Why it was rejected.
        source: FieldError,
    },

    /// Wrong number of public inputs.
    #[error("expected {PUBLIC_INPUT_COUNT} public inputs, found {0}")]
    WrongLength(usize),

    /// A repository name element is not a byte.
    #[error("public input {0} is not a byte")]
    NotAByte(usize),

    /// The repository name length exceeds its capacity.
    #[error("repository name length {0} exceeds capacity {REPO_NAME_CAPACITY}")]
    RepoNameTooLong(u64),

    /// A byte after the repository name is not zero.
    #[error("public input {0} is padding but not zero")]
    NonZeroPadding(usize),

    /// The repository name is not valid UTF-8.
    #[error("repository name is not valid UTF-8")]
    NotUtf8,
}

/// Anti-replay value derived from the signed email.
///
/// Hex and decimal renderings of the same value are the same nullifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nullifier(FieldElement);

impl Nullifier {
    /// Wrap a field element.
    #[must_use]
    pub const fn new(value: FieldElement) -> Self {
        Self(value)
    }

    /// Fixed-width key used by storage backends.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; FIELD_ELEMENT_SIZE] {
        self.0.to_bytes_be()
    }

    /// The underlying field element.
    #[must_use]
    pub const fn as_field(&self) -> &FieldElement {
        &self.0
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Ordered public inputs of a claim proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicInputs(Vec<FieldElement>);

impl PublicInputs {
    /// Wrap already parsed values.
    #[must_use]
    pub const fn new(values: Vec<FieldElement>) -> Self {
        Self(values)
    }

    /// Parse wire literals (decimal or `0x` hex).
    ///
    /// # Errors
    /// Returns [`PublicInputError::NotAFieldElement`] for the first invalid literal.
    pub fn parse<S: AsRef<str>>(literals: &[S]) -> Result<Self, PublicInputError> {
        literals
            .iter()
            .enumerate()
            .map(|(index, literal)| {
                FieldElement::parse(literal.as_ref())
                    .map_err(|source| PublicInputError::NotAFieldElement { index, source })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Lay out the public inputs of a claim.
    ///
    /// # Errors
    /// Returns [`PublicInputError::RepoNameTooLong`] if `repo_name` exceeds
    /// [`REPO_NAME_CAPACITY`] bytes.
    pub fn assemble(
        nullifier: &Nullifier,
        repo_name: &[u8],
        wallet: &FieldElement,
    ) -> Result<Self, PublicInputError> {
        let len = u64::try_from(repo_name.len()).unwrap_or(u64::MAX);
        if repo_name.len() > REPO_NAME_CAPACITY {
            return Err(PublicInputError::RepoNameTooLong(len));
        }
        let mut values = Vec::with_capacity(PUBLIC_INPUT_COUNT);
        values.push(nullifier.as_field().clone());
        values.extend(
            (0..REPO_NAME_CAPACITY)
                .map(|i| FieldElement::from_u64(repo_name.get(i).copied().unwrap_or(0).into())),
        );
        values.push(FieldElement::from_u64(len));
        values.push(wallet.clone());
        Ok(Self(values))
    }

    /// Values in order.
    #[must_use]
    pub fn as_slice(&self) -> &[FieldElement] {
        &self.0
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical decimal literals, in order.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    /// Check the number of values.
    ///
    /// # Errors
    /// Returns [`PublicInputError::WrongLength`] unless there are exactly
    /// [`PUBLIC_INPUT_COUNT`] values.
    pub fn check_length(&self) -> Result<(), PublicInputError> {
        if self.0.len() == PUBLIC_INPUT_COUNT {
            Ok(())
        } else {
            Err(PublicInputError::WrongLength(self.0.len()))
        }
    }

    /// The nullifier.
    ///
    /// # Errors
    /// Returns an error if the layout has the wrong length.
    pub fn nullifier(&self) -> Result<Nullifier, PublicInputError> {
        self.at(NULLIFIER_INDEX).cloned().map(Nullifier)
    }

    /// The wallet address the claim is bound to.
    ///
    /// # Errors
    /// Returns an error if the layout has the wrong length.
    pub fn wallet_address(&self) -> Result<&FieldElement, PublicInputError> {
        self.at(WALLET_INDEX)
    }

    /// The repository name committed in the proof.
    ///
    /// # Errors
    /// Returns an error if the length is wrong, an element is not a byte, the name length
    /// exceeds its capacity, padding is not zero, or the name is not UTF-8.
    pub fn repo_name(&self) -> Result<String, PublicInputError> {
        self.check_length()?;

        let raw_len = self.at(REPO_NAME_LEN_INDEX)?;
        let len = raw_len
            .to_u64()
            .and_then(|len| usize::try_from(len).ok())
            .filter(|len| *len <= REPO_NAME_CAPACITY)
            .ok_or_else(|| PublicInputError::RepoNameTooLong(raw_len.to_u64().unwrap_or(u64::MAX)))?;

        let mut name = Vec::with_capacity(len);
        for offset in 0..REPO_NAME_CAPACITY {
            let index = REPO_NAME_OFFSET.saturating_add(offset);
            let byte = self
                .at(index)?
                .to_u64()
                .and_then(|value| u8::try_from(value).ok())
                .ok_or(PublicInputError::NotAByte(index))?;
            if offset < len {
                name.push(byte);
            } else if byte != 0 {
                return Err(PublicInputError::NonZeroPadding(index));
            }
        }

        String::from_utf8(name).map_err(|_| PublicInputError::NotUtf8)
    }

    fn at(&self, index: usize) -> Result<&FieldElement, PublicInputError> {
        self.check_length()?;
        self.0
            .get(index)
            .ok_or(PublicInputError::WrongLength(self.0.len()))
    }
}
