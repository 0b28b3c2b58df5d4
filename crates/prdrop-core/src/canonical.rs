//! Canonical proof input vector.
//!
//! [`canonicalize`] turns extracted [`EmailFields`], the DKIM witness produced by the external
//! email-signature helper, and a wallet address into the fixed-layout input consumed by the
//! prover. Every byte string is stored in a zero-padded buffer of fixed capacity next to its true
//! length. Capacities belong to the protocol version: an over-long value is rejected, never
//! truncated.

use std::str::Utf8Error;

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use thiserror::Error;

use crate::email::EmailFields;
use crate::field::FieldElement;
use crate::wallet::{WalletAddress, WalletError};

/// Version of the input and public-input layout. Bumped whenever a capacity or position changes.
pub const PROTOCOL_VERSION: u16 = 1;

/// Capacity of the `repo_name` buffer.
pub const REPO_NAME_CAPACITY: usize = 50;
/// Capacity of the `pr_number` buffer.
pub const PR_NUMBER_CAPACITY: usize = 6;
/// Capacity of the `email_address` buffer.
pub const EMAIL_ADDRESS_CAPACITY: usize = 60;

/// Default header capacity of the claim circuit.
pub const DEFAULT_MAX_HEADER_LEN: usize = 1280;
/// Default body capacity of the claim circuit.
pub const DEFAULT_MAX_BODY_LEN: usize = 1280;

/// Errors produced while building a [`CanonicalInput`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonicalizeError {
    /// A value does not fit its fixed-capacity buffer.
    #[error("{field} is {len} bytes long, exceeding its capacity of {capacity}")]
    FieldTooLong {
        /// Name of the rejected field.
        field: &'static str,
        /// Encoded length of the value.
        len: usize,
        /// Capacity of the buffer.
        capacity: usize,
    },

    /// The wallet address is not a valid field element literal.
    #[error("invalid wallet address: {0}")]
    InvalidWalletAddress(#[from] WalletError),

    /// The DKIM witness is inconsistent.
    #[error("invalid DKIM witness: {0}")]
    InvalidWitness(String),
}

/// Circuit size parameters for the DKIM-signed parts of the email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitParams {
    /// Capacity of the canonicalized header buffer.
    pub max_header_len: usize,
    /// Capacity of the canonicalized body buffer.
    pub max_body_len: usize,
}

impl Default for CircuitParams {
    fn default() -> Self {
        Self {
            max_header_len: DEFAULT_MAX_HEADER_LEN,
            max_body_len: DEFAULT_MAX_BODY_LEN,
        }
    }
}

#[serde_as]
#[derive(Serialize, Deserialize)]
struct BoundedBytesRepr {
    #[serde_as(as = "Vec<DisplayFromStr>")]
    storage: Vec<u8>,
    #[serde_as(as = "DisplayFromStr")]
    len: usize,
}

/// A byte string in a zero-padded buffer of fixed capacity with a separate length.
///
/// Serialized as `{ "storage": ["104", ...], "len": "5" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BoundedBytesRepr", into = "BoundedBytesRepr")]
pub struct BoundedBytes {
    storage: Vec<u8>,
    len: usize,
}

impl BoundedBytes {
    /// Pad `bytes` to `capacity`.
    ///
    /// # Errors
    /// Returns [`CanonicalizeError::FieldTooLong`] if `bytes` does not fit.
    pub fn new(
        field: &'static str,
        bytes: &[u8],
        capacity: usize,
    ) -> Result<Self, CanonicalizeError> {
        if bytes.len() > capacity {
            return Err(CanonicalizeError::FieldTooLong {
                field,
                len: bytes.len(),
                capacity,
            });
        }
        let mut storage = vec![0_u8; capacity];
        if let Some(prefix) = storage.get_mut(..bytes.len()) {
            prefix.copy_from_slice(bytes);
        }
        Ok(Self {
            storage,
            len: bytes.len(),
        })
    }

    /// Size of the padded buffer.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// True length of the value.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the value is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The full padded buffer.
    #[must_use]
    pub fn storage(&self) -> &[u8] {
        &self.storage
    }

    /// The value without padding.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.storage.get(..self.len).unwrap_or_default()
    }

    /// Decode the value as UTF-8 text.
    ///
    /// # Errors
    /// Returns an error if the value is not valid UTF-8.
    pub fn decode(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(self.as_bytes())
    }

    fn push_fields(&self, out: &mut Vec<FieldElement>) {
        out.extend(self.storage.iter().map(|b| FieldElement::from_u64((*b).into())));
        out.push(usize_field(self.len));
    }
}

impl TryFrom<BoundedBytesRepr> for BoundedBytes {
    type Error = String;

    fn try_from(repr: BoundedBytesRepr) -> Result<Self, Self::Error> {
        let padding = repr
            .storage
            .get(repr.len..)
            .ok_or_else(|| format!("length {} exceeds capacity {}", repr.len, repr.storage.len()))?;
        if padding.iter().any(|b| *b != 0) {
            return Err("non-zero padding after the value".to_owned());
        }
        Ok(Self {
            storage: repr.storage,
            len: repr.len,
        })
    }
}

impl From<BoundedBytes> for BoundedBytesRepr {
    fn from(value: BoundedBytes) -> Self {
        Self {
            storage: value.storage,
            len: value.len,
        }
    }
}

/// A byte sequence as emitted by the email-signature helper: a possibly padded buffer whose
/// first `len` bytes are meaningful.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteSequence {
    /// Buffer, possibly padded.
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub storage: Vec<u8>,
    /// Number of meaningful bytes.
    #[serde_as(as = "DisplayFromStr")]
    pub len: usize,
}

impl ByteSequence {
    /// Wrap unpadded bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            storage: bytes.to_vec(),
            len: bytes.len(),
        }
    }

    fn meaningful(&self, field: &'static str) -> Result<&[u8], CanonicalizeError> {
        self.storage.get(..self.len).ok_or_else(|| {
            CanonicalizeError::InvalidWitness(format!(
                "{field} length {} exceeds its buffer of {} bytes",
                self.len,
                self.storage.len()
            ))
        })
    }
}

/// RSA public key of the DKIM signer, as limbs with the Barrett reduction parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyLimbs {
    /// Modulus limbs.
    pub modulus: Vec<FieldElement>,
    /// Reduction parameter limbs.
    pub redc: Vec<FieldElement>,
}

/// DKIM witness material produced by the external email-signature helper.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DkimWitness {
    /// Canonicalized signed header.
    pub header: ByteSequence,
    /// Canonicalized body, or its remainder after a precomputed partial hash.
    pub body: ByteSequence,
    /// Offset of the body hash inside the header.
    #[serde_as(as = "DisplayFromStr")]
    pub body_hash_index: usize,
    /// Signer public key.
    pub pubkey: PublicKeyLimbs,
    /// RSA signature limbs.
    pub signature: Vec<FieldElement>,
    /// SHA-256 state after the precomputed body prefix, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_body_hash: Option<Vec<FieldElement>>,
    /// Length of the full body when a partial hash is used.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_body_real_length: Option<usize>,
}

/// The fixed-layout input vector consumed by the prover.
///
/// Serialized as the prover's named input map; [`CanonicalInput::to_field_vector`] gives the
/// same values as one ordered vector.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalInput {
    /// Header padded to `max_header_len`.
    pub header: BoundedBytes,
    /// Body padded to `max_body_len`.
    pub body: BoundedBytes,
    /// Offset of the body hash inside the header.
    #[serde_as(as = "DisplayFromStr")]
    pub body_hash_index: usize,
    /// Signer public key.
    pub pubkey: PublicKeyLimbs,
    /// RSA signature limbs.
    pub signature: Vec<FieldElement>,
    /// SHA-256 state after the precomputed body prefix, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_body_hash: Option<Vec<FieldElement>>,
    /// Length of the full body when a partial hash is used.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_body_real_length: Option<usize>,
    /// Repository in `owner/repo` form.
    pub repo_name: BoundedBytes,
    /// Pull request number.
    pub pr_number: BoundedBytes,
    /// Carbon-copy email address.
    pub email_address: BoundedBytes,
    /// Wallet address as a field element.
    pub wallet_address: FieldElement,
}

impl CanonicalInput {
    /// All values in layout order: header, body, body hash index, public key, signature,
    /// optional partial hash, then the application fields and the wallet.
    #[must_use]
    pub fn to_field_vector(&self) -> Vec<FieldElement> {
        let mut out = Vec::new();
        self.header.push_fields(&mut out);
        self.body.push_fields(&mut out);
        out.push(usize_field(self.body_hash_index));
        out.extend(self.pubkey.modulus.iter().cloned());
        out.extend(self.pubkey.redc.iter().cloned());
        out.extend(self.signature.iter().cloned());
        if let Some(partial) = &self.partial_body_hash {
            out.extend(partial.iter().cloned());
        }
        if let Some(real_length) = self.partial_body_real_length {
            out.push(usize_field(real_length));
        }
        self.repo_name.push_fields(&mut out);
        self.pr_number.push_fields(&mut out);
        self.email_address.push_fields(&mut out);
        out.push(self.wallet_address.clone());
        out
    }
}

/// Build the canonical input vector.
///
/// Pure: identical arguments always produce an identical vector.
///
/// # Errors
/// - [`CanonicalizeError::FieldTooLong`] if any buffer would overflow.
/// - [`CanonicalizeError::InvalidWalletAddress`] if the wallet is not a valid literal.
/// - [`CanonicalizeError::InvalidWitness`] if the DKIM witness is inconsistent.
pub fn canonicalize(
    fields: &EmailFields,
    witness: &DkimWitness,
    wallet_address: &str,
    params: &CircuitParams,
) -> Result<CanonicalInput, CanonicalizeError> {
    let header = witness.header.meaningful("header")?;
    let body = witness.body.meaningful("body")?;

    if witness.body_hash_index >= header.len() {
        return Err(CanonicalizeError::InvalidWitness(format!(
            "body hash index {} lies outside the {} byte header",
            witness.body_hash_index,
            header.len()
        )));
    }
    if witness.partial_body_hash.is_some() != witness.partial_body_real_length.is_some() {
        return Err(CanonicalizeError::InvalidWitness(
            "partial body hash and real length must be given together".to_owned(),
        ));
    }
    if witness.pubkey.modulus.is_empty() || witness.signature.is_empty() {
        return Err(CanonicalizeError::InvalidWitness(
            "public key and signature must not be empty".to_owned(),
        ));
    }

    Ok(CanonicalInput {
        header: BoundedBytes::new("header", header, params.max_header_len)?,
        body: BoundedBytes::new("body", body, params.max_body_len)?,
        body_hash_index: witness.body_hash_index,
        pubkey: witness.pubkey.clone(),
        signature: witness.signature.clone(),
        partial_body_hash: witness.partial_body_hash.clone(),
        partial_body_real_length: witness.partial_body_real_length,
        repo_name: BoundedBytes::new(
            "repo_name",
            fields.repo_name.as_bytes(),
            REPO_NAME_CAPACITY,
        )?,
        pr_number: BoundedBytes::new(
            "pr_number",
            fields.pr_number.as_bytes(),
            PR_NUMBER_CAPACITY,
        )?,
        email_address: BoundedBytes::new(
            "email_address",
            fields.cc_email.as_bytes(),
            EMAIL_ADDRESS_CAPACITY,
        )?,
        wallet_address: WalletAddress::parse(wallet_address)?.into_field(),
    })
}

fn usize_field(value: usize) -> FieldElement {
    // `usize` is at most 64 bits on every supported target.
    FieldElement::from_u64(u64::try_from(value).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::arithmetic_side_effects,
        clippy::indexing_slicing,
        reason = "Test code - relax these lints for clarity"
    )]

    use test_utils::{WALLET, WALLET_DECIMAL, dkim_witness_json, notification_email};

    use super::*;
    use crate::email::extract;

    fn sample_fields() -> EmailFields {
        extract(&notification_email(
            "https://github.com/acme/widgets/pull/42#event-1",
        ))
    }

    fn sample_witness() -> DkimWitness {
        serde_json::from_str(&dkim_witness_json(7)).expect("fixture witness is valid")
    }

    #[test]
    fn pads_application_fields() -> Result<(), CanonicalizeError> {
        let input = canonicalize(
            &sample_fields(),
            &sample_witness(),
            WALLET,
            &CircuitParams::default(),
        )?;

        assert_eq!(input.repo_name.capacity(), REPO_NAME_CAPACITY);
        assert_eq!(input.repo_name.len(), "acme/widgets".len());
        assert_eq!(input.repo_name.decode(), Ok("acme/widgets"));
        assert!(input.repo_name.storage()[12..].iter().all(|b| *b == 0));
        assert_eq!(input.pr_number.decode(), Ok("42"));
        assert_eq!(input.pr_number.capacity(), PR_NUMBER_CAPACITY);
        assert_eq!(input.email_address.capacity(), EMAIL_ADDRESS_CAPACITY);
        assert_eq!(input.header.capacity(), DEFAULT_MAX_HEADER_LEN);
        assert_eq!(input.body.capacity(), DEFAULT_MAX_BODY_LEN);
        Ok(())
    }

    #[test]
    fn canonicalization_is_deterministic() -> Result<(), CanonicalizeError> {
        let params = CircuitParams::default();
        let first = canonicalize(&sample_fields(), &sample_witness(), WALLET, &params)?;
        let second = canonicalize(&sample_fields(), &sample_witness(), WALLET, &params)?;
        assert_eq!(first, second);
        assert_eq!(first.to_field_vector(), second.to_field_vector());
        Ok(())
    }

    #[test]
    fn bounded_round_trip_up_to_capacity() -> Result<(), CanonicalizeError> {
        let longest = "x".repeat(REPO_NAME_CAPACITY);
        for value in ["", "a", "acme/widgets", "ünïcödé/repo", longest.as_str()] {
            let bounded = BoundedBytes::new("repo_name", value.as_bytes(), REPO_NAME_CAPACITY)?;
            assert_eq!(bounded.decode(), Ok(value));
            assert_eq!(bounded.capacity(), REPO_NAME_CAPACITY);
        }
        Ok(())
    }

    #[test]
    fn overflow_is_rejected_not_truncated() {
        let mut fields = sample_fields();
        fields.repo_name = "o".repeat(REPO_NAME_CAPACITY + 1);
        let result = canonicalize(
            &fields,
            &sample_witness(),
            WALLET,
            &CircuitParams::default(),
        );
        assert_eq!(
            result,
            Err(CanonicalizeError::FieldTooLong {
                field: "repo_name",
                len: 51,
                capacity: REPO_NAME_CAPACITY,
            })
        );
    }

    #[test]
    fn multibyte_overflow_counts_bytes() {
        let mut fields = sample_fields();
        // 6 characters, 7 bytes.
        fields.pr_number = "123ü45".to_owned();
        let result = canonicalize(
            &fields,
            &sample_witness(),
            WALLET,
            &CircuitParams::default(),
        );
        assert_eq!(
            result,
            Err(CanonicalizeError::FieldTooLong {
                field: "pr_number",
                len: 7,
                capacity: PR_NUMBER_CAPACITY,
            })
        );
    }

    #[test]
    fn header_overflow_uses_circuit_params() {
        let params = CircuitParams {
            max_header_len: 8,
            max_body_len: DEFAULT_MAX_BODY_LEN,
        };
        let result = canonicalize(&sample_fields(), &sample_witness(), WALLET, &params);
        assert!(matches!(
            result,
            Err(CanonicalizeError::FieldTooLong {
                field: "header",
                capacity: 8,
                ..
            })
        ));
    }

    #[test]
    fn invalid_wallet_is_a_hard_error() {
        let result = canonicalize(
            &sample_fields(),
            &sample_witness(),
            "not-a-wallet",
            &CircuitParams::default(),
        );
        assert!(matches!(
            result,
            Err(CanonicalizeError::InvalidWalletAddress(_))
        ));
    }

    #[test]
    fn inconsistent_witness_is_rejected() {
        let mut witness = sample_witness();
        witness.header.len = witness.header.storage.len() + 1;
        let result = canonicalize(
            &sample_fields(),
            &witness,
            WALLET,
            &CircuitParams::default(),
        );
        assert!(matches!(result, Err(CanonicalizeError::InvalidWitness(_))));

        let mut witness = sample_witness();
        witness.body_hash_index = witness.header.len;
        let result = canonicalize(
            &sample_fields(),
            &witness,
            WALLET,
            &CircuitParams::default(),
        );
        assert!(matches!(result, Err(CanonicalizeError::InvalidWitness(_))));
    }

    #[test]
    fn serializes_as_prover_input_map() -> Result<(), Box<dyn std::error::Error>> {
        let input = canonicalize(
            &sample_fields(),
            &sample_witness(),
            WALLET,
            &CircuitParams::default(),
        )?;
        let json = serde_json::to_value(&input)?;

        assert_eq!(json["pr_number"]["len"], "2");
        assert_eq!(json["pr_number"]["storage"][0], "52");
        assert_eq!(json["pr_number"]["storage"][5], "0");
        assert_eq!(json["wallet_address"], WALLET_DECIMAL);

        let back: CanonicalInput = serde_json::from_value(json)?;
        assert_eq!(back, input);
        Ok(())
    }

    #[test]
    fn rejects_noncanonical_padding_on_read() {
        let json = r#"{ "storage": ["1", "0", "9"], "len": "1" }"#;
        let result = serde_json::from_str::<BoundedBytes>(json);
        assert!(result.is_err());
        let json = r#"{ "storage": ["1"], "len": "2" }"#;
        assert!(serde_json::from_str::<BoundedBytes>(json).is_err());
    }
}
