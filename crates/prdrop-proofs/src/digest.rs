//! Transparent SHA-256 commitment proofs.
//!
//! **Not zero knowledge.** The proof is a keyed digest of the public inputs; anyone holding the
//! key can produce a valid proof for any inputs, and the DKIM signature is not checked. Keys are
//! drawn from OS randomness at setup, so the circuit alone does not reveal them. This backend
//! exists for trial deployments and tests where the operator holds the only key.
//!
//! ```text
//! nullifier = SHA256(NULLIFIER_DOMAIN || signature limbs)[..31]
//! proof     = SHA256(PROOF_DOMAIN || key || public inputs)
//! ```
//!
//! Every field element is hashed in its 32-byte big-endian encoding.

use std::path::PathBuf;

use prdrop_core::public_inputs::Nullifier;
use prdrop_core::{CanonicalInput, FieldElement, Proof, PublicInputs};
use sha2::{Digest as _, Sha256};
use tracing::debug;

use crate::artifact::{BackendKind, CircuitArtifact, KeyEnvelope, load_checked};
use crate::backend::ProofBackend;
use crate::error::EngineError;

const NULLIFIER_DOMAIN: &[u8] = b"prdrop/digest/nullifier/v1";
const PROOF_DOMAIN: &[u8] = b"prdrop/digest/proof/v1";

/// Bytes of the nullifier digest kept, so the value always lies below the field modulus.
const NULLIFIER_BYTES: usize = 31;

/// Key shared by the digest prover and verifier.
#[derive(Clone, PartialEq, Eq)]
pub struct DigestKey([u8; 32]);

impl DigestKey {
    /// Fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(rand::random())
    }

    /// Wrap the key in an envelope bound to `circuit`.
    #[must_use]
    pub fn envelope(&self, circuit: &CircuitArtifact) -> KeyEnvelope {
        KeyEnvelope::new(BackendKind::Digest, circuit, self.0.to_vec())
    }

    fn from_envelope(envelope: &KeyEnvelope) -> Result<Self, EngineError> {
        envelope
            .key
            .as_slice()
            .try_into()
            .map(Self)
            .map_err(|_| {
                EngineError::Backend(format!(
                    "digest key must be 32 bytes, found {}",
                    envelope.key.len()
                ))
            })
    }

    fn proof(&self, public_inputs: &PublicInputs) -> Proof {
        let mut hasher = Sha256::new();
        hasher.update(PROOF_DOMAIN);
        hasher.update(self.0);
        for value in public_inputs.as_slice() {
            hasher.update(value.to_bytes_be());
        }
        Proof::new(hasher.finalize().to_vec())
    }
}

/// Nullifier of an email, derived from its DKIM signature.
///
/// # Errors
/// Returns an error if the truncated digest is not a field element, which cannot happen for
/// a 31-byte value.
pub fn nullifier(signature: &[FieldElement]) -> Result<Nullifier, EngineError> {
    let mut hasher = Sha256::new();
    hasher.update(NULLIFIER_DOMAIN);
    for limb in signature {
        hasher.update(limb.to_bytes_be());
    }
    let digest = hasher.finalize();
    let truncated = digest.get(..NULLIFIER_BYTES).unwrap_or_default();
    FieldElement::from_bytes_be(truncated)
        .map(Nullifier::new)
        .map_err(|error| EngineError::Backend(error.to_string()))
}

/// Digest backend reading its circuit and key from disk.
#[derive(Debug, Clone)]
pub struct DigestBackend {
    circuit: PathBuf,
    key: PathBuf,
}

impl DigestBackend {
    /// Backend for the circuit at `circuit` and the key envelope at `key`.
    pub fn new(circuit: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        Self {
            circuit: circuit.into(),
            key: key.into(),
        }
    }

    async fn load_key(&self) -> Result<DigestKey, EngineError> {
        let (_, envelope) = load_checked(BackendKind::Digest, &self.circuit, &self.key).await?;
        DigestKey::from_envelope(&envelope)
    }
}

impl ProofBackend for DigestBackend {
    type ProvingKey = DigestKey;
    type VerifyingKey = DigestKey;

    fn name(&self) -> &'static str {
        BackendKind::Digest.as_str()
    }

    async fn load_proving_key(&self) -> Result<DigestKey, EngineError> {
        self.load_key().await
    }

    async fn load_verifying_key(&self) -> Result<DigestKey, EngineError> {
        self.load_key().await
    }

    async fn prove(
        &self,
        key: &DigestKey,
        input: &CanonicalInput,
    ) -> Result<(Proof, PublicInputs), EngineError> {
        let key = key.clone();
        let signature = input.signature.clone();
        let repo_name = input.repo_name.as_bytes().to_vec();
        let wallet = input.wallet_address.clone();

        tokio::task::spawn_blocking(move || {
            let nullifier = nullifier(&signature)?;
            let public_inputs = PublicInputs::assemble(&nullifier, &repo_name, &wallet)?;
            debug!(%nullifier, "Derived nullifier");
            Ok((key.proof(&public_inputs), public_inputs))
        })
        .await?
    }

    async fn verify(
        &self,
        key: &DigestKey,
        proof: &Proof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, EngineError> {
        let key = key.clone();
        let proof = proof.clone();
        let public_inputs = public_inputs.clone();

        let valid = tokio::task::spawn_blocking(move || {
            public_inputs.check_length().is_ok() && key.proof(&public_inputs) == proof
        })
        .await?;
        Ok(valid)
    }
}
