//! Server-side claim processing.
//!
//! A claim moves through
//! `Received → ProofVerified → EligibilityChecked → NullifierChecked → Committed`, and can be
//! `Rejected` from any non-terminal state. Guards run in that order and stop at the first
//! failure, so a malformed request never reaches the verifier and a rejected claim never
//! touches the ledger.

use std::fmt;

use prdrop_core::public_inputs::Nullifier;
use prdrop_core::{FieldElement, Proof, PublicInputError, PublicInputs};
use prdrop_ledger::{ClaimLedger, Recorded};
use prdrop_proofs::{ProofBackend, Verifier};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::eligibility::EligibilityGate;

/// Body of a claim submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    /// Proof bytes, as a byte array or a `0x` hex string. Parsed after the presence check.
    #[serde(default)]
    #[schemars(with = "Option<Proof>")]
    pub proof: Option<serde_json::Value>,
    /// Public inputs as decimal or `0x` hex field element literals.
    #[serde(default)]
    pub public_inputs: Option<Vec<String>>,
}

/// States of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    /// The request arrived.
    Received,
    /// The proof verified against its public inputs.
    ProofVerified,
    /// The proven repository is eligible.
    EligibilityChecked,
    /// The nullifier was absent and is now recorded.
    NullifierChecked,
    /// The claim succeeded.
    Committed,
    /// The claim failed.
    Rejected,
}

impl fmt::Display for ClaimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::ProofVerified => "proof_verified",
            Self::EligibilityChecked => "eligibility_checked",
            Self::NullifierChecked => "nullifier_checked",
            Self::Committed => "committed",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Class of a claim failure, deciding the response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request is incomplete or unparseable.
    Validation,
    /// The proof does not verify.
    Crypto,
    /// The repository is not eligible.
    Policy,
    /// The email was already used for a claim.
    Conflict,
    /// The service failed.
    Internal,
}

/// Why a claim was rejected. The display text is safe to return to clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    /// The proof or the public inputs are absent.
    #[error("Missing proof or public inputs")]
    MissingFields,

    /// The request cannot be parsed.
    #[error("Malformed request body: {0}")]
    Malformed(String),

    /// The proof does not verify, or its public inputs break the layout.
    #[error("Invalid proof")]
    InvalidProof,

    /// The proven repository is not eligible.
    #[error("Repository is not eligible for the airdrop")]
    NotEligible {
        /// Repository read from the public inputs.
        repo_name: String,
    },

    /// The nullifier is already recorded.
    #[error("User already claimed the airdrop (nullifier found)")]
    AlreadyClaimed,

    /// The verifier or the ledger failed. The detail is for logs only.
    #[error("Internal server error")]
    Internal(String),
}

impl ClaimError {
    /// Class of the failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingFields | Self::Malformed(_) => ErrorKind::Validation,
            Self::InvalidProof => ErrorKind::Crypto,
            Self::NotEligible { .. } => ErrorKind::Policy,
            Self::AlreadyClaimed => ErrorKind::Conflict,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// A claim whose proof verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedClaim {
    /// Nullifier of the claimed email.
    pub nullifier: Nullifier,
    /// Repository read from the public inputs.
    pub repo_name: String,
    /// Wallet the claim is bound to.
    pub wallet_address: FieldElement,
}

/// A committed claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimReceipt {
    /// The verified claim.
    #[serde(flatten)]
    pub claim: VerifiedClaim,
    /// Unix time of the claim, in seconds.
    pub claimed_at: u64,
}

/// Check presence, parse and verify a claim request. Stateless.
///
/// # Errors
/// Returns [`ClaimError::MissingFields`], [`ClaimError::Malformed`], [`ClaimError::InvalidProof`]
/// or, if the verifier fails, [`ClaimError::Internal`].
pub async fn verify_claim<B: ProofBackend>(
    verifier: &Verifier<B>,
    request: ClaimRequest,
) -> Result<VerifiedClaim, ClaimError> {
    let (Some(proof), Some(literals)) = (request.proof, request.public_inputs) else {
        return Err(ClaimError::MissingFields);
    };
    let proof: Proof =
        serde_json::from_value(proof).map_err(|error| ClaimError::Malformed(error.to_string()))?;
    let public_inputs =
        PublicInputs::parse(&literals).map_err(|error| ClaimError::Malformed(error.to_string()))?;

    let valid = verifier
        .verify_proof(&proof, &public_inputs)
        .await
        .map_err(|error| ClaimError::Internal(error.to_string()))?;
    if !valid {
        return Err(ClaimError::InvalidProof);
    }

    let layout = |error: PublicInputError| {
        debug!(%error, "Verified public inputs break the layout");
        ClaimError::InvalidProof
    };
    Ok(VerifiedClaim {
        nullifier: public_inputs.nullifier().map_err(layout)?,
        repo_name: public_inputs.repo_name().map_err(layout)?,
        wallet_address: public_inputs.wallet_address().map_err(layout)?.clone(),
    })
}

/// Processes claim submissions.
pub struct ClaimProtocol<B: ProofBackend, G, L> {
    verifier: Verifier<B>,
    gate: G,
    ledger: L,
}

impl<B, G, L> ClaimProtocol<B, G, L>
where
    B: ProofBackend,
    G: EligibilityGate,
    L: ClaimLedger,
{
    /// Assemble a protocol from its collaborators.
    pub const fn new(verifier: Verifier<B>, gate: G, ledger: L) -> Self {
        Self {
            verifier,
            gate,
            ledger,
        }
    }

    /// The verifier.
    pub const fn verifier(&self) -> &Verifier<B> {
        &self.verifier
    }

    /// The ledger.
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Run a claim through every guard and commit it.
    ///
    /// # Errors
    /// Returns the [`ClaimError`] of the first failing guard.
    #[instrument(skip_all)]
    pub async fn process(&self, request: ClaimRequest) -> Result<ClaimReceipt, ClaimError> {
        let mut state = ClaimState::Received;
        debug!(%state, "Claim received");

        let result = self.advance(&mut state, request).await;
        match &result {
            Ok(receipt) => info!(
                nullifier = %receipt.claim.nullifier,
                repo_name = %receipt.claim.repo_name,
                "Airdrop claimed"
            ),
            Err(rejection) => {
                let from = state;
                state = ClaimState::Rejected;
                match rejection {
                    ClaimError::Internal(detail) => {
                        error!(%from, %state, %detail, "Claim failed");
                    }
                    ClaimError::InvalidProof => warn!(%from, %state, %rejection, "Claim rejected"),
                    ClaimError::MissingFields
                    | ClaimError::Malformed(_)
                    | ClaimError::NotEligible { .. }
                    | ClaimError::AlreadyClaimed => {
                        info!(%from, %state, %rejection, "Claim rejected");
                    }
                }
            }
        }
        result
    }

    async fn advance(
        &self,
        state: &mut ClaimState,
        request: ClaimRequest,
    ) -> Result<ClaimReceipt, ClaimError> {
        let claim = verify_claim(&self.verifier, request).await?;
        transition(state, ClaimState::ProofVerified);

        if !self.gate.is_eligible(&claim.repo_name) {
            return Err(ClaimError::NotEligible {
                repo_name: claim.repo_name,
            });
        }
        transition(state, ClaimState::EligibilityChecked);

        let record = match self.ledger.check_and_record(&claim.nullifier).await {
            Ok(Recorded::Accepted(record)) => record,
            Ok(Recorded::AlreadyClaimed) => return Err(ClaimError::AlreadyClaimed),
            Err(error) => return Err(ClaimError::Internal(error.to_string())),
        };
        transition(state, ClaimState::NullifierChecked);
        transition(state, ClaimState::Committed);

        Ok(ClaimReceipt {
            claim,
            claimed_at: record.claimed_at,
        })
    }
}

fn transition(state: &mut ClaimState, next: ClaimState) {
    debug!(from = %state, to = %next, "Claim state changed");
    *state = next;
}
