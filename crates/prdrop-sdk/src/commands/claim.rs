use std::path::PathBuf;

use eyre::eyre;
use prdrop_core::CanonicalInput;
use prdrop_proofs::{AnyBackend, BackendConfig, Prover, Verifier};
use tracing::{info, instrument};

use super::{read_json, write_json};
use crate::protocol::{ClaimRequest, verify_claim};

/// Prove a canonical input and write the claim request.
///
/// # Errors
/// Returns an error if the inputs cannot be read or proving fails.
#[instrument(skip_all, fields(backend = %config.kind, inputs = %inputs.display()))]
pub async fn prove(config: BackendConfig, inputs: PathBuf, out: Option<PathBuf>) -> eyre::Result<()> {
    let input: CanonicalInput = read_json(&inputs, "proof inputs").await?;
    let prover = Prover::new(AnyBackend::from(config));

    let output = prover.generate_proof(&input).await?;
    info!(proving_time_ms = output.proving_time_ms, "Claim proof ready");

    write_json(&output, out.as_deref(), "Claim request").await
}

/// Verify a claim request offline, without eligibility or ledger checks.
///
/// # Errors
/// Returns an error if the request cannot be read or does not verify.
#[instrument(skip_all, fields(backend = %config.kind, request = %request.display()))]
pub async fn verify_request(config: BackendConfig, request: PathBuf) -> eyre::Result<()> {
    let claim_request: ClaimRequest = read_json(&request, "claim request").await?;
    let verifier = Verifier::new(AnyBackend::from(config));

    let claim = verify_claim(&verifier, claim_request)
        .await
        .map_err(|error| eyre!("Claim does not verify: {error}"))?;

    info!(
        nullifier = %claim.nullifier,
        repo_name = %claim.repo_name,
        wallet_address = %claim.wallet_address,
        "Claim proof verified"
    );
    Ok(())
}
