use std::path::PathBuf;

use eyre::Context as _;
use prdrop_proofs::CircuitArtifact;
use prdrop_proofs::command::verifying_key_envelope;
use prdrop_proofs::digest::DigestKey;
use tracing::{info, instrument, warn};

/// Generate a random digest backend key for a circuit.
///
/// # Errors
/// Returns an error if the circuit cannot be loaded or the key cannot be written.
#[instrument(skip_all, fields(circuit = %circuit.display()))]
pub async fn setup_digest(circuit: PathBuf, key_out: PathBuf) -> eyre::Result<()> {
    let artifact = CircuitArtifact::load(&circuit).await?;
    let envelope = DigestKey::generate().envelope(&artifact);
    envelope.save(&key_out).await?;

    warn!("Digest proofs are not zero knowledge; anyone holding this key can forge claims");
    info!(
        file = ?key_out,
        circuit_hash = %envelope.circuit_hash,
        "Digest key written"
    );
    Ok(())
}

/// Bind a verifying key produced by an external tool to its circuit.
///
/// # Errors
/// Returns an error if a file cannot be read or the envelope cannot be written.
#[instrument(skip_all, fields(circuit = %circuit.display()))]
pub async fn setup_command(circuit: PathBuf, vk: PathBuf, key_out: PathBuf) -> eyre::Result<()> {
    let artifact = CircuitArtifact::load(&circuit).await?;
    let vk_bytes = tokio::fs::read(&vk)
        .await
        .with_context(|| format!("Failed to read verifying key: {}", vk.display()))?;
    let envelope = verifying_key_envelope(&artifact, vk_bytes);
    envelope.save(&key_out).await?;

    info!(
        file = ?key_out,
        circuit_hash = %envelope.circuit_hash,
        "Verifying key envelope written"
    );
    Ok(())
}
